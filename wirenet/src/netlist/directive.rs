use serde::Serialize;
use std::fmt;

use crate::registry::ProbeId;
use crate::topology::NetId;

/// A measurement requested by a probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeDirective {
    /// Node voltage of a net
    Voltage { probe: ProbeId, net: NetId },
    /// Branch current through a named two-terminal device
    Current { probe: ProbeId, device: String },
}

impl ProbeDirective {
    pub fn probe(&self) -> ProbeId {
        match self {
            ProbeDirective::Voltage { probe, .. } | ProbeDirective::Current { probe, .. } => *probe,
        }
    }

    /// Column name the solver reports this measurement under
    pub fn key(&self) -> String {
        match self {
            ProbeDirective::Voltage { net, .. } => format!("v({})", net),
            ProbeDirective::Current { device, .. } => format!("i({})", device),
        }
    }
}

impl fmt::Display for ProbeDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".probe {}", self.key())
    }
}

/// Problems that do not stop synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesisWarning {
    /// Probe has no resolvable node; its directive was omitted
    DanglingProbeNet { probe: ProbeId },
    /// Current probe found no two-terminal device on its segment and measures
    /// the voltage of `net` instead
    CurrentProbeDowngraded { probe: ProbeId, net: NetId },
}

impl fmt::Display for SynthesisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisWarning::DanglingProbeNet { probe } => {
                write!(f, "Probe {} is not connected to any net; skipped", probe)
            }
            SynthesisWarning::CurrentProbeDowngraded { probe, net } => write!(
                f,
                "Current probe {} is not next to a two-terminal device; measuring v({}) instead",
                probe, net
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_text() {
        let v = ProbeDirective::Voltage {
            probe: ProbeId(1),
            net: NetId(2),
        };
        let i = ProbeDirective::Current {
            probe: ProbeId(2),
            device: "R1".to_string(),
        };

        assert_eq!(v.to_string(), ".probe v(2)");
        assert_eq!(i.to_string(), ".probe i(R1)");
        assert_eq!(i.key(), "i(R1)");
        assert_eq!(v.probe(), ProbeId(1));
    }
}
