//! Netlist Module
//!
//! Turns a resolved net partition, the ordered component list and the ordered
//! probe list into solver input text plus structured measurement directives.

pub mod directive;
pub mod synth;

pub use directive::{ProbeDirective, SynthesisWarning};
pub use synth::NetlistSynthesizer;

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::topology::{ConnectivityError, NetId, NodeId};

/// Fatal synthesis failures. No partial netlist is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("Floating pin: pin {pin} of {component} is not connected")]
    FloatingPin { component: String, pin: String },

    #[error("Ambiguous ground: ground references {} sit on different nets", .components.join(", "))]
    AmbiguousGround { components: Vec<String> },
}

impl From<ConnectivityError> for SynthesisError {
    fn from(e: ConnectivityError) -> Self {
        match e {
            ConnectivityError::AmbiguousGround { components } => {
                SynthesisError::AmbiguousGround { components }
            }
        }
    }
}

/// Synthesized solver input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Netlist {
    /// Title, instance lines, directives, terminator; newline separated
    pub text: String,

    /// One entry per emitted measurement, in probe order
    pub directives: Vec<ProbeDirective>,

    /// Non-fatal problems (dropped or downgraded probes)
    pub warnings: Vec<SynthesisWarning>,

    /// Wire node -> net lookup for the partition the text was built from
    pub node_nets: BTreeMap<NodeId, NetId>,
}

impl Netlist {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Result-table keys the solver will report for the directives
    pub fn measurement_keys(&self) -> Vec<String> {
        self.directives.iter().map(|d| d.key()).collect()
    }
}
