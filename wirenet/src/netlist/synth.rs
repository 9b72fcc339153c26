//! Netlist Synthesizer
//!
//! Pure function of (wire graph, net partition, components, probes). Output is
//! byte-identical for identical input: instance lines follow component-list
//! order and directives follow probe-list order.
//!
//! Layout:
//! ```text
//! <title>
//! R1 1 0 1k          one line per non-ground component
//! .op                analysis directives
//! .probe v(1)        measurement directives
//! .end
//! ```

use tracing::{debug, warn};

use super::{Netlist, ProbeDirective, SynthesisError, SynthesisWarning};
use crate::config::SimulationConfig;
use crate::registry::{ComponentRecord, ProbeKind, ProbeRecord};
use crate::topology::{NetPartition, SegmentId, WireGraph, WireQuery};

const TERMINATOR: &str = ".end";

pub struct NetlistSynthesizer;

impl NetlistSynthesizer {
    pub fn synthesize(
        graph: &WireGraph,
        partition: &NetPartition,
        components: &[ComponentRecord],
        probes: &[ProbeRecord],
        config: &SimulationConfig,
    ) -> Result<Netlist, SynthesisError> {
        let mut lines = Vec::with_capacity(components.len() + probes.len() + 3);
        lines.push(Self::title_line(&config.title));

        for component in components {
            if component.is_ground_reference {
                continue;
            }
            lines.push(Self::instance_line(graph, component, partition)?);
        }

        for analysis in &config.analyses {
            lines.push(analysis.to_string());
        }

        let mut directives = Vec::new();
        let mut warnings = Vec::new();
        for probe in probes {
            match Self::probe_directive(graph, partition, components, probe) {
                Ok(directive) => {
                    lines.push(directive.to_string());
                    directives.push(directive);
                }
                Err(warning) => {
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
            }
            if let Some(warning) = Self::downgrade_warning(probe, directives.last()) {
                warn!("{}", warning);
                warnings.push(warning);
            }
        }

        lines.push(TERMINATOR.to_string());

        let mut text = lines.join("\n");
        text.push('\n');

        debug!(
            "Synthesized netlist: {} lines, {} directives, {} warnings",
            lines.len(),
            directives.len(),
            warnings.len()
        );

        Ok(Netlist {
            text,
            directives,
            warnings,
            node_nets: partition.node_table(),
        })
    }

    fn title_line(title: &str) -> String {
        let title = title.replace(['\r', '\n'], " ");
        if title.trim().is_empty() {
            "untitled".to_string()
        } else {
            title
        }
    }

    /// `<designator> <net per pin, declared order> [value]`
    ///
    /// A pin that is unattached, or attached to a node the graph no longer
    /// has, is a floating pin.
    fn instance_line(
        graph: &WireGraph,
        component: &ComponentRecord,
        partition: &NetPartition,
    ) -> Result<String, SynthesisError> {
        let mut fields = vec![component.designator()];
        for pin in &component.pin_order {
            let net = component
                .node_for_pin(pin)
                .filter(|node| graph.contains_node(*node))
                .and_then(|node| partition.net_of_node(node))
                .ok_or_else(|| SynthesisError::FloatingPin {
                    component: component.designator(),
                    pin: pin.clone(),
                })?;
            fields.push(net.to_string());
        }
        let value = component.value.trim();
        if !value.is_empty() {
            fields.push(value.to_string());
        }
        Ok(fields.join(" "))
    }

    /// Directive for one probe, or the warning explaining why it was dropped
    fn probe_directive(
        graph: &WireGraph,
        partition: &NetPartition,
        components: &[ComponentRecord],
        probe: &ProbeRecord,
    ) -> Result<ProbeDirective, SynthesisWarning> {
        if probe.kind == ProbeKind::Current {
            if let Some(device) = probe
                .connected_segment
                .and_then(|segment| Self::device_on_segment(graph, components, segment))
            {
                return Ok(ProbeDirective::Current {
                    probe: probe.id,
                    device,
                });
            }
        }

        probe
            .resolve_node(graph)
            .and_then(|node| partition.net_of_node(node))
            .map(|net| ProbeDirective::Voltage {
                probe: probe.id,
                net,
            })
            .ok_or(SynthesisWarning::DanglingProbeNet { probe: probe.id })
    }

    fn downgrade_warning(
        probe: &ProbeRecord,
        directive: Option<&ProbeDirective>,
    ) -> Option<SynthesisWarning> {
        match (probe.kind, directive) {
            (ProbeKind::Current, Some(ProbeDirective::Voltage { net, .. })) => {
                Some(SynthesisWarning::CurrentProbeDowngraded {
                    probe: probe.id,
                    net: *net,
                })
            }
            _ => None,
        }
    }

    /// Two-terminal, non-ground device the current through a segment is read
    /// from.
    ///
    /// A device with a pin on each end of the segment wins. Failing that, the
    /// first device (list order) with a pin on either end is used.
    fn device_on_segment(
        graph: &WireGraph,
        components: &[ComponentRecord],
        segment: SegmentId,
    ) -> Option<String> {
        let segment = graph.segment(segment)?;
        let candidates = || {
            components
                .iter()
                .filter(|c| !c.is_ground_reference && c.is_two_terminal())
        };
        let spans = |c: &&ComponentRecord| {
            c.pin_attached_to(segment.node_id1).is_some()
                && c.pin_attached_to(segment.node_id2).is_some()
        };
        let touches = |c: &&ComponentRecord| c.pin_nodes.values().any(|node| segment.touches(*node));

        candidates()
            .find(spans)
            .or_else(|| candidates().find(touches))
            .map(|c| c.designator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Analysis, EditorContext};
    use crate::registry::ProbeId;
    use crate::topology::{ConnectivityResolver, NetId, NodeId};

    fn config() -> SimulationConfig {
        SimulationConfig {
            title: "test".to_string(),
            analyses: vec![Analysis::Op],
            ..Default::default()
        }
    }

    /// V1 drives a divider R1/R2 to ground, wired as three nodes
    fn divider() -> (WireGraph, Vec<ComponentRecord>, [NodeId; 3]) {
        let mut g = WireGraph::new(EditorContext::default());
        let top = g.add_node(0.0, 0.0).id;
        let mid = g.add_node(0.0, 100.0).id;
        let bottom = g.add_node(0.0, 200.0).id;
        let vin = g.add_node(-100.0, 0.0).id;
        g.add_segment(vin, top).unwrap();

        let components = vec![
            ComponentRecord::new(1, "V", 1, "DC 5")
                .with_pin("+", Some(vin))
                .with_pin("-", Some(bottom)),
            ComponentRecord::new(2, "R", 1, "10k")
                .with_pin("1", Some(top))
                .with_pin("2", Some(mid)),
            ComponentRecord::new(3, "R", 2, "10k")
                .with_pin("1", Some(mid))
                .with_pin("2", Some(bottom)),
            ComponentRecord::ground(4, 1, Some(bottom)),
        ];
        (g, components, [top, mid, bottom])
    }

    #[test]
    fn test_divider_netlist() {
        let (g, components, _) = divider();
        let p = ConnectivityResolver::resolve(&g, &components, &[]).unwrap();
        let netlist = NetlistSynthesizer::synthesize(&g, &p, &components, &[], &config()).unwrap();

        assert_eq!(
            netlist.text,
            "test\nV1 1 0 DC 5\nR1 1 2 10k\nR2 2 0 10k\n.op\n.end\n"
        );
        assert!(!netlist.has_warnings());
    }

    #[test]
    fn test_pin_order_not_attachment_order() {
        let (g, _, [top, mid, _]) = divider();
        let mut reversed = ComponentRecord::new(9, "D", 1, "1N4148");
        reversed.pin_order = vec!["K".to_string(), "A".to_string()];
        reversed.attach("A", top);
        reversed.attach("K", mid);

        let components = vec![reversed];
        let p = ConnectivityResolver::resolve(&g, &components, &[]).unwrap();
        let netlist = NetlistSynthesizer::synthesize(&g, &p, &components, &[], &config()).unwrap();
        let line = netlist.lines().nth(1).unwrap();

        let k = p.net_of_node(mid).unwrap();
        let a = p.net_of_node(top).unwrap();
        assert_eq!(line, format!("D1 {} {} 1N4148", k, a));
    }

    #[test]
    fn test_current_probe_names_device() {
        let (mut g, components, [top, mid, _]) = divider();
        let wire = g.add_segment(top, mid).unwrap();
        let probes = vec![ProbeRecord::current_on_segment(1, wire.id)];

        let p = ConnectivityResolver::resolve(&g, &components, &probes).unwrap();
        let netlist = NetlistSynthesizer::synthesize(&g, &p, &components, &probes, &config()).unwrap();

        // R1 is the first two-terminal device touching either end
        assert_eq!(
            netlist.directives,
            vec![ProbeDirective::Current {
                probe: ProbeId(1),
                device: "R1".to_string()
            }]
        );
        assert!(netlist.text.contains(".probe i(R1)\n.end"));
    }

    #[test]
    fn test_current_probe_prefers_device_across_the_wire() {
        let (mut g, mut components, [top, mid, _]) = divider();
        // R2 only shares the far junction; put it ahead of R1 in the list
        components.swap(1, 2);
        let wire = g.add_segment(top, mid).unwrap();
        let probes = vec![ProbeRecord::current_on_segment(1, wire.id)];

        let p = ConnectivityResolver::resolve(&g, &components, &probes).unwrap();
        let netlist = NetlistSynthesizer::synthesize(&g, &p, &components, &probes, &config()).unwrap();

        assert_eq!(netlist.measurement_keys(), vec!["i(R1)".to_string()]);
    }

    #[test]
    fn test_current_probe_downgrades_without_device() {
        let mut g = WireGraph::new(EditorContext::default());
        let a = g.add_node(0.0, 0.0).id;
        let b = g.add_node(100.0, 0.0).id;
        let wire = g.add_segment(a, b).unwrap();
        let probes = vec![ProbeRecord::current_on_segment(4, wire.id)];

        let p = ConnectivityResolver::resolve(&g, &[], &probes).unwrap();
        let netlist = NetlistSynthesizer::synthesize(&g, &p, &[], &probes, &config()).unwrap();

        assert_eq!(
            netlist.directives,
            vec![ProbeDirective::Voltage {
                probe: ProbeId(4),
                net: NetId(1)
            }]
        );
        assert_eq!(
            netlist.warnings,
            vec![SynthesisWarning::CurrentProbeDowngraded {
                probe: ProbeId(4),
                net: NetId(1)
            }]
        );
    }

    #[test]
    fn test_dangling_probe_is_skipped_with_warning() {
        let (g, components, _) = divider();
        let probes = vec![
            ProbeRecord::voltage_at_node(1, NodeId(999)),
            ProbeRecord::new(2, ProbeKind::Voltage, Default::default()),
        ];
        let p = ConnectivityResolver::resolve(&g, &components, &probes).unwrap();
        let netlist = NetlistSynthesizer::synthesize(&g, &p, &components, &probes, &config()).unwrap();

        assert!(netlist.directives.is_empty());
        assert_eq!(
            netlist.warnings,
            vec![
                SynthesisWarning::DanglingProbeNet { probe: ProbeId(1) },
                SynthesisWarning::DanglingProbeNet { probe: ProbeId(2) },
            ]
        );
        assert!(!netlist.text.contains(".probe"));
    }

    #[test]
    fn test_floating_pin_aborts() {
        let (g, mut components, _) = divider();
        components[1].detach("2");
        let p = ConnectivityResolver::resolve(&g, &components, &[]).unwrap();
        let err = NetlistSynthesizer::synthesize(&g, &p, &components, &[], &config()).unwrap_err();

        assert_eq!(
            err,
            SynthesisError::FloatingPin {
                component: "R1".to_string(),
                pin: "2".to_string()
            }
        );
    }

    #[test]
    fn test_pin_on_removed_node_aborts() {
        let (g, mut components, _) = divider();
        components[2].attach("2", NodeId(999));
        let p = ConnectivityResolver::resolve(&g, &components, &[]).unwrap();
        let err = NetlistSynthesizer::synthesize(&g, &p, &components, &[], &config()).unwrap_err();

        assert_eq!(
            err,
            SynthesisError::FloatingPin {
                component: "R2".to_string(),
                pin: "2".to_string()
            }
        );
    }

    #[test]
    fn test_title_is_single_line() {
        assert_eq!(NetlistSynthesizer::title_line("a\nb"), "a b");
        assert_eq!(NetlistSynthesizer::title_line("  "), "untitled");
    }
}
