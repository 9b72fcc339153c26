//! Connectivity Resolver
//!
//! Computes the electrical net partition from the wire graph plus pin and probe
//! attachments. The resolver never mutates the graph; each pass builds a
//! throwaway petgraph view and walks its connected components breadth-first.
//!
//! Numbering is a pure function of the input: nets are ordered by the smallest
//! terminal they contain, the ground net (if any) is always `0`, and the rest
//! are numbered densely from `1`.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use super::graph::{NodeId, WireGraph};
use crate::registry::{ComponentId, ComponentRecord, ProbeRecord};

/// Index of a resolved net. `0` is reserved for ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetId(pub u32);

impl NetId {
    pub const GROUND: NetId = NetId(0);

    pub fn is_ground(&self) -> bool {
        *self == Self::GROUND
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point that takes part in connectivity.
///
/// Wire nodes sort before floating pins, so a net's position in the numbering
/// is decided by its lowest node id whenever it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Terminal {
    Node(NodeId),
    /// Unattached pin (index into the component's pin order); always alone
    FloatingPin { component: ComponentId, pin: usize },
}

/// One electrical net
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Net {
    pub id: NetId,
    pub members: BTreeSet<Terminal>,
    pub is_ground: bool,
}

impl Net {
    /// Wire nodes in this net, ascending
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().filter_map(|t| match t {
            Terminal::Node(id) => Some(*id),
            Terminal::FloatingPin { .. } => None,
        })
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.members.contains(&Terminal::Node(node))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectivityError {
    #[error("Ambiguous ground: ground references {} sit on different nets", .components.join(", "))]
    AmbiguousGround { components: Vec<String> },
}

/// Disjoint nets covering every node touched by a segment, pin or probe
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetPartition {
    /// Sorted by id; ground first when present
    nets: Vec<Net>,
    #[serde(skip)]
    lookup: BTreeMap<Terminal, NetId>,
}

impl NetPartition {
    pub fn nets(&self) -> &[Net] {
        &self.nets
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    pub fn net(&self, id: NetId) -> Option<&Net> {
        self.nets.iter().find(|n| n.id == id)
    }

    pub fn ground(&self) -> Option<&Net> {
        self.nets.iter().find(|n| n.is_ground)
    }

    pub fn net_of_node(&self, node: NodeId) -> Option<NetId> {
        self.lookup.get(&Terminal::Node(node)).copied()
    }

    pub fn net_of_terminal(&self, terminal: &Terminal) -> Option<NetId> {
        self.lookup.get(terminal).copied()
    }

    /// Point-to-net lookup table for every wire node in the partition
    pub fn node_table(&self) -> BTreeMap<NodeId, NetId> {
        self.lookup
            .iter()
            .filter_map(|(terminal, net)| match terminal {
                Terminal::Node(id) => Some((*id, *net)),
                Terminal::FloatingPin { .. } => None,
            })
            .collect()
    }
}

/// Stateless connectivity pass
pub struct ConnectivityResolver;

impl ConnectivityResolver {
    /// Partition every touched node into nets and find the ground net.
    ///
    /// Ground-flagged components mark the net of their first declared pin.
    /// Two or more of them on different nets is an error; they are never
    /// merged.
    pub fn resolve(
        graph: &WireGraph,
        components: &[ComponentRecord],
        probes: &[ProbeRecord],
    ) -> Result<NetPartition, ConnectivityError> {
        let terminals = Self::collect_terminals(graph, components, probes);

        // Build the undirected view in terminal order so traversal order is fixed
        let mut view: UnGraph<Terminal, ()> = UnGraph::with_capacity(terminals.len(), graph.segment_count());
        let mut index: BTreeMap<Terminal, NodeIndex> = BTreeMap::new();
        for terminal in &terminals {
            index.insert(*terminal, view.add_node(*terminal));
        }
        for segment in graph.segments() {
            let a = index.get(&Terminal::Node(segment.node_id1));
            let b = index.get(&Terminal::Node(segment.node_id2));
            if let (Some(&a), Some(&b)) = (a, b) {
                view.add_edge(a, b, ());
            }
        }

        // Connected components, discovered from the smallest unvisited terminal
        let mut visited = vec![false; view.node_count()];
        let mut groups: Vec<BTreeSet<Terminal>> = Vec::new();
        for start in view.node_indices() {
            if visited[start.index()] {
                continue;
            }
            let mut members = BTreeSet::new();
            let mut bfs = Bfs::new(&view, start);
            while let Some(nx) = bfs.next(&view) {
                visited[nx.index()] = true;
                members.insert(view[nx]);
            }
            groups.push(members);
        }

        let group_of: BTreeMap<Terminal, usize> = groups
            .iter()
            .enumerate()
            .flat_map(|(g, members)| members.iter().map(move |t| (*t, g)))
            .collect();

        let ground_group = Self::find_ground(graph, components, &group_of)?;

        let mut nets = Vec::with_capacity(groups.len());
        let mut lookup = BTreeMap::new();
        let mut next = 1;
        for (g, members) in groups.into_iter().enumerate() {
            let is_ground = ground_group == Some(g);
            let id = if is_ground {
                NetId::GROUND
            } else {
                let id = NetId(next);
                next += 1;
                id
            };
            for terminal in &members {
                lookup.insert(*terminal, id);
            }
            nets.push(Net {
                id,
                members,
                is_ground,
            });
        }
        nets.sort_by_key(|n| n.id);

        debug!(
            "Resolved {} terminals into {} nets (ground: {})",
            terminals.len(),
            nets.len(),
            ground_group.is_some()
        );
        Ok(NetPartition { nets, lookup })
    }

    fn collect_terminals(
        graph: &WireGraph,
        components: &[ComponentRecord],
        probes: &[ProbeRecord],
    ) -> BTreeSet<Terminal> {
        let mut terminals = BTreeSet::new();

        for segment in graph.segments() {
            terminals.insert(Terminal::Node(segment.node_id1));
            terminals.insert(Terminal::Node(segment.node_id2));
        }

        for component in components {
            for (index, pin) in component.pin_order.iter().enumerate() {
                terminals.insert(Self::pin_terminal(graph, component, index, pin));
            }
        }

        for probe in probes {
            if let Some(node) = probe.resolve_node(graph) {
                if graph.contains_node(node) {
                    terminals.insert(Terminal::Node(node));
                }
            }
        }

        terminals
    }

    /// Wire node a pin sits on, or a lone floating terminal when the pin is
    /// unattached or its node is no longer in the graph
    fn pin_terminal(
        graph: &WireGraph,
        component: &ComponentRecord,
        index: usize,
        pin: &str,
    ) -> Terminal {
        match component.node_for_pin(pin) {
            Some(node) if graph.contains_node(node) => Terminal::Node(node),
            Some(node) => {
                warn!(
                    "Pin {} of {} is attached to unknown node {}",
                    pin,
                    component.designator(),
                    node
                );
                Terminal::FloatingPin {
                    component: component.id,
                    pin: index,
                }
            }
            None => Terminal::FloatingPin {
                component: component.id,
                pin: index,
            },
        }
    }

    /// Every live pin of a ground symbol marks its net as ground. A symbol
    /// with no live pin claims its own first pin.
    fn find_ground(
        graph: &WireGraph,
        components: &[ComponentRecord],
        group_of: &BTreeMap<Terminal, usize>,
    ) -> Result<Option<usize>, ConnectivityError> {
        let mut grounds: Vec<(String, usize)> = Vec::new();
        for component in components.iter().filter(|c| c.is_ground_reference) {
            let mut references: Vec<Terminal> = component
                .attached_nodes()
                .filter(|node| graph.contains_node(*node))
                .map(Terminal::Node)
                .collect();
            if references.is_empty() {
                match component.pin_order.first() {
                    Some(pin) => references.push(Self::pin_terminal(graph, component, 0, pin)),
                    None => {
                        warn!("Ground reference {} has no pins", component.designator());
                        continue;
                    }
                }
            }

            let designator = component.designator();
            for terminal in references {
                if let Some(&group) = group_of.get(&terminal) {
                    if !grounds.contains(&(designator.clone(), group)) {
                        grounds.push((designator.clone(), group));
                    }
                }
            }
        }

        let distinct: BTreeSet<usize> = grounds.iter().map(|(_, g)| *g).collect();
        match distinct.len() {
            0 => Ok(None),
            1 => Ok(distinct.into_iter().next()),
            _ => {
                let mut names: Vec<String> = Vec::new();
                for (name, _) in grounds {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                Err(ConnectivityError::AmbiguousGround { components: names })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorContext;

    fn two_islands() -> (WireGraph, [NodeId; 4]) {
        let mut g = WireGraph::new(EditorContext::default());
        let a = g.add_node(0.0, 0.0).id;
        let b = g.add_node(100.0, 0.0).id;
        let c = g.add_node(0.0, 100.0).id;
        let d = g.add_node(100.0, 100.0).id;
        g.add_segment(a, b).unwrap();
        g.add_segment(c, d).unwrap();
        (g, [a, b, c, d])
    }

    #[test]
    fn test_islands_are_separate_nets() {
        let (g, [a, b, c, d]) = two_islands();
        let p = ConnectivityResolver::resolve(&g, &[], &[]).unwrap();

        assert_eq!(p.len(), 2);
        assert_eq!(p.net_of_node(a), Some(NetId(1)));
        assert_eq!(p.net_of_node(b), Some(NetId(1)));
        assert_eq!(p.net_of_node(c), Some(NetId(2)));
        assert_eq!(p.net_of_node(d), Some(NetId(2)));
        assert!(p.ground().is_none());
    }

    #[test]
    fn test_ground_takes_zero_and_rest_stay_dense() {
        let (g, [a, _, c, _]) = two_islands();
        let gnd = ComponentRecord::ground(1, 1, Some(a));
        let p = ConnectivityResolver::resolve(&g, &[gnd], &[]).unwrap();

        assert_eq!(p.net_of_node(a), Some(NetId::GROUND));
        assert_eq!(p.net_of_node(c), Some(NetId(1)));
        assert_eq!(p.nets()[0].id, NetId::GROUND);
        assert!(p.nets()[0].is_ground);
    }

    #[test]
    fn test_two_grounds_on_one_net_are_fine() {
        let (g, [a, b, _, _]) = two_islands();
        let components = vec![
            ComponentRecord::ground(1, 1, Some(a)),
            ComponentRecord::ground(2, 2, Some(b)),
        ];
        let p = ConnectivityResolver::resolve(&g, &components, &[]).unwrap();
        assert_eq!(p.ground().map(|n| n.node_ids().count()), Some(2));
    }

    #[test]
    fn test_grounds_on_separate_islands_are_ambiguous() {
        let (g, [a, _, c, _]) = two_islands();
        let components = vec![
            ComponentRecord::ground(1, 1, Some(a)),
            ComponentRecord::ground(2, 2, Some(c)),
        ];
        let err = ConnectivityResolver::resolve(&g, &components, &[]).unwrap_err();
        assert_eq!(
            err,
            ConnectivityError::AmbiguousGround {
                components: vec!["GND1".to_string(), "GND2".to_string()]
            }
        );
    }

    #[test]
    fn test_floating_pins_are_singletons() {
        let (g, [a, _, _, _]) = two_islands();
        let r = ComponentRecord::new(5, "R", 1, "1k")
            .with_pin("1", Some(a))
            .with_pin("2", None);
        let p = ConnectivityResolver::resolve(&g, &[r], &[]).unwrap();

        assert_eq!(p.len(), 3);
        let floating = Terminal::FloatingPin {
            component: ComponentId(5),
            pin: 1,
        };
        let net = p.net_of_terminal(&floating).unwrap();
        assert_eq!(net, NetId(3));
        assert_eq!(p.net(net).unwrap().members.len(), 1);
    }

    #[test]
    fn test_pin_on_missing_node_is_floating() {
        let (g, [a, _, _, _]) = two_islands();
        let r = ComponentRecord::new(5, "R", 1, "1k")
            .with_pin("1", Some(a))
            .with_pin("2", Some(NodeId(999)));
        let p = ConnectivityResolver::resolve(&g, &[r], &[]).unwrap();

        assert_eq!(p.net_of_node(NodeId(999)), None);
        assert!(p
            .net_of_terminal(&Terminal::FloatingPin {
                component: ComponentId(5),
                pin: 1,
            })
            .is_some());
    }

    #[test]
    fn test_any_attached_ground_pin_marks_ground() {
        let (g, [_, b, _, _]) = two_islands();
        let mut gnd = ComponentRecord::new(1, "GND", 1, "")
            .with_pin("1", None)
            .with_pin("2", Some(b));
        gnd.is_ground_reference = true;

        let p = ConnectivityResolver::resolve(&g, &[gnd], &[]).unwrap();
        assert_eq!(p.net_of_node(b), Some(NetId::GROUND));
    }

    #[test]
    fn test_ground_symbol_spanning_two_nets_is_ambiguous() {
        let (g, [a, _, c, _]) = two_islands();
        let mut gnd = ComponentRecord::new(1, "GND", 1, "")
            .with_pin("1", Some(a))
            .with_pin("2", Some(c));
        gnd.is_ground_reference = true;

        let err = ConnectivityResolver::resolve(&g, &[gnd], &[]).unwrap_err();
        assert_eq!(
            err,
            ConnectivityError::AmbiguousGround {
                components: vec!["GND1".to_string()]
            }
        );
    }

    #[test]
    fn test_isolated_pin_node_is_its_own_net() {
        let mut g = WireGraph::new(EditorContext::default());
        let lone = g.add_node(10.0, 10.0).id;
        let untouched = g.add_node(50.0, 50.0).id;
        let c = ComponentRecord::new(1, "C", 1, "1u").with_pin("1", Some(lone));
        let p = ConnectivityResolver::resolve(&g, &[c], &[]).unwrap();

        assert_eq!(p.len(), 1);
        assert_eq!(p.net_of_node(lone), Some(NetId(1)));
        assert_eq!(p.net_of_node(untouched), None);
    }

    #[test]
    fn test_node_table_covers_all_nodes() {
        let (g, nodes) = two_islands();
        let p = ConnectivityResolver::resolve(&g, &[], &[]).unwrap();
        let table = p.node_table();
        for node in nodes {
            assert!(table.contains_key(&node));
        }
    }
}
