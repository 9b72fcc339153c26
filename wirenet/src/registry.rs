//! Component and probe records.
//!
//! The editor's component and probe registries own these records; the topology
//! core only reads them. Pin attachments and probe placements refer to wire
//! nodes by id, so they are remapped here whenever the graph merges nodes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use crate::topology::geometry::Point;
use crate::topology::graph::{NodeId, SegmentId, WireQuery};

/// Identifier of a placed component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a placed probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeId(pub u32);

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A placed component as seen by the netlister
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: ComponentId,

    /// Device letter(s), e.g. "R", "C", "V"
    pub designator_prefix: String,

    pub instance_number: u32,

    /// Declared pin order; instance lines list nets in this order
    pub pin_order: Vec<String>,

    /// Pin -> wire node. Pins missing here are floating.
    #[serde(default)]
    pub pin_nodes: BTreeMap<String, NodeId>,

    /// Ground symbols mark their net as the reference node
    #[serde(default)]
    pub is_ground_reference: bool,

    /// Value or model payload appended to the instance line
    #[serde(default)]
    pub value: String,
}

impl ComponentRecord {
    pub fn new(
        id: u32,
        designator_prefix: impl Into<String>,
        instance_number: u32,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: ComponentId(id),
            designator_prefix: designator_prefix.into(),
            instance_number,
            pin_order: Vec::new(),
            pin_nodes: BTreeMap::new(),
            is_ground_reference: false,
            value: value.into(),
        }
    }

    /// A single-pin ground symbol
    pub fn ground(id: u32, instance_number: u32, node: Option<NodeId>) -> Self {
        let mut record = Self::new(id, "GND", instance_number, "").with_pin("1", node);
        record.is_ground_reference = true;
        record
    }

    /// Declare the next pin, optionally attached
    pub fn with_pin(mut self, pin: impl Into<String>, node: Option<NodeId>) -> Self {
        let pin = pin.into();
        if let Some(node) = node {
            self.pin_nodes.insert(pin.clone(), node);
        }
        self.pin_order.push(pin);
        self
    }

    /// "R" + 1 -> "R1"
    pub fn designator(&self) -> String {
        format!("{}{}", self.designator_prefix, self.instance_number)
    }

    pub fn is_two_terminal(&self) -> bool {
        self.pin_order.len() == 2
    }

    pub fn attach(&mut self, pin: &str, node: NodeId) {
        self.pin_nodes.insert(pin.to_string(), node);
    }

    pub fn detach(&mut self, pin: &str) -> Option<NodeId> {
        self.pin_nodes.remove(pin)
    }

    pub fn node_for_pin(&self, pin: &str) -> Option<NodeId> {
        self.pin_nodes.get(pin).copied()
    }

    /// First declared pin attached to `node`
    pub fn pin_attached_to(&self, node: NodeId) -> Option<&str> {
        self.pin_order
            .iter()
            .find(|pin| self.pin_nodes.get(pin.as_str()) == Some(&node))
            .map(|pin| pin.as_str())
    }

    /// Attached nodes in declared pin order; every one of them is a ground
    /// reference point when the component is a ground symbol
    pub fn attached_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pin_order.iter().filter_map(|pin| self.node_for_pin(pin))
    }

    fn remap_node(&mut self, from: NodeId, to: NodeId) -> usize {
        let mut count = 0;
        for node in self.pin_nodes.values_mut() {
            if *node == from {
                *node = to;
                count += 1;
            }
        }
        count
    }
}

/// What a probe measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Voltage,
    Current,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Voltage => write!(f, "voltage"),
            ProbeKind::Current => write!(f, "current"),
        }
    }
}

/// A measurement point placed on the schematic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub id: ProbeId,

    #[serde(rename = "type")]
    pub kind: ProbeKind,

    /// Where the probe sits on the canvas
    #[serde(default)]
    pub position: Point,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,

    /// Segment the probe snapped onto; current probes name the device on it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_segment: Option<SegmentId>,
}

impl ProbeRecord {
    pub fn new(id: u32, kind: ProbeKind, position: Point) -> Self {
        Self {
            id: ProbeId(id),
            kind,
            position,
            node: None,
            connected_segment: None,
        }
    }

    pub fn voltage_at_node(id: u32, node: NodeId) -> Self {
        let mut probe = Self::new(id, ProbeKind::Voltage, Point::default());
        probe.node = Some(node);
        probe
    }

    pub fn current_on_segment(id: u32, segment: SegmentId) -> Self {
        let mut probe = Self::new(id, ProbeKind::Current, Point::default());
        probe.connected_segment = Some(segment);
        probe
    }

    /// Re-attach after the probe moved: nearest node and nearest segment
    /// within `tolerance` of the probe position. Returns whether the probe
    /// ended up attached to anything.
    pub fn reconnect<Q: WireQuery + ?Sized>(&mut self, graph: &Q, tolerance: f64) -> bool {
        let Point { x, y } = self.position;
        self.node = graph.node_at(x, y, tolerance).map(|n| n.id);
        self.connected_segment = graph.segment_at(x, y, tolerance).map(|hit| hit.segment.id);
        debug!(
            "Reconnected {} probe {}: node {:?}, segment {:?}",
            self.kind, self.id, self.node, self.connected_segment
        );
        self.node.is_some() || self.connected_segment.is_some()
    }

    /// Node this probe measures at.
    ///
    /// An explicit node wins while it is still in the graph. Otherwise the
    /// probe falls back to `node_id1` of its connected segment.
    pub fn resolve_node<Q: WireQuery + ?Sized>(&self, graph: &Q) -> Option<NodeId> {
        self.node
            .filter(|node| graph.node(*node).is_some())
            .or_else(|| {
                self.connected_segment
                    .and_then(|id| graph.segment(id))
                    .map(|segment| segment.node_id1)
            })
    }
}

/// Point every pin attachment and probe placement at `from` to `to`.
///
/// Call after the graph reports a merge.
pub fn remap_node(
    components: &mut [ComponentRecord],
    probes: &mut [ProbeRecord],
    from: NodeId,
    to: NodeId,
) -> usize {
    let mut count = 0;
    for component in components.iter_mut() {
        count += component.remap_node(from, to);
    }
    for probe in probes.iter_mut() {
        if probe.node == Some(from) {
            probe.node = Some(to);
            count += 1;
        }
    }
    count
}

/// Nodes that pins and probes still hold on to
pub fn referenced_nodes(components: &[ComponentRecord], probes: &[ProbeRecord]) -> BTreeSet<NodeId> {
    components
        .iter()
        .flat_map(|c| c.pin_nodes.values().copied())
        .chain(probes.iter().filter_map(|p| p.node))
        .collect()
}
