//! Wire Graph
//!
//! Node-and-segment model of everything the user has drawn. Nodes are wire
//! endpoints and junctions, segments are undirected wires between two nodes.
//! The graph owns node and segment identity: ids are allocated monotonically
//! and never reused, so "lowest id" is a stable tie-breaker for every query.
//!
//! Proximity queries (`node_at`, `segment_at`) back drawing, dragging and probe
//! placement. Mutations either succeed completely or leave the graph untouched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::geometry::{self, Point};
use crate::config::EditorContext;
use crate::registry::ComponentRecord;

/// Identifier of a wire node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a wire segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u32);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A wire endpoint or junction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

impl WireNode {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An undirected wire between two distinct nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireSegment {
    pub id: SegmentId,
    #[serde(rename = "node1")]
    pub node_id1: NodeId,
    #[serde(rename = "node2")]
    pub node_id2: NodeId,
}

impl WireSegment {
    pub fn touches(&self, node: NodeId) -> bool {
        self.node_id1 == node || self.node_id2 == node
    }

    /// The endpoint opposite `node`, if `node` is an endpoint
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.node_id1 == node {
            Some(self.node_id2)
        } else if self.node_id2 == node {
            Some(self.node_id1)
        } else {
            None
        }
    }
}

/// Result of a segment hit test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub segment: WireSegment,
    pub distance: f64,
}

/// Nodes created or reused by splitting a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitOutcome {
    /// Junction inserted at the split point
    pub node: WireNode,
    /// `node_id1 -> node`; keeps the id of the split segment
    pub first: WireSegment,
    /// `node -> node_id2`; freshly allocated
    pub second: WireSegment,
}

/// What happened to a dragged node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    Moved(WireNode),
    /// The node landed on another node and was absorbed into it. Callers must
    /// remap pin and probe references from `absorbed` to `into`.
    Merged { absorbed: NodeId, into: NodeId },
}

/// Rejected graph mutations (the invalid-topology family)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("Invalid topology: node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("Invalid topology: segment {0} does not exist")]
    UnknownSegment(SegmentId),

    #[error("Invalid topology: segment would start and end at node {0}")]
    DegenerateSegment(NodeId),

    #[error("Invalid topology: node {node} still holds pin {pin} of {component}")]
    NodeHasAttachment {
        node: NodeId,
        component: String,
        pin: String,
    },
}

/// Read-only proximity queries against the wire graph.
///
/// Collaborators that re-attach themselves after being moved (probes) talk to
/// the graph only through this trait.
pub trait WireQuery {
    fn node(&self, id: NodeId) -> Option<WireNode>;
    fn segment(&self, id: SegmentId) -> Option<WireSegment>;
    fn node_at(&self, x: f64, y: f64, tolerance: f64) -> Option<WireNode>;
    fn segment_at(&self, x: f64, y: f64, tolerance: f64) -> Option<SegmentHit>;
}

/// The wire graph
#[derive(Debug, Clone)]
pub struct WireGraph {
    nodes: BTreeMap<NodeId, WireNode>,
    segments: BTreeMap<SegmentId, WireSegment>,
    /// node -> incident segments
    incidence: BTreeMap<NodeId, BTreeSet<SegmentId>>,
    next_node_id: u32,
    next_segment_id: u32,
    context: EditorContext,
}

impl WireGraph {
    /// Create an empty graph using the given interaction context
    pub fn new(context: EditorContext) -> Self {
        Self {
            nodes: BTreeMap::new(),
            segments: BTreeMap::new(),
            incidence: BTreeMap::new(),
            next_node_id: 1,
            next_segment_id: 1,
            context,
        }
    }

    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &WireNode> {
        self.nodes.values()
    }

    /// All segments in id order
    pub fn segments(&self) -> impl Iterator<Item = &WireSegment> {
        self.segments.values()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&WireNode> {
        self.nodes.get(&id)
    }

    pub fn get_segment(&self, id: SegmentId) -> Option<&WireSegment> {
        self.segments.get(&id)
    }

    /// Add a node, reusing any existing node within snap tolerance
    pub fn add_node(&mut self, x: f64, y: f64) -> WireNode {
        if let Some(existing) = self.get_node_at(x, y, self.context.snap_tolerance) {
            return existing;
        }

        let node = WireNode {
            id: NodeId(self.next_node_id),
            x,
            y,
        };
        self.next_node_id += 1;
        self.nodes.insert(node.id, node);
        self.incidence.insert(node.id, BTreeSet::new());
        debug!("Added wire node {} at ({}, {})", node.id, x, y);
        node
    }

    /// Connect two existing, distinct nodes.
    ///
    /// Parallel segments between the same pair are accepted; they never
    /// change the net partition.
    pub fn add_segment(
        &mut self,
        node_id1: NodeId,
        node_id2: NodeId,
    ) -> Result<WireSegment, TopologyError> {
        self.require_node(node_id1)?;
        self.require_node(node_id2)?;
        if node_id1 == node_id2 {
            return Err(TopologyError::DegenerateSegment(node_id1));
        }

        let segment = WireSegment {
            id: SegmentId(self.next_segment_id),
            node_id1,
            node_id2,
        };
        self.next_segment_id += 1;
        self.insert_segment(segment);
        debug!(
            "Added wire segment {} ({} - {})",
            segment.id, node_id1, node_id2
        );
        Ok(segment)
    }

    /// Nearest node within `tolerance`; ties go to the lowest id
    pub fn get_node_at(&self, x: f64, y: f64, tolerance: f64) -> Option<WireNode> {
        let query = Point::new(x, y);
        let candidates = self
            .nodes
            .values()
            .map(|n| (n.id, geometry::distance(&query, &n.position())));
        geometry::nearest_within(candidates, tolerance).and_then(|(id, _)| self.nodes.get(&id).copied())
    }

    /// Nearest segment within `tolerance`; ties go to the lowest id
    pub fn get_segment_at(&self, x: f64, y: f64, tolerance: f64) -> Option<SegmentHit> {
        let query = Point::new(x, y);
        let candidates = self.segments.values().filter_map(|s| {
            let (start, end) = self.endpoints(s)?;
            Some((s.id, geometry::distance_point_to_segment(&query, &start, &end)))
        });
        geometry::nearest_within(candidates, tolerance).and_then(|(id, distance)| {
            self.segments
                .get(&id)
                .map(|segment| SegmentHit {
                    segment: *segment,
                    distance,
                })
        })
    }

    /// Every segment incident to `node_id`, in id order
    pub fn get_segments_for_node(&self, node_id: NodeId) -> Vec<WireSegment> {
        self.incidence
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.segments.get(id).copied()).collect())
            .unwrap_or_default()
    }

    /// Positions of a segment's two endpoints
    pub fn endpoints(&self, segment: &WireSegment) -> Option<(Point, Point)> {
        let a = self.nodes.get(&segment.node_id1)?;
        let b = self.nodes.get(&segment.node_id2)?;
        Some((a.position(), b.position()))
    }

    pub fn remove_segment(&mut self, id: SegmentId) -> Result<WireSegment, TopologyError> {
        let segment = self
            .segments
            .remove(&id)
            .ok_or(TopologyError::UnknownSegment(id))?;
        for node in [segment.node_id1, segment.node_id2] {
            if let Some(set) = self.incidence.get_mut(&node) {
                set.remove(&id);
            }
        }
        debug!("Removed wire segment {}", id);
        Ok(segment)
    }

    /// Remove a node together with its incident segments.
    ///
    /// Refuses while any component pin is still attached to the node.
    pub fn remove_node(
        &mut self,
        id: NodeId,
        components: &[ComponentRecord],
    ) -> Result<Vec<WireSegment>, TopologyError> {
        self.require_node(id)?;
        for component in components {
            if let Some(pin) = component.pin_attached_to(id) {
                return Err(TopologyError::NodeHasAttachment {
                    node: id,
                    component: component.designator(),
                    pin: pin.to_string(),
                });
            }
        }

        let incident: Vec<SegmentId> = self
            .incidence
            .get(&id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        let mut removed = Vec::with_capacity(incident.len());
        for segment_id in incident {
            removed.push(self.remove_segment(segment_id)?);
        }

        self.nodes.remove(&id);
        self.incidence.remove(&id);
        debug!("Removed wire node {} and {} segments", id, removed.len());
        Ok(removed)
    }

    /// Replace one segment with two through a junction snapped to `at`.
    ///
    /// The junction reuses an existing node within snap tolerance. Splitting at
    /// (or within snap tolerance of) either endpoint is rejected.
    pub fn split_segment(&mut self, id: SegmentId, at: Point) -> Result<SplitOutcome, TopologyError> {
        let segment = *self
            .segments
            .get(&id)
            .ok_or(TopologyError::UnknownSegment(id))?;

        if let Some(existing) = self.get_node_at(at.x, at.y, self.context.snap_tolerance) {
            if segment.touches(existing.id) {
                return Err(TopologyError::DegenerateSegment(existing.id));
            }
        }

        let node = self.add_node(at.x, at.y);

        // first half keeps the id so references to the segment stay valid
        let first = WireSegment {
            id,
            node_id1: segment.node_id1,
            node_id2: node.id,
        };
        if let Some(set) = self.incidence.get_mut(&segment.node_id2) {
            set.remove(&id);
        }
        self.segments.insert(id, first);
        if let Some(set) = self.incidence.get_mut(&node.id) {
            set.insert(id);
        }

        let second = self.add_segment(node.id, segment.node_id2)?;
        debug!(
            "Split wire segment {} at node {} (new segment {})",
            id, node.id, second.id
        );
        Ok(SplitOutcome {
            node,
            first,
            second,
        })
    }

    /// Draw a wire between two canvas points.
    ///
    /// Each endpoint snaps to an existing node, or lands on the interior of a
    /// nearby segment (which is split to form a junction), or becomes a new
    /// node. On error nothing is committed.
    pub fn draw_wire(&mut self, from: Point, to: Point) -> Result<WireSegment, TopologyError> {
        let checkpoint = self.clone();
        let result = self.connect_points(from, to);
        if result.is_err() {
            *self = checkpoint;
        }
        result
    }

    fn connect_points(&mut self, from: Point, to: Point) -> Result<WireSegment, TopologyError> {
        let a = self.attach_point(from)?;
        let b = self.attach_point(to)?;
        self.add_segment(a.id, b.id)
    }

    fn attach_point(&mut self, point: Point) -> Result<WireNode, TopologyError> {
        let snap = self.context.snap_tolerance;
        if let Some(existing) = self.get_node_at(point.x, point.y, snap) {
            return Ok(existing);
        }

        if let Some(hit) = self.get_segment_at(point.x, point.y, self.context.hit_tolerance) {
            if let Some((start, end)) = self.endpoints(&hit.segment) {
                let proj = geometry::project_onto_segment(&point, &start, &end);
                if let Some(existing) = self.get_node_at(proj.point.x, proj.point.y, snap) {
                    return Ok(existing);
                }
                return Ok(self.split_segment(hit.segment.id, proj.point)?.node);
            }
        }

        Ok(self.add_node(point.x, point.y))
    }

    /// Drag a node to a new position, merging it into any node it lands on
    pub fn move_node(&mut self, id: NodeId, to: Point) -> Result<MoveOutcome, TopologyError> {
        self.require_node(id)?;

        let candidates = self
            .nodes
            .values()
            .filter(|n| n.id != id)
            .map(|n| (n.id, geometry::distance(&to, &n.position())));
        if let Some((target, _)) = geometry::nearest_within(candidates, self.context.snap_tolerance) {
            self.merge_nodes(target, id)?;
            return Ok(MoveOutcome::Merged {
                absorbed: id,
                into: target,
            });
        }

        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(TopologyError::UnknownNode(id))?;
        node.x = to.x;
        node.y = to.y;
        debug!("Moved wire node {} to ({}, {})", id, to.x, to.y);
        Ok(MoveOutcome::Moved(*node))
    }

    /// Fold `absorb` into `keep`.
    ///
    /// Segments between the two would become degenerate and are dropped; the
    /// dropped segment ids are returned.
    pub fn merge_nodes(&mut self, keep: NodeId, absorb: NodeId) -> Result<Vec<SegmentId>, TopologyError> {
        self.require_node(keep)?;
        self.require_node(absorb)?;
        if keep == absorb {
            return Err(TopologyError::DegenerateSegment(keep));
        }

        let incident: Vec<SegmentId> = self
            .incidence
            .remove(&absorb)
            .map(|s| s.into_iter().collect())
            .unwrap_or_default();

        let mut dropped = Vec::new();
        for segment_id in incident {
            let Some(segment) = self.segments.get_mut(&segment_id) else {
                continue;
            };
            if segment.node_id1 == absorb {
                segment.node_id1 = keep;
            }
            if segment.node_id2 == absorb {
                segment.node_id2 = keep;
            }
            if segment.node_id1 == segment.node_id2 {
                self.segments.remove(&segment_id);
                if let Some(set) = self.incidence.get_mut(&keep) {
                    set.remove(&segment_id);
                }
                dropped.push(segment_id);
            } else if let Some(set) = self.incidence.get_mut(&keep) {
                set.insert(segment_id);
            }
        }

        self.nodes.remove(&absorb);
        debug!(
            "Merged wire node {} into {} ({} segments dropped)",
            absorb,
            keep,
            dropped.len()
        );
        Ok(dropped)
    }

    /// Destroy nodes that no segment touches and that are not in `retained`
    /// (the nodes pins and probes still point at). Returns the removed ids.
    pub fn remove_unreferenced_nodes(&mut self, retained: &BTreeSet<NodeId>) -> Vec<NodeId> {
        let orphans: Vec<NodeId> = self
            .incidence
            .iter()
            .filter(|(id, segs)| segs.is_empty() && !retained.contains(id))
            .map(|(id, _)| *id)
            .collect();
        for id in &orphans {
            self.nodes.remove(id);
            self.incidence.remove(id);
        }
        if !orphans.is_empty() {
            debug!("Pruned {} unreferenced wire nodes", orphans.len());
        }
        orphans
    }

    fn require_node(&self, id: NodeId) -> Result<(), TopologyError> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(TopologyError::UnknownNode(id))
        }
    }

    fn insert_segment(&mut self, segment: WireSegment) {
        self.segments.insert(segment.id, segment);
        for node in [segment.node_id1, segment.node_id2] {
            self.incidence.entry(node).or_default().insert(segment.id);
        }
    }
}

impl Default for WireGraph {
    fn default() -> Self {
        Self::new(EditorContext::default())
    }
}

impl WireQuery for WireGraph {
    fn node(&self, id: NodeId) -> Option<WireNode> {
        self.nodes.get(&id).copied()
    }

    fn segment(&self, id: SegmentId) -> Option<WireSegment> {
        self.segments.get(&id).copied()
    }

    fn node_at(&self, x: f64, y: f64, tolerance: f64) -> Option<WireNode> {
        self.get_node_at(x, y, tolerance)
    }

    fn segment_at(&self, x: f64, y: f64, tolerance: f64) -> Option<SegmentHit> {
        self.get_segment_at(x, y, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> WireGraph {
        WireGraph::new(EditorContext::default())
    }

    #[test]
    fn test_add_node_snaps_to_existing() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(3.0, 4.0); // exactly 5.0 away
        let c = g.add_node(20.0, 0.0);

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_add_segment_rejects_bad_endpoints() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);

        assert_eq!(
            g.add_segment(a.id, a.id),
            Err(TopologyError::DegenerateSegment(a.id))
        );
        assert_eq!(
            g.add_segment(a.id, NodeId(99)),
            Err(TopologyError::UnknownNode(NodeId(99)))
        );
        assert_eq!(g.segment_count(), 0);
    }

    #[test]
    fn test_duplicate_segments_tolerated() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(50.0, 0.0);

        let s1 = g.add_segment(a.id, b.id).unwrap();
        let s2 = g.add_segment(b.id, a.id).unwrap();
        assert_ne!(s1.id, s2.id);
        assert_eq!(g.get_segments_for_node(a.id).len(), 2);
    }

    #[test]
    fn test_node_at_tie_breaks_on_lowest_id() {
        let mut g = WireGraph::new(EditorContext::default().with_snap_tolerance(0.5));
        let left = g.add_node(-2.0, 0.0);
        let right = g.add_node(2.0, 0.0);

        let hit = g.get_node_at(0.0, 0.0, 3.0).unwrap();
        assert_eq!(hit.id, left.id);
        assert!(left.id < right.id);
        assert!(g.get_node_at(0.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_segment_at() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(100.0, 0.0);
        let c = g.add_node(0.0, 10.0);
        let d = g.add_node(100.0, 10.0);
        let low = g.add_segment(a.id, b.id).unwrap();
        let high = g.add_segment(c.id, d.id).unwrap();

        let hit = g.get_segment_at(50.0, 2.0, 4.0).unwrap();
        assert_eq!(hit.segment.id, low.id);
        assert!((hit.distance - 2.0).abs() < 1e-9);

        // equidistant: lowest id wins
        let hit = g.get_segment_at(50.0, 5.0, 6.0).unwrap();
        assert_eq!(hit.segment.id, low.id);
        assert!(low.id < high.id);

        assert!(g.get_segment_at(50.0, 30.0, 4.0).is_none());
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(50.0, 0.0);
        let c = g.add_node(100.0, 0.0);
        g.add_segment(a.id, b.id).unwrap();
        g.add_segment(b.id, c.id).unwrap();

        let removed = g.remove_node(b.id, &[]).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(g.segment_count(), 0);
        assert!(g.get_segments_for_node(a.id).is_empty());
        assert!(!g.contains_node(b.id));
    }

    #[test]
    fn test_remove_node_with_pin_attachment_is_rejected() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let r1 = ComponentRecord::new(1, "R", 1, "1k").with_pin("1", Some(a.id));

        let err = g.remove_node(a.id, &[r1]).unwrap_err();
        assert!(matches!(err, TopologyError::NodeHasAttachment { .. }));
        assert!(g.contains_node(a.id));
    }

    #[test]
    fn test_remove_unknown_segment() {
        let mut g = graph();
        assert_eq!(
            g.remove_segment(SegmentId(4)),
            Err(TopologyError::UnknownSegment(SegmentId(4)))
        );
    }

    #[test]
    fn test_split_segment_keeps_first_half_id() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(100.0, 0.0);
        let seg = g.add_segment(a.id, b.id).unwrap();

        let split = g.split_segment(seg.id, Point::new(50.0, 0.0)).unwrap();
        assert_eq!(split.first.id, seg.id);
        assert_eq!(split.first.node_id1, a.id);
        assert_eq!(split.first.node_id2, split.node.id);
        assert_eq!(split.second.node_id1, split.node.id);
        assert_eq!(split.second.node_id2, b.id);
        assert_eq!(g.segment_count(), 2);
        assert_eq!(g.get_segments_for_node(split.node.id).len(), 2);
        assert_eq!(g.get_segments_for_node(b.id), vec![split.second]);
    }

    #[test]
    fn test_split_at_endpoint_is_rejected() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(100.0, 0.0);
        let seg = g.add_segment(a.id, b.id).unwrap();

        let err = g.split_segment(seg.id, Point::new(2.0, 0.0)).unwrap_err();
        assert_eq!(err, TopologyError::DegenerateSegment(a.id));
        assert_eq!(g.segment_count(), 1);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_draw_wire_forms_t_junction() {
        let mut g = graph();
        let bus = g
            .draw_wire(Point::new(0.0, 0.0), Point::new(100.0, 0.0))
            .unwrap();
        let stub = g
            .draw_wire(Point::new(40.0, 60.0), Point::new(40.0, 3.0))
            .unwrap();

        assert_eq!(g.segment_count(), 3);
        let junction = g.get_node(stub.node_id2).unwrap();
        assert_eq!(junction.position(), Point::new(40.0, 0.0));
        assert_eq!(g.get_segments_for_node(junction.id).len(), 3);
        assert_eq!(g.get_segment(bus.id).unwrap().node_id2, junction.id);
    }

    #[test]
    fn test_draw_wire_degenerate_commits_nothing() {
        let mut g = graph();
        g.draw_wire(Point::new(0.0, 0.0), Point::new(100.0, 0.0))
            .unwrap();

        let err = g
            .draw_wire(Point::new(50.0, 1.0), Point::new(51.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, TopologyError::DegenerateSegment(_)));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.segment_count(), 1);
    }

    #[test]
    fn test_move_node_merges_on_overlap() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(50.0, 0.0);
        let c = g.add_node(100.0, 0.0);
        g.add_segment(a.id, b.id).unwrap();
        g.add_segment(b.id, c.id).unwrap();
        g.add_segment(a.id, c.id).unwrap();

        let outcome = g.move_node(c.id, Point::new(51.0, 1.0)).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Merged {
                absorbed: c.id,
                into: b.id
            }
        );
        assert!(!g.contains_node(c.id));
        // b-c collapsed; a-b and a-c (now a-b) remain
        assert_eq!(g.segment_count(), 2);
        assert!(g.segments().all(|s| s.node_id1 != s.node_id2));
    }

    #[test]
    fn test_move_node_plain() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let outcome = g.move_node(a.id, Point::new(30.0, 30.0)).unwrap();

        match outcome {
            MoveOutcome::Moved(node) => assert_eq!(node.position(), Point::new(30.0, 30.0)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_remove_unreferenced_nodes() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(50.0, 0.0);
        let pinned = g.add_node(0.0, 50.0);
        let loose = g.add_node(50.0, 50.0);
        g.add_segment(a.id, b.id).unwrap();

        let retained: BTreeSet<NodeId> = [pinned.id].into_iter().collect();
        let removed = g.remove_unreferenced_nodes(&retained);
        assert_eq!(removed, vec![loose.id]);
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut g = graph();
        let a = g.add_node(0.0, 0.0);
        g.remove_node(a.id, &[]).unwrap();
        let b = g.add_node(0.0, 0.0);
        assert!(b.id > a.id);
    }
}
