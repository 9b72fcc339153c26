//! Topology Module
//!
//! Wire geometry, the mutable wire graph, and the connectivity pass that turns
//! it into electrical nets.

pub mod geometry;
pub mod graph;
pub mod resolver;

pub use geometry::Point;
pub use graph::{
    MoveOutcome, NodeId, SegmentHit, SegmentId, SplitOutcome, TopologyError, WireGraph, WireNode,
    WireQuery, WireSegment,
};
pub use resolver::{ConnectivityError, ConnectivityResolver, Net, NetId, NetPartition, Terminal};
