//! Wirenet - schematic wire-graph connectivity and netlist synthesis
//!
//! This library keeps the wire graph of an interactive schematic editor,
//! resolves it into electrical nets, and writes a deterministic SPICE-style
//! netlist with probe directives for an external solver.
//!
//! # Quick Start
//!
//! ```
//! use wirenet::prelude::*;
//!
//! let mut graph = WireGraph::new(EditorContext::default());
//! let a = graph.add_node(0.0, 0.0);
//! let b = graph.add_node(100.0, 0.0);
//! graph.add_segment(a.id, b.id).unwrap();
//!
//! let components = vec![
//!     ComponentRecord::new(1, "R", 1, "1k")
//!         .with_pin("1", Some(a.id))
//!         .with_pin("2", Some(b.id)),
//! ];
//!
//! let netlist = WirenetCore::compile(&graph, &components, &[], &SimulationConfig::default()).unwrap();
//! assert!(netlist.text.contains("R1 1 1 1k"));
//! ```
//!
//! # Features
//!
//! - **Wire graph**: snapping, hit testing, split/merge/move of wires
//! - **Connectivity**: deterministic net numbering with a single ground net
//! - **Netlist**: instance lines, analysis and probe directives, warnings
//! - **Solver channel**: single-flight, last-request-wins dispatch

pub mod config;
pub mod core;
pub mod netlist;
pub mod persist;
pub mod registry;
pub mod solver;
pub mod topology;

// Re-export main types
pub use config::{Analysis, Config, EditorContext, SimulationConfig, SolverSettings};
pub use crate::core::{CompileResult, CompileStats, WirenetCore, WirenetError};
pub use netlist::{Netlist, NetlistSynthesizer, ProbeDirective, SynthesisError, SynthesisWarning};
pub use persist::SchematicDocument;
pub use registry::{ComponentId, ComponentRecord, ProbeId, ProbeKind, ProbeRecord};
pub use topology::{
    ConnectivityResolver, NetId, NetPartition, NodeId, Point, SegmentId, TopologyError, WireGraph,
    WireQuery,
};

/// Load a document and compile it with default configuration (convenience wrapper).
pub fn compile_file(path: &std::path::Path) -> Result<CompileResult, WirenetError> {
    WirenetCore::compile_file(path, &Config::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Analysis, CompileResult, ComponentRecord, Config, ConnectivityResolver, EditorContext,
        NetId, Netlist, NodeId, Point, ProbeKind, ProbeRecord, SchematicDocument,
        SimulationConfig, SynthesisError, SynthesisWarning, WireGraph, WirenetCore, WirenetError,
    };
}
