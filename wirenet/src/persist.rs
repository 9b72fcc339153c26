//! Schematic persistence records.
//!
//! A saved schematic is plain data: node and segment records plus the component
//! and probe lists. Loading replays `add_node` / `add_segment` in stored order,
//! so the graph re-derives its own ids and the stored references are remapped
//! onto them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EditorContext;
use crate::registry::{ComponentRecord, ProbeRecord};
use crate::topology::{NodeId, SegmentId, TopologyError, WireGraph, WireNode, WireSegment};

pub const DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stored segment {segment} is invalid: {source}")]
    Segment {
        segment: SegmentId,
        #[source]
        source: TopologyError,
    },

    #[error("Stored record references unknown node {0}")]
    UnknownNode(NodeId),
}

/// Everything needed to rebuild an editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicDocument {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,

    #[serde(default)]
    pub nodes: Vec<WireNode>,

    #[serde(default)]
    pub segments: Vec<WireSegment>,

    #[serde(default)]
    pub components: Vec<ComponentRecord>,

    #[serde(default)]
    pub probes: Vec<ProbeRecord>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// A replayed document
#[derive(Debug, Clone)]
pub struct LoadedSchematic {
    pub graph: WireGraph,
    pub components: Vec<ComponentRecord>,
    pub probes: Vec<ProbeRecord>,
}

impl SchematicDocument {
    /// Snapshot the current session in id order
    pub fn capture(graph: &WireGraph, components: &[ComponentRecord], probes: &[ProbeRecord]) -> Self {
        Self {
            version: default_version(),
            saved_at: Utc::now(),
            nodes: graph.nodes().copied().collect(),
            segments: graph.segments().copied().collect(),
            components: components.to_vec(),
            probes: probes.to_vec(),
        }
    }

    /// Rebuild a graph by replaying the stored records.
    ///
    /// Nodes that land within snap tolerance of an earlier node collapse into
    /// it, exactly as they would have while drawing.
    pub fn replay(&self, context: EditorContext) -> Result<LoadedSchematic, PersistError> {
        let mut graph = WireGraph::new(context);

        let mut node_map: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for record in &self.nodes {
            let node = graph.add_node(record.x, record.y);
            if node_map.insert(record.id, node.id).is_some() {
                warn!("Document lists node {} more than once", record.id);
            }
        }
        let remap = |id: NodeId| node_map.get(&id).copied().ok_or(PersistError::UnknownNode(id));

        let mut segment_map: BTreeMap<SegmentId, SegmentId> = BTreeMap::new();
        for record in &self.segments {
            let a = remap(record.node_id1)?;
            let b = remap(record.node_id2)?;
            if a == b {
                // both ends collapsed into one node on replay
                warn!("Dropping stored segment {} (endpoints coincide)", record.id);
                continue;
            }
            let segment = graph.add_segment(a, b).map_err(|source| PersistError::Segment {
                segment: record.id,
                source,
            })?;
            segment_map.insert(record.id, segment.id);
        }

        // Stale pin and probe references are dropped here; synthesis reports
        // them as floating pins and dangling probes
        let mut components = self.components.clone();
        for component in &mut components {
            let designator = component.designator();
            component.pin_nodes.retain(|pin, node| match node_map.get(node) {
                Some(mapped) => {
                    *node = *mapped;
                    true
                }
                None => {
                    warn!("Pin {} of {} references unknown node {}", pin, designator, node);
                    false
                }
            });
        }

        let mut probes = self.probes.clone();
        for probe in &mut probes {
            if let Some(node) = probe.node {
                probe.node = node_map.get(&node).copied();
                if probe.node.is_none() {
                    warn!("Probe {} references unknown node {}", probe.id, node);
                }
            }
            probe.connected_segment = probe
                .connected_segment
                .and_then(|id| segment_map.get(&id).copied());
        }

        debug!(
            "Replayed document: {} nodes, {} segments, {} components, {} probes",
            graph.node_count(),
            graph.segment_count(),
            components.len(),
            probes.len()
        );

        Ok(LoadedSchematic {
            graph,
            components,
            probes,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        std::fs::write(path, self.to_json_pretty()?)?;
        debug!("Saved schematic document to {:?}", path);
        Ok(())
    }
}
