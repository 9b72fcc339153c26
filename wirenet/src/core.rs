//! Core compile pipeline shared by the editor and the CLI.
//! resolve -> synthesize, plus the persisted-document and solver entry points.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ConfigError, SimulationConfig};
use crate::netlist::{Netlist, NetlistSynthesizer, SynthesisError};
use crate::persist::{PersistError, SchematicDocument};
use crate::registry::{ComponentRecord, ProbeRecord};
use crate::solver::{SolverBackend, SolverChannel, SolverError, SolverResponse};
use crate::topology::{ConnectivityError, ConnectivityResolver, NetPartition, TopologyError, WireGraph};

#[derive(Debug, thiserror::Error)]
pub enum WirenetError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConnectivityError> for WirenetError {
    fn from(e: ConnectivityError) -> Self {
        WirenetError::Synthesis(e.into())
    }
}

/// Counts for one compile run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileStats {
    pub nodes: usize,
    pub segments: usize,
    pub nets: usize,
    pub components: usize,
    pub probes: usize,
    pub warnings: usize,
}

/// Result of compiling a whole document
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub file: Option<PathBuf>,
    pub partition: NetPartition,
    pub netlist: Netlist,
    pub stats: CompileStats,
}

impl CompileResult {
    pub fn has_warnings(&self) -> bool {
        self.stats.warnings > 0
    }
}

/// Core compile API used by both the editor and the CLI.
pub struct WirenetCore;

impl WirenetCore {
    /// Resolve connectivity and synthesize a netlist in one pass
    pub fn compile(
        graph: &WireGraph,
        components: &[ComponentRecord],
        probes: &[ProbeRecord],
        config: &SimulationConfig,
    ) -> Result<Netlist, SynthesisError> {
        let partition = ConnectivityResolver::resolve(graph, components, probes)?;
        NetlistSynthesizer::synthesize(graph, &partition, components, probes, config)
    }

    /// Replay a stored document and compile it
    pub fn compile_document(
        document: &SchematicDocument,
        config: &Config,
    ) -> Result<CompileResult, WirenetError> {
        let loaded = document.replay(config.editor)?;
        let partition =
            ConnectivityResolver::resolve(&loaded.graph, &loaded.components, &loaded.probes)?;
        let netlist = NetlistSynthesizer::synthesize(
            &loaded.graph,
            &partition,
            &loaded.components,
            &loaded.probes,
            &config.simulation,
        )?;

        let stats = CompileStats {
            nodes: loaded.graph.node_count(),
            segments: loaded.graph.segment_count(),
            nets: partition.len(),
            components: loaded.components.len(),
            probes: loaded.probes.len(),
            warnings: netlist.warnings.len(),
        };
        Ok(CompileResult {
            file: None,
            partition,
            netlist,
            stats,
        })
    }

    /// Load a document from disk and compile it
    pub fn compile_file(path: &Path, config: &Config) -> Result<CompileResult, WirenetError> {
        let document = SchematicDocument::load(path)?;
        let mut result = Self::compile_document(&document, config)?;
        result.file = Some(path.to_path_buf());
        Ok(result)
    }

    /// Send one netlist through a fresh solver channel and wait for the answer
    pub async fn simulate(
        netlist: &Netlist,
        config: &SimulationConfig,
        backend: Arc<dyn SolverBackend>,
    ) -> Result<SolverResponse, WirenetError> {
        let mut channel = SolverChannel::spawn(backend);
        channel.submit(netlist.text.clone(), config.clone());
        channel
            .next_response()
            .await
            .ok_or(WirenetError::Solver(SolverError::ChannelClosed))
    }
}
