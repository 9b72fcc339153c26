//! External Solver Module
//!
//! The numeric solver runs out of process. This module defines the request and
//! result payloads, the backend trait every solver implements, and the
//! single-flight channel the editor talks to.

pub mod channel;
pub mod process;

pub use channel::SolverChannel;
pub use process::ProcessSolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SimulationConfig;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Solver timed out after {0}s")]
    Timeout(u64),

    #[error("Solver channel closed")]
    ChannelClosed,
}

/// One simulation request: netlist text plus the configuration it was built with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverRequest {
    pub id: Uuid,
    pub netlist: String,
    pub config: SimulationConfig,
}

impl SolverRequest {
    pub fn new(netlist: impl Into<String>, config: SimulationConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            netlist: netlist.into(),
            config,
        }
    }
}

/// Tabular solver output; columns are net/measurement keys such as `v(2)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl ResultTable {
    /// Values of one column (case-insensitive key)
    pub fn column(&self, key: &str) -> Option<Vec<f64>> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(key))?;
        Some(self.rows.iter().filter_map(|row| row.get(index).copied()).collect())
    }

    /// Parse whitespace-separated columns: a header line of names followed by
    /// numeric rows of the same width. Repeated headers (page breaks) and
    /// banner lines are skipped.
    pub fn parse(text: &str) -> Option<ResultTable> {
        let mut table: Option<ResultTable> = None;

        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() || tokens[0].chars().all(|c| c == '-') || tokens[0].starts_with('*') {
                continue;
            }
            let numbers: Option<Vec<f64>> = tokens.iter().map(|t| t.parse::<f64>().ok()).collect();

            if table.is_none() {
                if numbers.is_none() {
                    table = Some(ResultTable {
                        columns: tokens.iter().map(|t| t.to_string()).collect(),
                        rows: Vec::new(),
                    });
                }
                continue;
            }
            let Some(current) = table.as_mut() else {
                continue;
            };

            match numbers {
                Some(row) if row.len() == current.columns.len() => current.rows.push(row),
                None if current.rows.is_empty() => {
                    // banner text before the real header
                    current.columns = tokens.iter().map(|t| t.to_string()).collect();
                }
                _ => {}
            }
        }

        table.filter(|t| !t.rows.is_empty())
    }
}

/// What came back from the solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SolverOutcome {
    Completed(ResultTable),
    Failed {
        diagnostic: String,
        /// Whatever console output was captured before the failure
        console: String,
    },
}

impl SolverOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SolverOutcome::Completed(_))
    }
}

/// Response tagged with the request it answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverResponse {
    pub request: Uuid,
    pub outcome: SolverOutcome,
}

/// Common trait for solver backends
#[async_trait]
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Run one request to completion. Failures are reported in the outcome.
    async fn run(&self, request: &SolverRequest) -> SolverOutcome;
}
