//! Editor and simulation configuration.
//!
//! Everything the topology core would otherwise read from editor-wide state is
//! carried here and passed in explicitly. Configuration loads from JSON; every
//! field has a serde default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default radius within which a new point reuses an existing node
pub const DEFAULT_SNAP_TOLERANCE: f64 = 5.0;
/// Default radius for picking wires and nodes under the cursor
pub const DEFAULT_HIT_TOLERANCE: f64 = 10.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

/// Interaction context handed to the wire graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditorContext {
    /// Points closer than this to an existing node are merged into it
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f64,

    /// Pick radius for wires when drawing T-junctions and placing probes
    #[serde(default = "default_hit_tolerance")]
    pub hit_tolerance: f64,
}

fn default_snap_tolerance() -> f64 {
    DEFAULT_SNAP_TOLERANCE
}

fn default_hit_tolerance() -> f64 {
    DEFAULT_HIT_TOLERANCE
}

impl Default for EditorContext {
    fn default() -> Self {
        Self {
            snap_tolerance: DEFAULT_SNAP_TOLERANCE,
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
        }
    }
}

impl EditorContext {
    pub fn with_snap_tolerance(mut self, tolerance: f64) -> Self {
        self.snap_tolerance = tolerance;
        self
    }

    pub fn with_hit_tolerance(mut self, tolerance: f64) -> Self {
        self.hit_tolerance = tolerance;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.snap_tolerance >= 0.0) || !self.snap_tolerance.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "snap_tolerance must be a non-negative number, got {}",
                self.snap_tolerance
            )));
        }
        if !(self.hit_tolerance >= 0.0) || !self.hit_tolerance.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "hit_tolerance must be a non-negative number, got {}",
                self.hit_tolerance
            )));
        }
        Ok(())
    }
}

/// One analysis request rendered as a directive line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Analysis {
    /// DC operating point
    Op,
    /// Transient analysis
    Tran {
        step: f64,
        stop: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<f64>,
    },
    /// DC sweep of a named source
    Dc {
        source: String,
        start: f64,
        stop: f64,
        step: f64,
    },
    /// Small-signal AC sweep
    Ac {
        #[serde(default)]
        sweep: AcSweep,
        points: u32,
        fstart: f64,
        fstop: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcSweep {
    #[default]
    Dec,
    Oct,
    Lin,
}

impl std::fmt::Display for AcSweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcSweep::Dec => write!(f, "dec"),
            AcSweep::Oct => write!(f, "oct"),
            AcSweep::Lin => write!(f, "lin"),
        }
    }
}

impl std::fmt::Display for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Analysis::Op => write!(f, ".op"),
            Analysis::Tran { step, stop, start } => match start {
                Some(start) => write!(f, ".tran {} {} {}", step, stop, start),
                None => write!(f, ".tran {} {}", step, stop),
            },
            Analysis::Dc {
                source,
                start,
                stop,
                step,
            } => write!(f, ".dc {} {} {} {}", source, start, stop, step),
            Analysis::Ac {
                sweep,
                points,
                fstart,
                fstop,
            } => write!(f, ".ac {} {} {} {}", sweep, points, fstart, fstop),
        }
    }
}

/// Out-of-process solver invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Executable to spawn
    #[serde(default = "default_solver_program")]
    pub program: String,

    /// Arguments passed before the netlist is written to stdin
    #[serde(default = "default_solver_args")]
    pub args: Vec<String>,

    /// Wall-clock limit for one run; `None` waits indefinitely
    #[serde(default = "default_solver_timeout")]
    pub timeout_secs: Option<u64>,
}

fn default_solver_program() -> String {
    "ngspice".to_string()
}

fn default_solver_args() -> Vec<String> {
    vec!["-b".to_string(), "-p".to_string()]
}

fn default_solver_timeout() -> Option<u64> {
    Some(30)
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            program: default_solver_program(),
            args: default_solver_args(),
            timeout_secs: default_solver_timeout(),
        }
    }
}

/// What to ask the solver for, and how to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// First line of the netlist
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_analyses")]
    pub analyses: Vec<Analysis>,

    #[serde(default)]
    pub solver: SolverSettings,
}

fn default_title() -> String {
    "wirenet circuit".to_string()
}

fn default_analyses() -> Vec<Analysis> {
    vec![Analysis::Op]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            analyses: default_analyses(),
            solver: SolverSettings::default(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub editor: EditorContext,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.editor.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }
}
