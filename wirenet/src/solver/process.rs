//! Out-of-process solver backend
//!
//! Spawns the configured program, writes the netlist to its stdin and parses
//! the tabular part of stdout. The timeout from the request's solver settings
//! covers both writing stdin and collecting output; the child is killed if it
//! is exceeded.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{ResultTable, SolverBackend, SolverError, SolverOutcome, SolverRequest};

#[derive(Debug, Clone, Default)]
pub struct ProcessSolver;

impl ProcessSolver {
    pub fn new() -> Self {
        Self
    }

    async fn execute(&self, request: &SolverRequest) -> Result<SolverOutcome, SolverError> {
        let settings = &request.config.solver;
        debug!("Spawning solver {} {:?}", settings.program, settings.args);

        let mut child = Command::new(&settings.program)
            .args(&settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let netlist = request.netlist.as_bytes();
        // stdin is dropped when the feed finishes, closing the pipe (EOF)
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(netlist).await {
                // solver exited without reading all of it; its output still counts
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("Solver closed stdin early");
                    Ok(())
                }
                result => result,
            }
        };
        // feeding and collecting run together so a solver that never reads
        // stdin still hits the timeout
        let run = async move {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        let output = match settings.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
                .await
                .map_err(|_| SolverError::Timeout(secs))??,
            None => run.await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let console = format!("{}{}", stdout, stderr);

        if !output.status.success() {
            return Ok(SolverOutcome::Failed {
                diagnostic: format!("{} exited with {}", settings.program, output.status),
                console,
            });
        }

        Ok(match ResultTable::parse(&stdout) {
            Some(table) => SolverOutcome::Completed(table),
            None => SolverOutcome::Failed {
                diagnostic: "solver produced no tabular output".to_string(),
                console,
            },
        })
    }
}

#[async_trait]
impl SolverBackend for ProcessSolver {
    fn name(&self) -> &str {
        "process"
    }

    async fn run(&self, request: &SolverRequest) -> SolverOutcome {
        match self.execute(request).await {
            Ok(outcome) => outcome,
            Err(e) => SolverOutcome::Failed {
                diagnostic: e.to_string(),
                console: String::new(),
            },
        }
    }
}
