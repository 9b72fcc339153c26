//! Single-flight solver channel
//!
//! At most one request runs at a time. Submitting while a run is in progress
//! replaces whatever was waiting behind it (the watch channel keeps only the
//! newest value), so the solver always picks up the latest netlist next.
//! Runs are never cancelled; a response to a superseded request is dropped
//! before it reaches the caller.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::{SolverBackend, SolverRequest, SolverResponse};
use crate::config::SimulationConfig;

pub struct SolverChannel {
    request_tx: watch::Sender<Option<SolverRequest>>,
    response_rx: mpsc::UnboundedReceiver<SolverResponse>,
    latest: Option<Uuid>,
    handle: Option<JoinHandle<()>>,
}

impl SolverChannel {
    /// Start the worker task. Must be called inside a tokio runtime.
    pub fn spawn(backend: Arc<dyn SolverBackend>) -> Self {
        let (request_tx, mut request_rx) = watch::channel::<Option<SolverRequest>>(None);
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while request_rx.changed().await.is_ok() {
                let pending = request_rx.borrow_and_update().clone();
                let Some(request) = pending else {
                    continue;
                };

                info!("Dispatching request {} to solver {}", request.id, backend.name());
                let outcome = backend.run(&request).await;
                info!(
                    "Solver {} finished request {} (success: {})",
                    backend.name(),
                    request.id,
                    outcome.is_success()
                );

                let response = SolverResponse {
                    request: request.id,
                    outcome,
                };
                if response_tx.send(response).is_err() {
                    break;
                }
            }
            info!("Solver channel closed");
        });

        Self {
            request_tx,
            response_rx,
            latest: None,
            handle: Some(handle),
        }
    }

    /// Queue a netlist, replacing any request that has not started yet
    pub fn submit(&mut self, netlist: impl Into<String>, config: SimulationConfig) -> Uuid {
        let request = SolverRequest::new(netlist, config);
        let id = request.id;
        self.latest = Some(id);
        // send_replace never fails, even after the worker exits
        self.request_tx.send_replace(Some(request));
        id
    }

    /// Id of the request whose response `next_response` will return
    pub fn latest_request(&self) -> Option<Uuid> {
        self.latest
    }

    /// Wait for the response to the most recent submission.
    ///
    /// Responses to older requests are discarded. Returns `None` once the
    /// worker has stopped.
    pub async fn next_response(&mut self) -> Option<SolverResponse> {
        loop {
            let response = self.response_rx.recv().await?;
            if Some(response.request) == self.latest {
                return Some(response);
            }
            warn!("Ignoring late response to superseded request {}", response.request);
        }
    }
}

impl Drop for SolverChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
