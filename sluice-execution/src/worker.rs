//! Active worker strategy

use crate::compute::ComputeWorker;
use crate::error::WorkerResult;
use crate::forwarding::ForwardingWorker;
use sluice_config::WorkerConfig;
use sluice_core::{Clock, RequestOutcome};
use std::sync::Arc;
use tracing::info;

/// The strategy every admitted request is handed to
#[derive(Debug, Clone)]
pub enum Worker {
    Forwarding(ForwardingWorker),
    Compute(ComputeWorker),
}

impl Worker {
    /// Forwarding when an upstream url is configured, compute otherwise
    pub fn from_config(config: &WorkerConfig, clock: Arc<Clock>) -> WorkerResult<Self> {
        let worker = if config.is_forwarding() {
            Worker::Forwarding(ForwardingWorker::from_config(&config.forwarding)?)
        } else {
            Worker::Compute(ComputeWorker::from_config(clock, &config.compute))
        };
        info!(strategy = worker.name(), "Worker strategy selected");
        Ok(worker)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Worker::Forwarding(_) => "forwarding",
            Worker::Compute(_) => "compute",
        }
    }

    /// Handle one request. Never fails; errors are carried in the outcome.
    pub async fn process(&self) -> RequestOutcome {
        match self {
            Worker::Forwarding(worker) => worker.process().await,
            Worker::Compute(worker) => worker.process().await,
        }
    }
}
