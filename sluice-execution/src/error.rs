//! Error types for worker execution

use sluice_http::HttpError;
use thiserror::Error;

/// Worker execution errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] HttpError),

    #[error("No QoS found: {0}")]
    MalformedUpstreamResponse(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl WorkerError {
    /// Message reported to the client alongside the error status
    pub fn client_message(&self) -> &'static str {
        match self {
            WorkerError::Upstream(_) | WorkerError::ConfigurationError(_) => "Error getting URL",
            WorkerError::MalformedUpstreamResponse(_) => "NO RESPONSE",
        }
    }
}

/// Result type for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;
