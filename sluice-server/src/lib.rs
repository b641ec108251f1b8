//! Sluice Server
//!
//! Wires the admission controller, the active worker strategy and the stats
//! aggregator behind a single `GET /` endpoint, and runs the periodic stats
//! reporter alongside the listener.

pub mod dispatcher;
pub mod handler;
pub mod reporter;
pub mod startup;

// Re-export main components
pub use dispatcher::{DispatchResponse, Dispatcher, ResponseEnvelope};
pub use handler::{router, AppState};
pub use reporter::StatsReporter;
pub use startup::Server;
