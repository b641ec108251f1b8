//! Sluice Execution Engine
//!
//! Worker strategies run once per admitted request and produce a
//! [`RequestOutcome`](sluice_core::RequestOutcome). Exactly one strategy is
//! active for the lifetime of a server, chosen from configuration at startup.

pub mod compute;
pub mod error;
pub mod forwarding;
pub mod worker;

// Re-export main types
pub use compute::{ComputeWorker, WORK_PER_UNIT};
pub use error::{WorkerError, WorkerResult};
pub use forwarding::ForwardingWorker;
pub use worker::Worker;
