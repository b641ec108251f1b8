//! Upstream HTTP client for Sluice
//!
//! Provides the forwarding client used by the forwarding worker: a reqwest
//! client with a per-request timeout and retries bounded by a fixed limit
//! and, optionally, a shared retry budget.

pub mod client;
pub mod config;
pub mod errors;

// Re-export main types for convenience
pub use client::AdaptiveRetryClient;
pub use config::HttpConfig;
pub use errors::HttpError;
