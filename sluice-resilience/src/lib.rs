//! Resilience patterns for Sluice
//!
//! Retries for upstream calls are bounded twice: by a fixed retry limit and,
//! in adaptive mode, by a [`RetryBucket`] shared across every caller so a
//! failing upstream is not hammered by a retry storm.

pub mod backoff;
pub mod bucket;
pub mod retry;

// Re-export commonly used types
pub use backoff::BackoffWindow;
pub use bucket::RetryBucket;
pub use retry::{RetryExecutor, RetryMode, RetryOutcome, RetryPolicy, Retryable};
