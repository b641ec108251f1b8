//! Admission control configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate gate and throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Requests allowed per rate window before shedding, 0 disables the rate gate
    #[serde(default = "default_load_shed_threshold")]
    pub load_shed_threshold: u64,

    /// Length of the rolling rate window
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_rate_window"
    )]
    pub rate_window: Duration,

    /// Number of requests allowed to run a worker concurrently
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    /// Number of requests allowed to wait for a worker slot
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// How long a queued request waits for a worker slot
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_backlog_timeout"
    )]
    pub backlog_timeout: Duration,

    /// Retry-After hints attached to rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<RetryAfterConfig>,
}

/// Suggested client back-off attached to 429 responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAfterConfig {
    /// Hint for rejections caused by load
    #[serde(with = "crate::domains::utils::serde_duration_ms")]
    pub busy: Duration,

    /// Hint for rejections of callers that already went away
    #[serde(with = "crate::domains::utils::serde_duration_ms")]
    pub canceled: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            load_shed_threshold: default_load_shed_threshold(),
            rate_window: default_rate_window(),
            thread_count: default_thread_count(),
            queue_length: default_queue_length(),
            backlog_timeout: default_backlog_timeout(),
            retry_after: None,
        }
    }
}

impl AdmissionConfig {
    /// Total backlog slots: running plus waiting requests
    pub fn backlog_capacity(&self) -> usize {
        self.thread_count + self.queue_length
    }
}

impl Validatable for AdmissionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.thread_count, "thread_count", self.domain_name())?;
        validate_positive(
            self.rate_window.as_millis(),
            "rate_window",
            self.domain_name(),
        )?;
        validate_positive(
            self.backlog_timeout.as_millis(),
            "backlog_timeout",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "admission"
    }
}

fn default_load_shed_threshold() -> u64 {
    10_000
}

fn default_rate_window() -> Duration {
    Duration::from_secs(1)
}

fn default_thread_count() -> usize {
    50
}

fn default_queue_length() -> usize {
    10_000
}

fn default_backlog_timeout() -> Duration {
    Duration::from_secs(600)
}
