//! Worker strategy configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker configuration; the forwarding URL selects the strategy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Upstream forwarding settings
    #[serde(default)]
    pub forwarding: ForwardingConfig,

    /// Local compute settings
    #[serde(default)]
    pub compute: ComputeConfig,
}

/// Forwarding strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Upstream URL; empty means requests are computed locally
    #[serde(default)]
    pub url: String,

    /// Gate retries on the shared retry token bucket
    #[serde(default = "crate::domains::utils::default_false")]
    pub adaptive_retries: bool,

    /// Timeout for a single upstream request
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_client_timeout"
    )]
    pub client_timeout: Duration,

    /// Artificial delay applied before every forward
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_min_delay"
    )]
    pub min_delay: Duration,

    /// Retry behaviour
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry configuration for the forwarding client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Lower bound of the random wait before a retry
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_min_retry_wait"
    )]
    pub min_wait: Duration,

    /// Upper bound of the random wait before a retry
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_max_retry_wait"
    )]
    pub max_wait: Duration,

    /// Retry token bucket capacity
    #[serde(default = "default_bucket_capacity")]
    pub bucket_capacity: u32,

    /// Retry tokens added per second
    #[serde(default = "default_bucket_refill_per_second")]
    pub bucket_refill_per_second: f64,
}

/// Compute strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// Soft deadline for a compute request, 0 disables it
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_deadline_cutoff"
    )]
    pub deadline_cutoff: Duration,

    /// Minimum time a compute request keeps working
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_min_run"
    )]
    pub min_run: Duration,

    /// Work units that count as a complete answer
    #[serde(default = "default_work_quota")]
    pub work_quota: u64,
}

impl WorkerConfig {
    /// Whether requests are forwarded upstream instead of computed locally
    pub fn is_forwarding(&self) -> bool {
        !self.forwarding.url.is_empty()
    }
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            adaptive_retries: false,
            client_timeout: default_client_timeout(),
            min_delay: default_min_delay(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            min_wait: default_min_retry_wait(),
            max_wait: default_max_retry_wait(),
            bucket_capacity: default_bucket_capacity(),
            bucket_refill_per_second: default_bucket_refill_per_second(),
        }
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            deadline_cutoff: default_deadline_cutoff(),
            min_run: default_min_run(),
            work_quota: default_work_quota(),
        }
    }
}

impl Validatable for WorkerConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.is_forwarding() {
            self.forwarding.validate()?;
        }
        self.compute.validate()?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "worker"
    }
}

impl Validatable for ForwardingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.url, "url", self.domain_name())?;
        validate_positive(
            self.client_timeout.as_millis(),
            "client_timeout",
            self.domain_name(),
        )?;
        self.retry.validate()
    }

    fn domain_name(&self) -> &'static str {
        "worker.forwarding"
    }
}

impl Validatable for RetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.min_wait > self.max_wait {
            return Err(self.validation_error(format!(
                "min_wait ({:?}) must not exceed max_wait ({:?})",
                self.min_wait, self.max_wait
            )));
        }
        if !self.bucket_refill_per_second.is_finite() || self.bucket_refill_per_second < 0.0 {
            return Err(self.validation_error("bucket_refill_per_second must be a non-negative number"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "worker.forwarding.retry"
    }
}

impl Validatable for ComputeConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.work_quota, "work_quota", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "worker.compute"
    }
}

fn default_client_timeout() -> Duration {
    Duration::from_millis(200)
}

fn default_min_delay() -> Duration {
    Duration::from_millis(10)
}

fn default_retry_limit() -> u32 {
    2
}

fn default_min_retry_wait() -> Duration {
    Duration::from_millis(5)
}

fn default_max_retry_wait() -> Duration {
    Duration::from_millis(50)
}

fn default_bucket_capacity() -> u32 {
    20
}

fn default_bucket_refill_per_second() -> f64 {
    1.0
}

fn default_deadline_cutoff() -> Duration {
    Duration::from_millis(1000)
}

fn default_min_run() -> Duration {
    Duration::from_millis(15)
}

fn default_work_quota() -> u64 {
    205_008
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::default();
        assert!(!config.is_forwarding());
        assert_eq!(config.forwarding.client_timeout, Duration::from_millis(200));
        assert_eq!(config.forwarding.min_delay, Duration::from_millis(10));
        assert_eq!(config.forwarding.retry.retry_limit, 2);
        assert_eq!(config.forwarding.retry.bucket_capacity, 20);
        assert_eq!(config.compute.deadline_cutoff, Duration::from_millis(1000));
        assert_eq!(config.compute.min_run, Duration::from_millis(15));
        assert_eq!(config.compute.work_quota, 205_008);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_forwarding_url_selects_strategy() {
        let mut config = WorkerConfig::default();
        config.forwarding.url = "http://upstream:8080/".to_string();
        assert!(config.is_forwarding());
        assert!(config.validate().is_ok());

        config.forwarding.url = "upstream".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_wait_bounds() {
        let mut retry = RetryConfig::default();
        retry.min_wait = Duration::from_millis(60);
        assert!(retry.validate().is_err());

        retry.min_wait = Duration::from_millis(50);
        assert!(retry.validate().is_ok());
    }
}
