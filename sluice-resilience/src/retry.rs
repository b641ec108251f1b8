//! Retry policy and executor

use std::future::Future;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::debug;

use crate::backoff::BackoffWindow;
use crate::bucket::RetryBucket;

/// How retries are budgeted beyond the retry limit
#[derive(Debug, Clone)]
pub enum RetryMode {
    /// Retry whenever the limit allows
    Unconditional,
    /// Each retry must also take a token from the shared bucket
    Adaptive(Arc<RetryBucket>),
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub retry_limit: u32,

    /// Wait drawn before every retry
    pub wait: BackoffWindow,

    pub mode: RetryMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&sluice_config::RetryConfig::default(), false)
    }
}

impl RetryPolicy {
    /// Build a policy from configuration.
    ///
    /// In adaptive mode a fresh bucket is created; every executor cloned from
    /// the policy shares it.
    pub fn from_config(config: &sluice_config::RetryConfig, adaptive: bool) -> Self {
        let mode = if adaptive {
            RetryMode::Adaptive(Arc::new(RetryBucket::from_config(config)))
        } else {
            RetryMode::Unconditional
        };

        Self {
            retry_limit: config.retry_limit,
            wait: BackoffWindow::new(config.min_wait, config.max_wait),
            mode,
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self.mode, RetryMode::Adaptive(_))
    }

    /// Whether the budget allows one more retry. Consumes a bucket token in
    /// adaptive mode.
    fn grant_retry(&self) -> bool {
        match &self.mode {
            RetryMode::Unconditional => true,
            RetryMode::Adaptive(bucket) => bucket.try_acquire(),
        }
    }
}

/// Results that may call for another attempt
pub trait Retryable {
    /// Whether this result should be retried if the budget allows
    fn needs_retry(&self) -> bool;
}

impl<T, E> Retryable for Result<T, E> {
    fn needs_retry(&self) -> bool {
        self.is_err()
    }
}

/// Final result of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Result of the last attempt made
    pub value: T,
    /// Total attempts, including the first
    pub attempts: u32,
}

/// Retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        T: Retryable,
    {
        self.execute_with_context(|_attempt| f()).await
    }

    /// Execute an operation with retry logic and attempt context.
    ///
    /// The last attempt's result is returned whether or not it succeeded.
    pub async fn execute_with_context<F, Fut, T>(&self, mut f: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = T>,
        T: Retryable,
    {
        let mut attempt = 1;
        let mut value = f(attempt).await;

        while value.needs_retry() && attempt <= self.policy.retry_limit {
            if !self.policy.grant_retry() {
                debug!(attempt, "Retry budget exhausted, giving up");
                break;
            }

            let delay = self.policy.wait.sample();
            debug!(attempt, ?delay, "Attempt failed, retrying");
            sleep(delay).await;

            attempt += 1;
            value = f(attempt).await;
        }

        RetryOutcome {
            value,
            attempts: attempt,
        }
    }
}
