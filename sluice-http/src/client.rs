//! Adaptive retry client

use crate::config::HttpConfig;
use crate::errors::HttpError;
use reqwest::{Client, Response};
use sluice_resilience::{RetryExecutor, RetryPolicy, Retryable};
use tracing::{debug, warn};

/// One GET attempt against the upstream
struct Attempt(Result<Response, reqwest::Error>);

impl Retryable for Attempt {
    fn needs_retry(&self) -> bool {
        match &self.0 {
            Ok(response) => response.status().as_u16() >= 400,
            Err(_) => true,
        }
    }
}

/// HTTP client that retries failed GETs.
///
/// A request is retried on transport errors and on statuses of 400 and above,
/// up to the configured retry limit. With adaptive retries enabled, each
/// retry must also take a token from a bucket shared by every clone of the
/// client; when the bucket is empty the last response is returned as is.
#[derive(Debug, Clone)]
pub struct AdaptiveRetryClient {
    client: Client,
    executor: RetryExecutor,
}

impl AdaptiveRetryClient {
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        let policy = RetryPolicy::from_config(&config.retry, config.adaptive_retries);
        debug!(
            timeout_ms = config.timeout.as_millis() as u64,
            retry_limit = policy.retry_limit,
            adaptive = policy.is_adaptive(),
            "Creating upstream client"
        );

        Ok(Self::with_client(client, policy))
    }

    /// Use an existing reqwest client
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            executor: RetryExecutor::new(policy),
        }
    }

    pub fn is_adaptive(&self) -> bool {
        self.executor.policy().is_adaptive()
    }

    /// GET `url`, retrying per policy.
    ///
    /// Returns the last response received, which may carry an error status
    /// when the retry budget ran out. Returns an error only if the last
    /// attempt produced no response at all.
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        let url = reqwest::Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let client = &self.client;
        let url = &url;
        let outcome = self
            .executor
            .execute(|| async move { Attempt(client.get(url.clone()).send().await) })
            .await;

        match outcome.value.0 {
            Ok(response) => {
                if outcome.attempts > 1 {
                    debug!(
                        attempts = outcome.attempts,
                        status = response.status().as_u16(),
                        "Upstream request finished after retries"
                    );
                }
                Ok(response)
            }
            Err(e) => {
                warn!(attempts = outcome.attempts, error = %e, "Upstream request failed");
                Err(e.into())
            }
        }
    }
}
