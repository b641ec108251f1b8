//! HTTP configuration

use serde::{Deserialize, Serialize};
use sluice_config::{ForwardingConfig, RetryConfig};
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout, covering connect through body
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Whether retries draw from the shared retry bucket
    pub adaptive_retries: bool,

    pub retry: RetryConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        ForwardingConfig::default().into()
    }
}

impl From<ForwardingConfig> for HttpConfig {
    fn from(config: ForwardingConfig) -> Self {
        Self {
            timeout: config.client_timeout,
            user_agent: format!("sluice/{}", env!("CARGO_PKG_VERSION")),
            adaptive_retries: config.adaptive_retries,
            retry: config.retry,
        }
    }
}

impl From<&ForwardingConfig> for HttpConfig {
    fn from(config: &ForwardingConfig) -> Self {
        config.clone().into()
    }
}
