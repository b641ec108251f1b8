//! Forwarding strategy: relay each request to an upstream service

use crate::error::{WorkerError, WorkerResult};
use serde::Deserialize;
use sluice_config::ForwardingConfig;
use sluice_core::RequestOutcome;
use sluice_http::{AdaptiveRetryClient, HttpConfig, HttpError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// The only field read from an upstream answer
#[derive(Debug, Deserialize)]
struct UpstreamReply {
    #[serde(rename = "QoS")]
    qos: f64,
}

/// Forwards every request to `url` and relays the upstream's QoS verbatim
#[derive(Debug, Clone)]
pub struct ForwardingWorker {
    client: AdaptiveRetryClient,
    url: String,
    min_delay: Duration,
}

impl ForwardingWorker {
    pub fn new(client: AdaptiveRetryClient, url: impl Into<String>, min_delay: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            min_delay,
        }
    }

    pub fn from_config(config: &ForwardingConfig) -> WorkerResult<Self> {
        if config.url.is_empty() {
            return Err(WorkerError::ConfigurationError(
                "forwarding url is empty".to_string(),
            ));
        }
        let client = AdaptiveRetryClient::new(HttpConfig::from(config))?;
        Ok(Self::new(client, config.url.clone(), config.min_delay))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_adaptive(&self) -> bool {
        self.client.is_adaptive()
    }

    pub async fn process(&self) -> RequestOutcome {
        sleep(self.min_delay).await;

        match self.forward().await {
            Ok((body, qos)) => RequestOutcome::reported(body, qos),
            Err(e) => {
                warn!(url = %self.url, error = %e, "Forwarding failed");
                RequestOutcome::failure(e.client_message(), e)
            }
        }
    }

    /// Fetch the upstream answer, returning the raw body and its QoS
    async fn forward(&self) -> WorkerResult<(String, f64)> {
        let response = self.client.get(&self.url).await?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(HttpError::UpstreamStatus { status }.into());
        }

        let body = response.text().await.map_err(HttpError::from)?;
        let qos = parse_qos(&body)?;
        Ok((body, qos))
    }
}

fn parse_qos(body: &str) -> WorkerResult<f64> {
    if body.trim().is_empty() {
        return Err(WorkerError::MalformedUpstreamResponse(
            "empty body".to_string(),
        ));
    }
    serde_json::from_str::<UpstreamReply>(body)
        .map(|reply| reply.qos)
        .map_err(|e| WorkerError::MalformedUpstreamResponse(e.to_string()))
}
