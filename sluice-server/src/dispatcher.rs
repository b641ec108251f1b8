//! Per-request dispatch: run the worker, record statistics, build the answer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sluice_core::{Clock, StatsAggregator};
use sluice_execution::Worker;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// JSON body of every worker answer, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "RequestId")]
    pub request_id: String,
    #[serde(rename = "AgentId")]
    pub agent_id: String,
    #[serde(rename = "AgentVersion")]
    pub agent_version: String,
    #[serde(rename = "QoS")]
    pub qos: f64,
    #[serde(rename = "Message")]
    pub message: String,
}

/// Answer for a caller that is still waiting
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: StatusCode,
    pub body: ResponseEnvelope,
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Runs the worker for admitted requests
#[derive(Debug)]
pub struct Dispatcher {
    worker: Worker,
    stats: Arc<StatsAggregator>,
    clock: Arc<Clock>,
    agent_id: Uuid,
    agent_version: String,
}

impl Dispatcher {
    pub fn new(
        worker: Worker,
        stats: Arc<StatsAggregator>,
        clock: Arc<Clock>,
        agent_id: Uuid,
        agent_version: impl Into<String>,
    ) -> Self {
        Self {
            worker,
            stats,
            clock,
            agent_id,
            agent_version: agent_version.into(),
        }
    }

    pub fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Handle one admitted request.
    ///
    /// Returns `None` when the caller went away while the worker ran. Latency
    /// and the closed connection are recorded exactly once either way.
    pub async fn dispatch(&self, cancel: &CancellationToken) -> Option<DispatchResponse> {
        let start = self.clock.now();

        self.stats.record_accepted();
        self.stats.record_received();

        let outcome = self.worker.process().await;
        if outcome.has_qos() {
            self.stats.record_qos(outcome.qos());
        }
        if !outcome.is_error() {
            self.stats.record_processed_request();
        }

        let response = if cancel.is_cancelled() {
            debug!("Caller went away, dropping response");
            None
        } else {
            let status = if outcome.is_error() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::OK
            };
            let body = ResponseEnvelope {
                request_id: Uuid::new_v4().to_string(),
                agent_id: self.agent_id.to_string(),
                agent_version: self.agent_version.clone(),
                qos: outcome.qos(),
                message: outcome.message().to_string(),
            };
            self.stats.record_processed_conn();
            Some(DispatchResponse { status, body })
        };

        self.stats.record_latency(self.clock.elapsed(start));
        self.stats.record_closed_conn();

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_config::WorkerConfig;
    use std::time::Duration;

    fn dispatcher(stats: Arc<StatsAggregator>) -> Dispatcher {
        let clock = Clock::manual(1_000);
        let mut config = WorkerConfig::default();
        config.compute.min_run = Duration::ZERO;
        config.compute.work_quota = sluice_execution::WORK_PER_UNIT;

        let worker = Worker::from_config(&config, clock.clone()).unwrap();
        Dispatcher::new(worker, stats, clock, Uuid::new_v4(), "1.0")
    }

    #[tokio::test]
    async fn test_successful_dispatch() {
        let stats = Arc::new(StatsAggregator::new());
        let dispatcher = dispatcher(stats.clone());

        let response = dispatcher
            .dispatch(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.message, "Rooted");
        assert_eq!(response.body.qos, 1.0);
        assert_eq!(response.body.agent_version, "1.0");
        assert_eq!(response.body.agent_id, dispatcher.agent_id().to_string());
        assert!(Uuid::parse_str(&response.body.request_id).is_ok());

        let window = stats.snapshot();
        assert_eq!(window.conn_accepted, 1);
        assert_eq!(window.rqst_received, 1);
        assert_eq!(window.rqst_processed, 1);
        assert_eq!(window.conn_processed, 1);
        assert_eq!(window.conn_closed, 1);
        assert_eq!(window.latencies.len(), 1);
        assert_eq!(window.qos_values, vec![1.0]);
    }

    #[tokio::test]
    async fn test_canceled_caller_gets_no_response() {
        let stats = Arc::new(StatsAggregator::new());
        let dispatcher = dispatcher(stats.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let response = dispatcher.dispatch(&cancel).await;

        assert!(response.is_none());
        let window = stats.snapshot();
        assert_eq!(window.rqst_processed, 1);
        assert_eq!(window.conn_processed, 0);
        assert_eq!(window.conn_closed, 1);
        assert_eq!(window.latencies.len(), 1);
    }

    #[test]
    fn test_envelope_field_names() {
        let envelope = ResponseEnvelope {
            request_id: "r".to_string(),
            agent_id: "a".to_string(),
            agent_version: "1.0".to_string(),
            qos: 0.5,
            message: "Rooted".to_string(),
        };
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["RequestId"], "r");
        assert_eq!(json["AgentId"], "a");
        assert_eq!(json["AgentVersion"], "1.0");
        assert_eq!(json["QoS"], 0.5);
        assert_eq!(json["Message"], "Rooted");
    }
}
