//! Admission rejections and their HTTP form

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    CapacityExceeded,
    BacklogTimeout,
    Canceled,
}

/// A request refused before any worker ran
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .kind.message())]
pub struct AdmissionRejection {
    kind: RejectionKind,
    retry_after: Option<Duration>,
}

impl RejectionKind {
    /// Plain-text body sent to the client
    pub fn message(&self) -> &'static str {
        match self {
            RejectionKind::CapacityExceeded => "Server capacity exceeded.",
            RejectionKind::BacklogTimeout => {
                "Timed out while waiting for a pending request to complete."
            }
            RejectionKind::Canceled => "Context was canceled.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::CapacityExceeded => "capacity_exceeded",
            RejectionKind::BacklogTimeout => "backlog_timeout",
            RejectionKind::Canceled => "canceled",
        }
    }
}

impl AdmissionRejection {
    pub fn new(kind: RejectionKind, retry_after: Option<Duration>) -> Self {
        Self { kind, retry_after }
    }

    pub fn kind(&self) -> RejectionKind {
        self.kind
    }

    /// Suggested client back-off, if hints are configured
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    /// `Retry-After` value in whole seconds, rounded up
    fn retry_after_seconds(&self) -> Option<u64> {
        self.retry_after
            .map(|hint| hint.as_millis().div_ceil(1000) as u64)
    }
}

impl IntoResponse for AdmissionRejection {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), self.kind.message()).into_response();

        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if let Some(seconds) = self.retry_after_seconds() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_rejection_response() {
        let rejection = AdmissionRejection::new(RejectionKind::BacklogTimeout, None);
        let response = rejection.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            body_text(response).await,
            "Timed out while waiting for a pending request to complete."
        );
    }

    #[tokio::test]
    async fn test_retry_after_header() {
        let rejection = AdmissionRejection::new(
            RejectionKind::CapacityExceeded,
            Some(Duration::from_millis(1_500)),
        );
        let response = rejection.into_response();

        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "2");
        assert_eq!(body_text(response).await, "Server capacity exceeded.");
    }

    #[test]
    fn test_display_matches_body() {
        let rejection = AdmissionRejection::new(RejectionKind::Canceled, None);
        assert_eq!(rejection.to_string(), "Context was canceled.");
        assert_eq!(rejection.kind().as_str(), "canceled");
    }
}
