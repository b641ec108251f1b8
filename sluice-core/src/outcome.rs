//! Result of one worker invocation

use std::fmt;

/// QoS sentinel meaning "no measurement, an error occurred"
pub const QOS_UNMEASURED: f64 = -1.0;

/// Outcome produced once per admitted request by a worker strategy
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    message: String,
    qos: f64,
    error: Option<String>,
}

impl RequestOutcome {
    /// Successful outcome; `qos` is clamped into `[0, 1]`
    pub fn success(message: impl Into<String>, qos: f64) -> Self {
        Self {
            message: message.into(),
            qos: qos.clamp(0.0, 1.0),
            error: None,
        }
    }

    /// Successful outcome carrying a QoS reported by someone else, unmodified
    pub fn reported(message: impl Into<String>, qos: f64) -> Self {
        Self {
            message: message.into(),
            qos,
            error: None,
        }
    }

    /// Failed outcome with the unmeasured QoS sentinel
    pub fn failure(message: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            message: message.into(),
            qos: QOS_UNMEASURED,
            error: Some(error.to_string()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn qos(&self) -> f64 {
        self.qos
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the QoS value is a real measurement worth recording
    pub fn has_qos(&self) -> bool {
        self.qos >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome() {
        let outcome = RequestOutcome::success("Rooted", 1.7);
        assert_eq!(outcome.qos(), 1.0);
        assert!(outcome.has_qos());
        assert!(!outcome.is_error());
        assert_eq!(outcome.message(), "Rooted");
    }

    #[test]
    fn test_failure_outcome() {
        let outcome = RequestOutcome::failure("Error getting URL", "connection refused");
        assert_eq!(outcome.qos(), QOS_UNMEASURED);
        assert!(!outcome.has_qos());
        assert_eq!(outcome.error(), Some("connection refused"));
    }
}
