//! Statistics reporting configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// How often the aggregated window is reported and reset
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_report_interval"
    )]
    pub report_interval: Duration,

    /// Sample host CPU utilisation for every report
    #[serde(default = "crate::domains::utils::default_true")]
    pub cpu_sampling: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            report_interval: default_report_interval(),
            cpu_sampling: true,
        }
    }
}

impl Validatable for StatsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.report_interval.as_millis(),
            "report_interval",
            self.domain_name(),
        )
    }

    fn domain_name(&self) -> &'static str {
        "stats"
    }
}

fn default_report_interval() -> Duration {
    Duration::from_secs(4)
}
