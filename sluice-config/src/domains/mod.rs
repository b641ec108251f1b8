//! Domain-specific configuration modules

pub mod admission;
pub mod logging;
pub mod server;
pub mod stats;
pub mod utils;
pub mod worker;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Sluice configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SluiceConfig {
    /// Listener configuration
    #[serde(default)]
    pub server: server::ServerConfig,

    /// Rate gate and throttle configuration
    #[serde(default)]
    pub admission: admission::AdmissionConfig,

    /// Worker strategy configuration
    #[serde(default)]
    pub worker: worker::WorkerConfig,

    /// Statistics reporting configuration
    #[serde(default)]
    pub stats: stats::StatsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl SluiceConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.admission.validate()?;
        self.worker.validate()?;
        self.stats.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = SluiceConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
