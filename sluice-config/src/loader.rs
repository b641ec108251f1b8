//! Configuration loading and environment variable handling

use crate::domains::SluiceConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SLUICE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<SluiceConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: SluiceConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<SluiceConfig> {
        let mut config = SluiceConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<SluiceConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut SluiceConfig) -> ConfigResult<()> {
        self.apply_server_overrides(&mut config.server)?;
        self.apply_admission_overrides(&mut config.admission)?;
        self.apply_worker_overrides(&mut config.worker)?;
        self.apply_stats_overrides(&mut config.stats)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_server_overrides(
        &self,
        config: &mut crate::domains::server::ServerConfig,
    ) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("BIND_ADDRESS") {
            config.bind_address = bind;
        }
        if let Some(port) = self.parse_env_var("HTTP_PORT")? {
            config.port = port;
        }
        Ok(())
    }

    fn apply_admission_overrides(
        &self,
        config: &mut crate::domains::admission::AdmissionConfig,
    ) -> ConfigResult<()> {
        if let Some(threshold) = self.parse_env_var("LOAD_SHED_THRESHOLD")? {
            config.load_shed_threshold = threshold;
        }
        if let Some(threads) = self.parse_env_var("THREAD_COUNT")? {
            config.thread_count = threads;
        }
        if let Some(queue) = self.parse_env_var("QUEUE_LENGTH")? {
            config.queue_length = queue;
        }
        if let Some(timeout) = self.parse_env_millis("BACKLOG_TIMEOUT_MS")? {
            config.backlog_timeout = timeout;
        }
        Ok(())
    }

    fn apply_worker_overrides(
        &self,
        config: &mut crate::domains::worker::WorkerConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("FORWARDING_URL") {
            config.forwarding.url = url;
        }
        if let Some(adaptive) = self.parse_env_var("ADAPTIVE_RETRIES")? {
            config.forwarding.adaptive_retries = adaptive;
        }
        if let Some(timeout) = self.parse_env_millis("CLIENT_TIMEOUT_MS")? {
            config.forwarding.client_timeout = timeout;
        }
        if let Some(cutoff) = self.parse_env_millis("CLIENT_DEADLINE_CUTOFF_MS")? {
            config.compute.deadline_cutoff = cutoff;
        }
        if let Some(quota) = self.parse_env_var("WORK_QUOTA")? {
            config.compute.work_quota = quota;
        }
        Ok(())
    }

    fn apply_stats_overrides(
        &self,
        config: &mut crate::domains::stats::StatsConfig,
    ) -> ConfigResult<()> {
        if let Some(interval) = self.parse_env_millis("REPORT_INTERVAL_MS")? {
            config.report_interval = interval;
        }
        if let Some(sampling) = self.parse_env_var("CPU_SAMPLING")? {
            config.cpu_sampling = sampling;
        }
        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }
        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }
        Ok(())
    }

    /// Parse an environment variable, `None` when it is unset
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(value) => value
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    fn parse_env_millis(&self, name: &str) -> ConfigResult<Option<Duration>> {
        Ok(self.parse_env_var::<u64>(name)?.map(Duration::from_millis))
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
