//! Domain-driven configuration management for Sluice
//!
//! Configuration is split by functional domain (server, admission, worker,
//! stats, logging), each with defaults, validation and `SLUICE_*`
//! environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    admission::{AdmissionConfig, RetryAfterConfig},
    logging::{LogFormat, LogLevel, LoggingConfig},
    server::ServerConfig,
    stats::StatsConfig,
    worker::{ComputeConfig, ForwardingConfig, RetryConfig, WorkerConfig},
    SluiceConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration_ms;
