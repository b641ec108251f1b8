//! Logging initialisation for Sluice
//!
//! Every crate in the workspace emits `tracing` events; this crate installs
//! the process-wide subscriber from a [`LoggingConfig`].

pub mod init;

pub use init::{env_filter, init_logging, init_simple_tracing};
pub use sluice_config::{LogFormat, LogLevel, LoggingConfig};
