use sluice_logging::{init_logging, init_simple_tracing, LogFormat, LogLevel, LoggingConfig};

#[test]
fn test_repeated_initialisation_is_harmless() {
    let config = LoggingConfig {
        level: LogLevel::Debug,
        format: LogFormat::Json,
        include_location: true,
    };

    assert!(init_logging(&config).is_ok());
    assert!(init_logging(&LoggingConfig::default()).is_ok());
    assert!(init_simple_tracing("warn").is_ok());

    tracing::info!(component = "logging-test", "subscriber installed");
}
