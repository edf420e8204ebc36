use thiserror::Error;

/// Top-level error type for the telemetry pipeline.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Redaction policy error: {0}")]
    Policy(#[from] crate::redaction::PolicyError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] crate::transport::DeliveryError),

    #[error("Initialization error: {0}")]
    Initialization(#[from] crate::app::InitializationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
