//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("{field} must lie between 0.0 and 1.0")]
    OutOfUnitRange { field: &'static str },

    #[error("Temperature must lie between 0.0 and 2.0")]
    InvalidTemperature,

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("Default agent must be a routable agent")]
    InvalidDefaultAgent,

    #[error("Invalid endpoint URL for {agent}: {endpoint}")]
    InvalidEndpoint { agent: &'static str, endpoint: String },
}
