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
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Upstream base URL must start with http:// or https://")]
    InvalidUpstreamUrl,

    #[error("Upstream timeouts must be greater than zero")]
    InvalidUpstreamTimeout,

    #[error("Upstream max line length must be greater than zero")]
    InvalidMaxLineLength,

    #[error("Relay channel capacity must be between 1 and 4096")]
    InvalidChannelCapacity,

    #[error("Maximum message length must be greater than zero")]
    InvalidMessageLength,

    #[error("JWT secret must be at least 32 bytes in production")]
    WeakJwtSecret,
}
