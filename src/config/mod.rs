//! Application configuration module
//!
//! Configuration is read from environment variables with the `CHAT_RELAY`
//! prefix; nested values use a double underscore separator.
//!
//! # Example
//!
//! ```no_run
//! use chat_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod relay;
mod server;
mod upstream;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use relay::RelayConfig;
pub use server::{Environment, ServerConfig};
pub use upstream::UpstreamConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Transcript store connection
    pub database: DatabaseConfig,

    /// Generation backend location and timeouts
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Per-turn relay limits
    #[serde(default)]
    pub relay: RelayConfig,

    /// Bearer token validation
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file is read first when present.
    ///
    /// - `CHAT_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_RELAY__UPSTREAM__BASE_URL=...` -> `upstream.base_url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.upstream.validate()?;
        self.relay.validate()?;
        self.auth.validate(&self.server.environment)?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "CHAT_RELAY__DATABASE__URL",
        "CHAT_RELAY__AUTH__JWT_SECRET",
        "CHAT_RELAY__SERVER__PORT",
        "CHAT_RELAY__SERVER__ENVIRONMENT",
        "CHAT_RELAY__UPSTREAM__BASE_URL",
        "CHAT_RELAY__RELAY__CHANNEL_CAPACITY",
    ];

    fn set_minimal_env() {
        env::set_var("CHAT_RELAY__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("CHAT_RELAY__AUTH__JWT_SECRET", "dev-secret");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.upstream.base_url, "http://localhost:8000");
        assert_eq!(config.relay.channel_capacity, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHAT_RELAY__SERVER__PORT", "3000");
        env::set_var("CHAT_RELAY__UPSTREAM__BASE_URL", "https://gen.internal");
        env::set_var("CHAT_RELAY__RELAY__CHANNEL_CAPACITY", "16");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upstream.base_url, "https://gen.internal");
        assert_eq!(config.relay.channel_capacity, 16);
    }

    #[test]
    fn test_missing_auth_secret_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("CHAT_RELAY__DATABASE__URL", "postgresql://test@localhost/test");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_production_requires_strong_secret() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHAT_RELAY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(config.validate(), Err(ValidationError::WeakJwtSecret));
    }
}
