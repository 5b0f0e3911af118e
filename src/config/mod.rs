//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `MARKETVERSE_` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use marketverse::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod redis;
mod server;
mod websocket;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use server::ServerConfig;
pub use websocket::WebSocketConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, timeouts, CORS)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL, message persistence)
    pub database: DatabaseConfig,

    /// Redis configuration (durable presence store)
    pub redis: RedisConfig,

    /// Realtime layer configuration (reconciliation, presence timeouts)
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads environment variables with the
    /// `MARKETVERSE` prefix, `__` separating nested values:
    ///
    /// - `MARKETVERSE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `MARKETVERSE__DATABASE__URL=...` -> `database.url = ...`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MARKETVERSE")
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
        self.redis.validate()?;
        self.websocket.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize these tests.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(
            "MARKETVERSE__DATABASE__URL",
            "postgresql://test@localhost/test",
        );
        env::set_var("MARKETVERSE__REDIS__URL", "redis://localhost:6379");
    }

    fn clear_env() {
        env::remove_var("MARKETVERSE__DATABASE__URL");
        env::remove_var("MARKETVERSE__REDIS__URL");
        env::remove_var("MARKETVERSE__SERVER__PORT");
        env::remove_var("MARKETVERSE__WEBSOCKET__RECONCILE_INTERVAL_SECS");
    }

    #[test]
    fn load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("load failed");
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn websocket_overrides_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("MARKETVERSE__WEBSOCKET__RECONCILE_INTERVAL_SECS", "15");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("load failed");
        assert_eq!(config.websocket.reconcile_interval_secs, 15);
    }
}
