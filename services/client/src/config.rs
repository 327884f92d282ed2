//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development.

use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the backend REST API, e.g. `https://api.example.com/api/v1`.
    pub api_base_url: String,
    /// WebSocket endpoint of the chat message bus.
    pub bus_url: String,
    pub log_level: Level,
    /// Page size for chat history fetches.
    pub history_page_size: u32,
    /// Fixed interval between subscribe attempts while the bus is down.
    pub subscribe_retry: Duration,
    /// Maximum bus reconnect attempts before giving up for good.
    pub reconnect_max_attempts: u32,
    /// Base delay for the linearly increasing reconnect backoff.
    pub reconnect_base_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure
    /// tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("API_BASE_URL")
            .map_err(|_| ConfigError::MissingVar("API_BASE_URL".to_string()))?;
        let bus_url = std::env::var("BUS_URL")
            .map_err(|_| ConfigError::MissingVar("BUS_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let history_page_size = parse_var("HISTORY_PAGE_SIZE", 50)?;
        let subscribe_retry = Duration::from_millis(parse_var("SUBSCRIBE_RETRY_MS", 500)?);
        let reconnect_max_attempts = parse_var("RECONNECT_MAX_ATTEMPTS", 5)?;
        let reconnect_base_delay = Duration::from_millis(parse_var("RECONNECT_BASE_DELAY_MS", 1000)?);

        Ok(Self {
            api_base_url,
            bus_url,
            log_level,
            history_page_size,
            subscribe_retry,
            reconnect_max_attempts,
            reconnect_base_delay,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
