//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;

use chrono::NaiveTime;
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
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_allowed_origin: String,
    /// Wall-clock time (UTC) of the nightly statistics run.
    pub stats_refresh_time: NaiveTime,
    /// Capacity of the statistics job queue.
    pub stats_queue_depth: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_allowed_origin = std::env::var("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Statistics Job Settings ---
        let refresh_hour_str =
            std::env::var("STATS_REFRESH_HOUR").unwrap_or_else(|_| "0".to_string());
        let refresh_hour = refresh_hour_str.parse::<u32>().ok().filter(|h| *h < 24).ok_or_else(|| {
            ConfigError::InvalidValue(
                "STATS_REFRESH_HOUR".to_string(),
                format!("'{}' is not an hour between 0 and 23", refresh_hour_str),
            )
        })?;
        let stats_refresh_time = NaiveTime::from_hms_opt(refresh_hour, 0, 0).ok_or_else(|| {
            ConfigError::InvalidValue("STATS_REFRESH_HOUR".to_string(), refresh_hour_str.clone())
        })?;

        let queue_depth_str =
            std::env::var("STATS_QUEUE_DEPTH").unwrap_or_else(|_| "64".to_string());
        let stats_queue_depth = queue_depth_str.parse::<usize>().ok().filter(|d| *d > 0).ok_or_else(|| {
            ConfigError::InvalidValue(
                "STATS_QUEUE_DEPTH".to_string(),
                format!("'{}' is not a positive integer", queue_depth_str),
            )
        })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_allowed_origin,
            stats_refresh_time,
            stats_queue_depth,
        })
    }
}
