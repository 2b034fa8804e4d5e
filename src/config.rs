//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Database connection parameters
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
    /// Require TLS to the server
    pub use_tls: bool,
}

impl ConnectionSettings {
    /// Build driver connect options
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.use_tls {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(ssl_mode)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Event database connection
    pub connection: ConnectionSettings,

    /// Default `max_events` for replay (0 selects task mode, -1 means all)
    pub max_events: i64,

    /// Default `max_tasks` for replay
    pub max_tasks: i64,

    /// Start with ingestion switched off
    pub ingestion_suppressed: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let user = env::var("EVENTS_DB_USER").map_err(|_| ConfigError::MissingEnv("EVENTS_DB_USER"))?;

        let password = env::var("EVENTS_DB_PASSWORD").unwrap_or_default();

        let database = env::var("EVENTS_DB_NAME").map_err(|_| ConfigError::MissingEnv("EVENTS_DB_NAME"))?;

        let host = env::var("EVENTS_DB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("EVENTS_DB_PORT")
            .unwrap_or_else(|_| "5432".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("EVENTS_DB_PORT"))?;

        let use_tls = parse_flag(
            "EVENTS_DB_TLS",
            &env::var("EVENTS_DB_TLS").unwrap_or_else(|_| "false".to_string()),
        )?;

        let max_events = env::var("EVENTS_MAX_EVENTS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("EVENTS_MAX_EVENTS"))?;

        let max_tasks = env::var("EVENTS_MAX_TASKS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("EVENTS_MAX_TASKS"))?;

        let ingestion_suppressed = parse_flag(
            "EVENTS_INGESTION_SUPPRESSED",
            &env::var("EVENTS_INGESTION_SUPPRESSED").unwrap_or_else(|_| "false".to_string()),
        )?;

        Ok(Self {
            connection: ConnectionSettings {
                user,
                password,
                database,
                host,
                port,
                use_tls,
            },
            max_events,
            max_tasks,
            ingestion_suppressed,
        })
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(name)),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
