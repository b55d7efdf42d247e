//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use golf::{db::DatabaseConfig, room::RoomConfig};
use std::{net::SocketAddr, time::Duration};

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost/golf";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Room queue sizes and heartbeat timings
    pub room: RoomConfig,
    /// Run against in-process stores instead of PostgreSQL
    pub use_memory: bool,
    /// Prometheus scrape address; no exporter when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// CLI overrides win over `SERVER_BIND`, `DATABASE_URL` and `USE_MEMORY_STORE`.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory_override: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(addr) => addr,
            None => parse_required_or("SERVER_BIND", DEFAULT_BIND)?,
        };

        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 2),
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 10),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 600),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800),
        };

        let defaults = RoomConfig::default();
        let room = RoomConfig {
            inbox_capacity: parse_env_or("ROOM_INBOX_CAPACITY", defaults.inbox_capacity),
            outbound_capacity: parse_env_or("ROOM_OUTBOUND_CAPACITY", defaults.outbound_capacity),
            ping_interval: secs_env_or("WS_PING_INTERVAL_SECS", defaults.ping_interval),
            pong_wait: secs_env_or("WS_PONG_WAIT_SECS", defaults.pong_wait),
            write_wait: secs_env_or("WS_WRITE_WAIT_SECS", defaults.write_wait),
            max_message_bytes: parse_env_or("WS_MAX_MESSAGE_BYTES", defaults.max_message_bytes),
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{value}' is not an IP:PORT address"),
            })?),
            Err(_) => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            room,
            use_memory: memory_override || parse_env_or("USE_MEMORY_STORE", false),
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.use_memory && self.database.database_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set a postgres:// URL or run with --memory".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.room.write_wait.is_zero() {
            return Err(ConfigError::Invalid {
                var: "WS_WRITE_WAIT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        self.room
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "ROOM_*/WS_*".to_string(),
                reason,
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn secs_env_or(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Like [`parse_env_or`], but a present and unparsable value is an error.
fn parse_required_or<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("could not parse '{raw}'"),
    })
}
