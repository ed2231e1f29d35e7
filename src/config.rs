//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file backing the cache table
    pub database_path: PathBuf,
    /// HTTP listen host
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of open store connections
    pub pool_size: usize,
    /// How long a request waits for a free connection
    pub acquire_timeout: Duration,
    /// How long SQLite retries a locked database before failing
    pub busy_timeout: Duration,
    /// Upper bound on a single request's lifetime
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    ///
    /// # Environment Variables
    /// - `DATABASE_PATH` - SQLite file (default: cache.db)
    /// - `SERVER_HOST` - Listen host (default: 0.0.0.0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `POOL_SIZE` - Connection pool bound (default: 16)
    /// - `POOL_ACQUIRE_TIMEOUT_MS` - Pool wait in milliseconds (default: 5000)
    /// - `DB_BUSY_TIMEOUT_MS` - SQLite busy timeout in milliseconds (default: 5000)
    /// - `REQUEST_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            pool_size: parse_var::<usize>("POOL_SIZE")
                .unwrap_or(defaults.pool_size)
                .max(1),
            acquire_timeout: parse_var("POOL_ACQUIRE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.acquire_timeout),
            busy_timeout: parse_var("DB_BUSY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.busy_timeout),
            request_timeout: parse_var("REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }

    /// Returns the `host:port` string the server binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("cache.db"),
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            pool_size: 16,
            acquire_timeout: Duration::from_millis(5000),
            busy_timeout: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(30),
        }
    }
}
