//! # API Configuration Module
//!
//! Loads configuration for the office-hours API server from environment
//! variables, with defaults where appropriate.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (optional, in-memory store when unset)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `QUEUE_WAIT_WINDOW_DAYS`: Rolling window for the average wait statistic (default: all-time)
//! - `PRESENCE_OFFLINE_AFTER_SECONDS`: Inactivity before a user is swept offline (default: 300)
//! - `PRESENCE_SWEEP_INTERVAL_SECONDS`: How often the sweep runs (default: 120)
//! - `BROADCAST_CAPACITY`: Buffered events per realtime subscriber (default: 1024)

use eyre::{eyre, Result, WrapErr};
use std::env;
use std::time::Duration;
use tracing::Level;

/// Longest accepted `QUEUE_WAIT_WINDOW_DAYS`, one century.
pub const MAX_WAIT_WINDOW_DAYS: i64 = 36_500;
/// Longest accepted `PRESENCE_OFFLINE_AFTER_SECONDS`, thirty days.
pub const MAX_OFFLINE_AFTER_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Configuration for the office-hours API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use officehours_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}:{}", config.host, config.port);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: Option<String>,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Average wait is computed over entries joined within this many days
    pub queue_wait_window_days: Option<i64>,

    pub presence_offline_after: u64,

    pub presence_sweep_interval: u64,

    pub broadcast_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            log_level: Level::INFO,
            cors_origins: None,
            request_timeout: 30,
            queue_wait_window_days: None,
            presence_offline_after: 300,
            presence_sweep_interval: 120,
            broadcast_capacity: 1024,
        }
    }
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `API_PORT`, `QUEUE_WAIT_WINDOW_DAYS` or
    /// `PRESENCE_OFFLINE_AFTER_SECONDS` is set but cannot be parsed, or if a
    /// window exceeds its maximum.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // Network settings
        let host = lookup("API_HOST").unwrap_or(defaults.host);
        let port = match lookup("API_PORT") {
            Some(port) => port.parse().wrap_err("Invalid API_PORT value")?,
            None => defaults.port,
        };

        // Database settings
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        // Logging settings
        let log_level = match lookup("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = lookup("API_CORS_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Performance settings
        let request_timeout = lookup("API_REQUEST_TIMEOUT_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout);

        // Queue and presence settings
        let queue_wait_window_days = match lookup("QUEUE_WAIT_WINDOW_DAYS") {
            Some(days) => {
                let days = days
                    .parse::<i64>()
                    .wrap_err("Invalid QUEUE_WAIT_WINDOW_DAYS value")?;
                if days > MAX_WAIT_WINDOW_DAYS {
                    return Err(eyre!(
                        "QUEUE_WAIT_WINDOW_DAYS must be at most {}",
                        MAX_WAIT_WINDOW_DAYS
                    ));
                }
                Some(days).filter(|days| *days > 0)
            }
            None => None,
        };
        let presence_offline_after = match lookup("PRESENCE_OFFLINE_AFTER_SECONDS") {
            Some(secs) => {
                let secs = secs
                    .parse::<u64>()
                    .wrap_err("Invalid PRESENCE_OFFLINE_AFTER_SECONDS value")?;
                if secs == 0 || secs > MAX_OFFLINE_AFTER_SECONDS {
                    return Err(eyre!(
                        "PRESENCE_OFFLINE_AFTER_SECONDS must be between 1 and {}",
                        MAX_OFFLINE_AFTER_SECONDS
                    ));
                }
                secs
            }
            None => defaults.presence_offline_after,
        };
        let presence_sweep_interval = lookup("PRESENCE_SWEEP_INTERVAL_SECONDS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.presence_sweep_interval);
        let broadcast_capacity = lookup("BROADCAST_CAPACITY")
            .and_then(|v| v.parse().ok())
            .filter(|cap| *cap > 0)
            .unwrap_or(defaults.broadcast_capacity);

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            request_timeout,
            queue_wait_window_days,
            presence_offline_after,
            presence_sweep_interval,
            broadcast_capacity,
        })
    }

    /// Returns the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn wait_window(&self) -> Option<chrono::Duration> {
        self.queue_wait_window_days
            .map(|days| chrono::Duration::days(days.clamp(1, MAX_WAIT_WINDOW_DAYS)))
    }

    pub fn offline_after(&self) -> chrono::Duration {
        let secs = self.presence_offline_after.min(MAX_OFFLINE_AFTER_SECONDS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.presence_sweep_interval)
    }
}
