//! # Client Configuration
//!
//! - `OFFICEHOURS_API_URL`: base URL of the API (default: "http://localhost:3000")
//! - `OFFICEHOURS_WS_URL`: realtime endpoint (default: derived from the API URL)
//! - `OFFICEHOURS_USER_ID`: the user this client acts as (required)
//! - `OFFICEHOURS_ROLE`: `student` or `instructor` (default: "student")
//! - `OFFICEHOURS_DEBOUNCE_MS`: refresh debounce (default: 150)
//! - `OFFICEHOURS_RECONNECT_MS`: delay between reconnect attempts (default: 2000)

use eyre::{eyre, Result, WrapErr};
use officehours_core::models::actor::{Actor, Role};
use std::env;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub ws_url: String,
    pub user_id: Uuid,
    pub role: Role,
    pub debounce: Duration,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("OFFICEHOURS_API_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let ws_url = match lookup("OFFICEHOURS_WS_URL") {
            Some(url) => url,
            None => derive_ws_url(&api_url)?,
        };

        let user_id = lookup("OFFICEHOURS_USER_ID")
            .ok_or_else(|| eyre!("OFFICEHOURS_USER_ID environment variable not set"))?;
        let user_id = Uuid::parse_str(user_id.trim())
            .wrap_err("OFFICEHOURS_USER_ID must be a valid UUID")?;

        let role = match lookup("OFFICEHOURS_ROLE") {
            Some(role) => role.parse::<Role>().map_err(|e| eyre!(e))?,
            None => Role::Student,
        };

        let millis = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(default))
        };

        Ok(Self {
            api_url,
            ws_url,
            user_id,
            role,
            debounce: millis("OFFICEHOURS_DEBOUNCE_MS", 150),
            reconnect_delay: millis("OFFICEHOURS_RECONNECT_MS", 2000),
        })
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

fn derive_ws_url(api_url: &str) -> Result<String> {
    let rest = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        return Err(eyre!("OFFICEHOURS_API_URL must start with http:// or https://"));
    };
    Ok(format!("{}/ws", rest))
}
