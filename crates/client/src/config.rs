//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MISSION_API_URL` - Backend base URL (default: `http://localhost:3001/api`)
//! - `MISSION_POLL_INTERVAL_MS` - Settings poll interval (default: 10000)
//! - `MISSION_VERIFY_INTERVAL_SECS` - Admin token re-check interval (default: 300)
//! - `MISSION_CONNECT_TIMEOUT_MS` - Wallet connect handshake timeout (default: 30000)
//! - `MISSION_SESSION_FILE` - Path of the persisted admin session file

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";
/// Default settings poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10_000);
/// Default admin token re-verification interval.
pub const DEFAULT_VERIFY_INTERVAL: Duration = Duration::from_secs(300);
/// Default wallet connect handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but its value cannot be used; carries the name and reason.
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Mission client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL; endpoint paths are appended to it
    pub api_url: Url,
    /// Interval between settings polls
    pub poll_interval: Duration,
    /// Interval between background admin token re-checks
    pub verify_interval: Duration,
    /// Upper bound on the wallet connect handshake
    pub connect_timeout: Duration,
    /// Location of the persisted admin session (file token store)
    pub session_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a configuration for `api_url` with default intervals.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is not an absolute http(s) URL.
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url("MISSION_API_URL", api_url)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
            verify_interval: DEFAULT_VERIFY_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            session_file: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one is present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("MISSION_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());

        let poll_interval = lookup("MISSION_POLL_INTERVAL_MS")
            .map(|v| parse_positive("MISSION_POLL_INTERVAL_MS", &v).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let verify_interval = lookup("MISSION_VERIFY_INTERVAL_SECS")
            .map(|v| parse_positive("MISSION_VERIFY_INTERVAL_SECS", &v).map(Duration::from_secs))
            .transpose()?
            .unwrap_or(DEFAULT_VERIFY_INTERVAL);

        let connect_timeout = lookup("MISSION_CONNECT_TIMEOUT_MS")
            .map(|v| parse_positive("MISSION_CONNECT_TIMEOUT_MS", &v).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT);

        let session_file = lookup("MISSION_SESSION_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_url: parse_api_url("MISSION_API_URL", &api_url)?,
            poll_interval,
            verify_interval,
            connect_timeout,
            session_file,
        })
    }
}

fn parse_api_url(name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(name.to_owned(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            name.to_owned(),
            format!("unsupported scheme: {}", url.scheme()),
        ));
    }

    Ok(url)
}

fn parse_positive(name: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            name.to_owned(),
            "must be greater than zero".to_owned(),
        )),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidEnvVar(name.to_owned(), e.to_string())),
    }
}
