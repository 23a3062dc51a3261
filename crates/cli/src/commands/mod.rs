//! CLI subcommands.
//!
//! # Environment Variables
//!
//! - `MISSION_API_URL` - Backend base URL
//! - `MISSION_SESSION_FILE` - Session file (default: `<config dir>/mission/session.json`)
//! - `MISSION_ADMIN_PASSWORD` - Password for `login`

pub mod auth;
pub mod countdown;
pub mod settings;

use std::sync::Arc;

use mission_client::api::{ApiClient, ApiError};
use mission_client::config::{ClientConfig, ConfigError};
use mission_client::session::{AdminSession, LoginError};
use mission_client::settings::WriteError;
use mission_client::storage::{FileTokenStore, StorageError};
use mission_core::{SettingKey, SettingKeyError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend request failed.
    #[error("Request failed: {0}")]
    Api(#[from] ApiError),

    /// Session file could not be used.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Login failed.
    #[error("Login failed: {0}")]
    Login(#[from] LoginError),

    /// Write or reset failed.
    #[error("Write failed: {0}")]
    Write(#[from] WriteError),

    /// Setting key is malformed.
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] SettingKeyError),

    /// Value argument is not JSON.
    #[error("Invalid JSON value: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Command needs an admin session.
    #[error("Not logged in. Run `mission login` first.")]
    NotAuthenticated,

    /// Argument could not be parsed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Shared state for a command invocation.
pub struct Context {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub session: AdminSession,
}

impl Context {
    /// Load configuration and open the persisted session.
    ///
    /// The session is not verified until a command calls `session.init()`.
    pub fn load(api_url: Option<&str>) -> Result<Self, CommandError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = api_url {
            config.api_url = ClientConfig::new(url)?.api_url;
        }

        let store = match &config.session_file {
            Some(path) => FileTokenStore::new(path),
            None => FileTokenStore::default_location()?,
        };
        tracing::debug!(path = %store.path().display(), "Using session file");

        let api = ApiClient::new(&config)?;
        let session = AdminSession::new(api.clone(), Arc::new(store), &config);

        Ok(Self {
            config,
            api,
            session,
        })
    }

    /// Verify the stored session and require an authenticated admin.
    pub async fn require_admin(&self) -> Result<(), CommandError> {
        if self.session.init().await.is_authenticated() {
            Ok(())
        } else {
            Err(CommandError::NotAuthenticated)
        }
    }
}

/// Parse a setting key argument.
pub fn parse_key(key: &str) -> Result<SettingKey, CommandError> {
    Ok(SettingKey::parse(key)?)
}

/// Print a JSON value to stdout.
#[allow(clippy::print_stdout)]
pub fn print_json(value: &serde_json::Value) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
