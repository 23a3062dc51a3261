//! Mission client library.
//!
//! Binds backend-persisted settings to local reactive state and manages the
//! admin session that gates writes.
//!
//! # Components
//!
//! - [`api::ApiClient`] - HTTP access to the settings backend
//! - [`session::AdminSession`] - admin login, verification and periodic re-checks
//! - [`settings::SettingBinding`] - one key bound to local state, with polling
//!   and admin-gated writes
//! - [`storage`] - persisted admin credentials
//! - [`wallet::WalletConnector`] - wallet selection and the timed connect handshake
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mission_client::{
//!     api::ApiClient, config::ClientConfig, session::AdminSession,
//!     settings::{BindingOptions, SettingBinding}, storage::MemoryTokenStore,
//! };
//! use mission_core::{SettingKey, values::CountdownTarget};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let api = ApiClient::new(&config)?;
//! let session = AdminSession::new(api.clone(), Arc::new(MemoryTokenStore::new()), &config);
//! session.init().await;
//!
//! let countdown = SettingBinding::bind(
//!     api,
//!     Arc::new(session.clone()),
//!     SettingKey::parse("countdown_target")?,
//!     CountdownTarget::default(),
//!     BindingOptions::from_config(&config),
//! );
//! let snapshot = countdown.loaded().await;
//! println!("{}", snapshot.value.label);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod session;
pub mod settings;
pub mod storage;
pub mod wallet;
