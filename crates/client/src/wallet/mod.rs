//! Wallet selection and the timed connect handshake.
//!
//! This module provides:
//! - [`WalletAdapter`], the seam to a concrete wallet integration
//! - [`WalletConnector`] for adapter selection, connecting with a timeout,
//!   rate-limit backoff and auto-connect suppression
//! - [`WalletError`] with distinct messages for timeout, rejection and
//!   rate limiting
//!
//! # Flow
//!
//! 1. Adapters are registered and one is selected by name
//! 2. `connect` races the adapter handshake against the connect timeout
//! 3. A rate-limited handshake is retried with exponential backoff
//! 4. An explicit `disconnect` suppresses `auto_connect` until the next
//!    explicit `connect`

mod adapter;
mod connector;
mod error;

pub use adapter::{AdapterError, ReadyState, WalletAccount, WalletAdapter};
pub use connector::{ConnectOptions, WalletConnector};
pub use error::WalletError;
