//! Wallet adapter seam.

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

/// Whether a wallet can be used on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Installed and ready to connect.
    Installed,
    /// Can be loaded on demand (e.g. a hosted wallet).
    Loadable,
    /// Not present.
    NotDetected,
}

/// Account exposed by a connected wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletAccount {
    /// Base58 public key.
    pub public_key: String,
}

/// Failures reported by an adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The user declined the connection prompt.
    #[error("user rejected the request")]
    UserRejected,

    /// The wallet is throttling connection attempts.
    #[error("rate limited")]
    RateLimited {
        /// Delay suggested by the wallet, if any.
        retry_after: Option<Duration>,
    },

    /// The wallet is not ready to connect.
    #[error("wallet not ready")]
    NotReady,

    /// Any other adapter failure.
    #[error("{0}")]
    Other(String),
}

/// A concrete wallet integration.
pub trait WalletAdapter: Send + Sync {
    /// Display name, also used for selection.
    fn name(&self) -> &str;

    /// Availability on this device.
    fn ready_state(&self) -> ReadyState;

    /// Run the connect handshake.
    fn connect(&self) -> BoxFuture<'_, Result<WalletAccount, AdapterError>>;

    /// Disconnect the wallet.
    fn disconnect(&self) -> BoxFuture<'_, Result<(), AdapterError>>;
}
