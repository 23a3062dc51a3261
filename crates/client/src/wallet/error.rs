//! Wallet connection errors.

use thiserror::Error;

/// Errors that can occur while selecting or connecting a wallet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// The handshake did not finish within the connect timeout.
    #[error("Connection timed out. Please try again.")]
    Timeout,

    /// The user declined the connection prompt.
    #[error("Connection request was rejected")]
    Rejected,

    /// The wallet kept throttling after every retry.
    #[error("Wallet is rate limiting requests, please wait a moment and try again")]
    RateLimited {
        /// Number of attempts made.
        attempts: u32,
    },

    /// No wallet was selected.
    #[error("No wallet selected")]
    NoWalletSelected,

    /// No adapter is registered under the given name.
    #[error("Unknown wallet: {0}")]
    UnknownWallet(String),

    /// The selected wallet is not installed.
    #[error("{0} wallet not detected")]
    NotDetected(String),

    /// The wallet is not ready.
    #[error("Wallet not ready")]
    NotReady,

    /// Any other adapter failure.
    #[error("Wallet connection failed: {0}")]
    Failed(String),
}

impl WalletError {
    /// Whether the error came from the connect timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
