//! Wallet connector.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT};

use super::adapter::{AdapterError, ReadyState, WalletAccount, WalletAdapter};
use super::error::WalletError;

/// Connect handshake policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Upper bound on a single handshake attempt.
    pub timeout: Duration,
    /// Attempts made while the wallet reports rate limiting.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub backoff_base: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl ConnectOptions {
    /// Default policy with the configured connect timeout.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            timeout: config.connect_timeout,
            ..Self::default()
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Selects a wallet adapter and drives its connect handshake.
pub struct WalletConnector {
    adapters: Vec<Arc<dyn WalletAdapter>>,
    selected: Option<usize>,
    account: Option<WalletAccount>,
    auto_connect_suppressed: bool,
    options: ConnectOptions,
}

impl std::fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConnector")
            .field("adapters", &self.adapter_names())
            .field("selected", &self.selected_name())
            .field("account", &self.account)
            .field("auto_connect_suppressed", &self.auto_connect_suppressed)
            .field("options", &self.options)
            .finish()
    }
}

impl WalletConnector {
    /// Create a connector with no adapters.
    #[must_use]
    pub const fn new(options: ConnectOptions) -> Self {
        Self {
            adapters: Vec::new(),
            selected: None,
            account: None,
            auto_connect_suppressed: false,
            options,
        }
    }

    /// Register an adapter. A later adapter with the same name replaces the
    /// earlier one.
    pub fn register(&mut self, adapter: Arc<dyn WalletAdapter>) {
        if let Some(existing) = self
            .adapters
            .iter_mut()
            .find(|a| a.name() == adapter.name())
        {
            *existing = adapter;
        } else {
            self.adapters.push(adapter);
        }
    }

    /// Names of the registered adapters, in registration order.
    #[must_use]
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Name of the selected adapter.
    #[must_use]
    pub fn selected_name(&self) -> Option<&str> {
        self.selected_adapter().map(|a| a.name())
    }

    /// Connected account, if any.
    #[must_use]
    pub const fn account(&self) -> Option<&WalletAccount> {
        self.account.as_ref()
    }

    /// Whether auto-connect is suppressed by an explicit disconnect.
    #[must_use]
    pub const fn auto_connect_suppressed(&self) -> bool {
        self.auto_connect_suppressed
    }

    /// Select the adapter registered as `name`.
    ///
    /// Switching adapters drops the current account.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::UnknownWallet`] if no adapter has that name.
    pub fn select(&mut self, name: &str) -> Result<(), WalletError> {
        let index = self
            .adapters
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| WalletError::UnknownWallet(name.to_owned()))?;

        if self.selected != Some(index) {
            self.account = None;
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Connect the selected wallet.
    ///
    /// Each attempt is bounded by the connect timeout. Rate-limited attempts
    /// are retried after the wallet's suggested delay, or an exponential
    /// backoff, up to `max_attempts`. A successful explicit connect lifts
    /// auto-connect suppression.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Timeout`] if an attempt exceeds the timeout,
    /// [`WalletError::Rejected`] if the user declined, and
    /// [`WalletError::RateLimited`] once retries are exhausted.
    #[instrument(skip(self), fields(wallet = ?self.selected_name()))]
    pub async fn connect(&mut self) -> Result<WalletAccount, WalletError> {
        let account = self.handshake().await?;
        self.auto_connect_suppressed = false;
        Ok(account)
    }

    /// Connect the selected wallet unless the user disconnected explicitly.
    ///
    /// Returns `Ok(None)` without prompting when suppressed, when nothing is
    /// selected, or when the wallet is not installed.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    #[instrument(skip(self), fields(wallet = ?self.selected_name()))]
    pub async fn auto_connect(&mut self) -> Result<Option<WalletAccount>, WalletError> {
        if self.auto_connect_suppressed {
            debug!("Auto-connect suppressed after explicit disconnect");
            return Ok(None);
        }
        if let Some(account) = &self.account {
            return Ok(Some(account.clone()));
        }
        match self.selected_adapter().map(|a| a.ready_state()) {
            Some(ReadyState::Installed) => self.handshake().await.map(Some),
            _ => Ok(None),
        }
    }

    /// Disconnect and suppress auto-connect.
    ///
    /// The local account is always dropped, even if the adapter fails.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Failed`] if the adapter reported an error.
    #[instrument(skip(self), fields(wallet = ?self.selected_name()))]
    pub async fn disconnect(&mut self) -> Result<(), WalletError> {
        self.auto_connect_suppressed = true;
        self.account = None;

        let Some(adapter) = self.selected_adapter().cloned() else {
            return Ok(());
        };
        adapter.disconnect().await.map_err(|e| {
            warn!(error = %e, "Wallet disconnect failed");
            WalletError::Failed(e.to_string())
        })
    }

    fn selected_adapter(&self) -> Option<&Arc<dyn WalletAdapter>> {
        self.selected.and_then(|i| self.adapters.get(i))
    }

    async fn handshake(&mut self) -> Result<WalletAccount, WalletError> {
        let adapter = self
            .selected_adapter()
            .cloned()
            .ok_or(WalletError::NoWalletSelected)?;

        if adapter.ready_state() == ReadyState::NotDetected {
            return Err(WalletError::NotDetected(adapter.name().to_owned()));
        }

        let mut attempt = 1;
        loop {
            let outcome = tokio::time::timeout(self.options.timeout, adapter.connect()).await;

            match outcome {
                Err(_elapsed) => {
                    warn!(timeout_ms = self.options.timeout.as_millis(), "Wallet connect timed out");
                    return Err(WalletError::Timeout);
                }
                Ok(Ok(account)) => {
                    info!(public_key = %account.public_key, "Wallet connected");
                    self.account = Some(account.clone());
                    return Ok(account);
                }
                Ok(Err(AdapterError::RateLimited { retry_after })) => {
                    if attempt >= self.options.max_attempts {
                        return Err(WalletError::RateLimited { attempts: attempt });
                    }
                    let delay = retry_after.unwrap_or_else(|| self.options.backoff(attempt));
                    warn!(attempt, delay_ms = delay.as_millis(), "Wallet rate limited, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Ok(Err(AdapterError::UserRejected)) => return Err(WalletError::Rejected),
                Ok(Err(AdapterError::NotReady)) => return Err(WalletError::NotReady),
                Ok(Err(AdapterError::Other(message))) => return Err(WalletError::Failed(message)),
            }
        }
    }
}

impl Default for WalletConnector {
    fn default() -> Self {
        Self::new(ConnectOptions::default())
    }
}
