//! A single setting key bound to local state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mission_core::{AdminToken, SettingKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, instrument, warn};

use crate::api::ApiClient;
use crate::config::{ClientConfig, DEFAULT_POLL_INTERVAL};
use crate::session::AdminGate;

use super::error::WriteError;

/// Smallest poll interval a binding will run with.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Values that can be bound to a setting key.
pub trait SettingValue:
    Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static
{
}

impl<T> SettingValue for T where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static
{
}

/// Polling configuration of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingOptions {
    /// Whether to re-fetch on a fixed timer after the mount fetch.
    pub poll: bool,
    /// Time between polls.
    pub poll_interval: Duration,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            poll: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl BindingOptions {
    /// Poll at the interval configured for the client.
    #[must_use]
    pub const fn from_config(config: &ClientConfig) -> Self {
        Self {
            poll: true,
            poll_interval: config.poll_interval,
        }
    }

    /// Fetch once on bind and never poll.
    #[must_use]
    pub const fn no_poll() -> Self {
        Self {
            poll: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Poll every `interval`.
    #[must_use]
    pub const fn every(interval: Duration) -> Self {
        Self {
            poll: true,
            poll_interval: interval,
        }
    }
}

/// Observable state of a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingSnapshot<T> {
    /// Key the binding currently tracks.
    pub key: SettingKey,
    /// Current value: the default until a stored value is fetched.
    pub value: T,
    /// True until the first fetch for `key` settles, successful or not.
    pub loading: bool,
    /// Message of the last failed write or reset.
    pub error: Option<String>,
}

impl<T> SettingSnapshot<T> {
    const fn initial(key: SettingKey, value: T) -> Self {
        Self {
            key,
            value,
            loading: true,
            error: None,
        }
    }
}

/// One setting key bound to local state.
///
/// Binding issues the mount fetch immediately and, if polling is enabled,
/// re-fetches on a fixed timer. The background task stops when the binding
/// is dropped or rebound to another key.
pub struct SettingBinding<T: SettingValue> {
    inner: Arc<BindingInner<T>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

struct BindingInner<T> {
    api: ApiClient,
    gate: Arc<dyn AdminGate>,
    default: T,
    options: BindingOptions,
    /// Bumped on every rebind; results tagged with an older value are dropped.
    generation: AtomicU64,
    state: watch::Sender<SettingSnapshot<T>>,
    /// Serializes write and reset on this binding.
    write_lock: tokio::sync::Mutex<()>,
}

impl<T: SettingValue + std::fmt::Debug> std::fmt::Debug for SettingBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingBinding")
            .field("state", &*self.inner.state.borrow())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl<T: SettingValue> SettingBinding<T> {
    /// Bind `key`, starting from `default`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn bind(
        api: ApiClient,
        gate: Arc<dyn AdminGate>,
        key: SettingKey,
        default: T,
        options: BindingOptions,
    ) -> Self {
        let (state, _) = watch::channel(SettingSnapshot::initial(key, default.clone()));
        let inner = Arc::new(BindingInner {
            api,
            gate,
            default,
            options,
            generation: AtomicU64::new(0),
            state,
            write_lock: tokio::sync::Mutex::new(()),
        });

        let driver = BindingInner::spawn_driver(Arc::clone(&inner));
        Self {
            inner,
            driver: Mutex::new(Some(driver)),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Key the binding currently tracks.
    #[must_use]
    pub fn key(&self) -> SettingKey {
        self.inner.state.borrow().key.clone()
    }

    /// Value used while the store reports absence.
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.inner.default
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SettingSnapshot<T> {
        self.inner.state.borrow().clone()
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.inner.state.borrow().value.clone()
    }

    /// Whether the first fetch is still outstanding.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Message of the last failed write or reset.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    /// Subscribe to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SettingSnapshot<T>> {
        self.inner.state.subscribe()
    }

    /// Wait for the first fetch to settle and return the snapshot.
    pub async fn loaded(&self) -> SettingSnapshot<T> {
        let mut rx = self.inner.state.subscribe();
        let settled = rx.wait_for(|snap| !snap.loading).await.map(|snap| snap.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the current key now, outside the poll cadence.
    pub async fn refetch(&self) {
        self.inner.fetch().await;
    }

    /// Store `value` and apply it locally once the backend accepts it.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::NotAuthenticated`] without sending a request if
    /// no admin is authenticated. Returns [`WriteError::Rejected`] or
    /// [`WriteError::Network`] if the backend refused or could not be
    /// reached; the local value is left unchanged and the message recorded.
    #[instrument(skip(self, value), fields(key = %self.key()))]
    pub async fn write(&self, value: T) -> Result<(), WriteError> {
        let token = self.admin_token()?;
        let _guard = self.inner.write_lock.lock().await;
        let (key, generation) = self.inner.current();

        let json = match serde_json::to_value(&value) {
            Ok(json) => json,
            Err(e) => {
                return Err(self
                    .inner
                    .record_error(generation, WriteError::Encode(e.to_string())));
            }
        };

        match self.inner.api.put_setting(&token, &key, &json).await {
            Ok(()) => {
                self.inner.apply(generation, value);
                Ok(())
            }
            Err(e) => {
                let err = WriteError::from(e);
                warn!(error = %err, "Setting write failed");
                Err(self.inner.record_error(generation, err))
            }
        }
    }

    /// Delete the stored value and revert to the default.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    #[instrument(skip(self), fields(key = %self.key()))]
    pub async fn reset(&self) -> Result<(), WriteError> {
        let token = self.admin_token()?;
        let _guard = self.inner.write_lock.lock().await;
        let (key, generation) = self.inner.current();

        match self.inner.api.delete_setting(&token, &key).await {
            Ok(()) => {
                self.inner.apply(generation, self.inner.default.clone());
                Ok(())
            }
            Err(e) => {
                let err = WriteError::from(e);
                warn!(error = %err, "Setting reset failed");
                Err(self.inner.record_error(generation, err))
            }
        }
    }

    /// Track a different key.
    ///
    /// Stops the previous fetch and poll timer, resets the snapshot to the
    /// default in the loading state, and starts a fresh fetch cycle. Results
    /// still in flight for the previous key are discarded. Rebinding to the
    /// current key does nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn rebind(&self, key: SettingKey) {
        if self.inner.state.borrow().key == key {
            return;
        }

        let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = driver.take() {
            task.abort();
        }

        debug!(key = %key, "Rebinding setting");
        self.inner.state.send_modify(|snap| {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            *snap = SettingSnapshot::initial(key, self.inner.default.clone());
        });

        *driver = Some(BindingInner::spawn_driver(Arc::clone(&self.inner)));
    }

    fn admin_token(&self) -> Result<AdminToken, WriteError> {
        self.inner.gate.admin_token().ok_or_else(|| {
            debug!("Setting change refused, no admin session");
            WriteError::NotAuthenticated
        })
    }
}

impl<T: SettingValue> Drop for SettingBinding<T> {
    fn drop(&mut self) {
        if let Some(task) = self
            .driver
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl<T: SettingValue> BindingInner<T> {
    fn spawn_driver(inner: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            inner.fetch().await;
            if !inner.options.poll {
                return;
            }

            let period = inner.options.poll_interval.max(MIN_POLL_INTERVAL);
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inner.fetch().await;
            }
        })
    }

    /// Key and generation, read together under the state lock.
    fn current(&self) -> (SettingKey, u64) {
        let snap = self.state.borrow();
        (snap.key.clone(), self.generation.load(Ordering::SeqCst))
    }

    async fn fetch(&self) {
        let (key, generation) = self.current();

        let fetched = match self.api.get_setting(&key).await {
            Ok(Some(raw)) => match serde_json::from_value::<T>(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(key = %key, error = %e, "Stored setting has unexpected shape, ignoring");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %key, "Setting not configured");
                None
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Setting fetch failed, keeping current value");
                None
            }
        };

        self.state.send_if_modified(|snap| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            let mut changed = std::mem::replace(&mut snap.loading, false);
            if let Some(value) = fetched
                && snap.value != value
            {
                snap.value = value;
                changed = true;
            }
            changed
        });
    }

    fn apply(&self, generation: u64, value: T) {
        self.state.send_if_modified(|snap| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            snap.value = value;
            snap.error = None;
            true
        });
    }

    fn record_error(&self, generation: u64, err: WriteError) -> WriteError {
        let message = err.to_string();
        self.state.send_if_modified(|snap| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            snap.error = Some(message);
            true
        });
        err
    }
}
