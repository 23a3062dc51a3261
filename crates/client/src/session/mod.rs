//! Admin session management.
//!
//! [`AdminSession`] owns the single source of truth for "is there an
//! authenticated admin right now" and the token that proves it.
//!
//! # States
//!
//! ```text
//!              init() with stored token
//! Unverified ─────────────────────────────▶ Verifying
//!     │                                       │   │
//!     │ init() without token         verify ok│   │verify failed
//!     ▼                                       ▼   ▼
//! Unauthenticated ◀── logout / re-check ── Authenticated
//!            ──────────── login ok ──────────▶
//! ```
//!
//! Every transition publishes one [`SessionState`] snapshot through a
//! `watch` channel, so token and identity always change together. Storage is
//! written or cleared while the state is locked for that same snapshot, so it
//! never disagrees with what observers see.

mod error;

pub use error::{LoginError, NETWORK_ERROR_MESSAGE};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mission_core::{AdminIdentity, AdminToken};
use secrecy::SecretString;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::storage::{StoredCredentials, TokenStore};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No verification attempted yet.
    Unverified,
    /// A stored token is being verified.
    Verifying,
    /// Verify or login succeeded.
    Authenticated,
    /// No token, or the last verification failed.
    Unauthenticated,
}

/// Observable session snapshot.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Token held in memory (present while verifying and authenticated).
    pub token: Option<AdminToken>,
    /// Admin profile.
    pub identity: Option<AdminIdentity>,
}

impl SessionState {
    const fn initial() -> Self {
        Self {
            status: SessionStatus::Unverified,
            token: None,
            identity: None,
        }
    }

    const fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            token: None,
            identity: None,
        }
    }

    /// Whether an admin is verified and holds a token.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, SessionStatus::Authenticated) && self.token.is_some()
    }
}

/// Source of the admin token used to gate setting writes.
///
/// Queried at call time, so a login or logout after a binding was created
/// applies to its next write.
pub trait AdminGate: Send + Sync {
    /// Token of the currently authenticated admin, if any.
    fn admin_token(&self) -> Option<AdminToken>;
}

/// Gate for readers that never write.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl AdminGate for Anonymous {
    fn admin_token(&self) -> Option<AdminToken> {
        None
    }
}

/// Admin session manager.
///
/// Cheap to clone; clones share state. Construct one per application (or per
/// test) and hand clones to whatever needs write access.
#[derive(Clone)]
pub struct AdminSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    last_error: Mutex<Option<String>>,
    verify_interval: Duration,
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("AdminSession")
            .field("status", &state.status)
            .field("identity", &state.identity)
            .field("verify_interval", &self.inner.verify_interval)
            .finish_non_exhaustive()
    }
}

impl AdminSession {
    /// Create a session in the `Unverified` state.
    ///
    /// Call [`init`](Self::init) to verify a stored token.
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>, config: &ClientConfig) -> Self {
        Self::with_verify_interval(api, store, config.verify_interval)
    }

    /// Create a session with an explicit re-check interval.
    #[must_use]
    pub fn with_verify_interval(
        api: ApiClient,
        store: Arc<dyn TokenStore>,
        verify_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            inner: Arc::new(SessionInner {
                api,
                store,
                state,
                last_error: Mutex::new(None),
                verify_interval,
            }),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Whether an admin is currently authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Current admin token, only while authenticated.
    #[must_use]
    pub fn token(&self) -> Option<AdminToken> {
        let state = self.inner.state.borrow();
        if state.is_authenticated() {
            state.token.clone()
        } else {
            None
        }
    }

    /// Current admin profile.
    #[must_use]
    pub fn identity(&self) -> Option<AdminIdentity> {
        self.inner.state.borrow().identity.clone()
    }

    /// Message of the last failed login.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Verify the stored token, if any.
    ///
    /// Without a stored token the session becomes `Unauthenticated` with no
    /// network call. A rejected token, an unreachable backend or a corrupt
    /// store all purge storage.
    #[instrument(skip(self))]
    pub async fn init(&self) -> SessionState {
        let stored = match self.inner.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Stored admin session unreadable, purging");
                None
            }
        };

        let Some(StoredCredentials { token, identity }) = stored.filter(|c| !c.token.is_empty())
        else {
            debug!("No stored admin token");
            self.purge();
            return self.state();
        };

        self.inner.state.send_replace(SessionState {
            status: SessionStatus::Verifying,
            token: Some(token.clone()),
            identity,
        });

        self.verify_or_purge(token).await;
        self.state()
    }

    /// Exchange credentials for a token.
    ///
    /// On success the token and identity are persisted and the session is
    /// `Authenticated`. On failure stored state is left untouched and the
    /// message is available from [`last_error`](Self::last_error).
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::InvalidCredentials`] if the backend refused the
    /// credentials, [`LoginError::Network`] if it could not be reached, and
    /// [`LoginError::Storage`] if the session could not be persisted.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AdminIdentity, LoginError> {
        let result = self.try_login(username, password).await;
        self.set_last_error(result.as_ref().err().map(ToString::to_string));
        result
    }

    async fn try_login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AdminIdentity, LoginError> {
        let (token, identity) = self.inner.api.login(username, password).await?;

        let credentials = StoredCredentials {
            token: token.clone(),
            identity: Some(identity.clone()),
        };
        let mut saved = Ok(());
        self.inner.state.send_if_modified(|state| {
            saved = self.inner.store.save(&credentials);
            if saved.is_err() {
                return false;
            }
            *state = SessionState {
                status: SessionStatus::Authenticated,
                token: Some(token),
                identity: Some(identity.clone()),
            };
            true
        });
        saved?;

        info!(admin = %identity.username, role = %identity.role, "Admin logged in");
        Ok(identity)
    }

    /// End the session.
    ///
    /// The backend is notified on a best-effort basis; the local session is
    /// always purged.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let token = self.inner.state.borrow().token.clone();
        if let Some(token) = token
            && let Err(e) = self.inner.api.logout(&token).await
        {
            debug!(error = %e, "Backend logout failed, continuing locally");
        }

        self.purge();
        info!("Admin logged out");
    }

    /// Run one background re-check.
    ///
    /// Does nothing unless authenticated. A failed verification purges the
    /// session.
    #[instrument(skip(self))]
    pub async fn reverify_now(&self) -> SessionState {
        let token = self.token();
        if let Some(token) = token {
            self.verify_or_purge(token).await;
        }
        self.state()
    }

    /// Start re-checking the token every `verify_interval`.
    ///
    /// The first check runs one interval from now. The task stops when the
    /// returned handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use = "dropping the handle stops the re-check task"]
    pub fn spawn_reverify(&self) -> ReverifyHandle {
        let session = self.clone();
        let period = self.inner.verify_interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                session.reverify_now().await;
            }
        });

        ReverifyHandle { task }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn verify_or_purge(&self, token: AdminToken) {
        match self.inner.api.verify(&token).await {
            Ok(identity) => {
                // A logout or login that landed while verify was in flight
                // wins over this result.
                let accepted = self.inner.state.send_if_modified(|state| {
                    if state.token.as_ref() != Some(&token) {
                        return false;
                    }
                    let credentials = StoredCredentials {
                        token: token.clone(),
                        identity: Some(identity.clone()),
                    };
                    if let Err(e) = self.inner.store.save(&credentials) {
                        warn!(error = %e, "Failed to refresh stored admin identity");
                    }
                    state.status = SessionStatus::Authenticated;
                    state.identity = Some(identity);
                    true
                });
                if accepted {
                    debug!("Admin token verified");
                } else {
                    debug!("Session changed during verification, discarding result");
                }
            }
            Err(e) => {
                warn!(error = %e, network = e.is_network(), "Admin token rejected, purging session");
                self.purge_if_current(&token);
            }
        }
    }

    fn purge_if_current(&self, token: &AdminToken) {
        self.inner.state.send_if_modified(|state| {
            if state.token.as_ref() != Some(token) {
                return false;
            }
            self.clear_store();
            *state = SessionState::unauthenticated();
            true
        });
    }

    fn purge(&self) {
        self.inner.state.send_modify(|state| {
            self.clear_store();
            *state = SessionState::unauthenticated();
        });
    }

    fn clear_store(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored admin session");
        }
    }

    fn set_last_error(&self, message: Option<String>) {
        *self
            .inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = message;
    }
}

impl AdminGate for AdminSession {
    fn admin_token(&self) -> Option<AdminToken> {
        self.token()
    }
}

/// Handle to the background re-check task.
///
/// Aborts the task when dropped.
#[derive(Debug)]
pub struct ReverifyHandle {
    task: JoinHandle<()>,
}

impl ReverifyHandle {
    /// Stop re-checking.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ReverifyHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
