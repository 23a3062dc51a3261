//! Integration tests for Mission.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mission-integration-tests
//! ```
//!
//! No external services are needed: [`TestBackend`] serves the settings
//! backend API from an in-process axum server on an ephemeral port and
//! records every request it receives.
//!
//! # Test Categories
//!
//! - `api_client` - HTTP surface and header transport
//! - `admin_session` - login, verification, purge and re-check
//! - `settings_sync` - bindings, polling, gated writes, rebinding
//! - `end_to_end` - countdown scenario across two clients

#![allow(clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mission_client::api::ApiClient;
use mission_client::config::ClientConfig;
use mission_core::{
    ADMIN_TOKEN_HEADER, AdminIdentity, AdminRole, LoginRequest, WriteSettingBody,
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// A request as seen by the fake backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path, including the `/api` prefix.
    pub path: String,
    /// Value of the `X-Admin-Token` header, if sent.
    pub admin_token: Option<String>,
}

#[derive(Default)]
struct BackendState {
    settings: Mutex<BTreeMap<String, Value>>,
    admins: Mutex<HashMap<String, (String, AdminIdentity)>>,
    tokens: Mutex<HashMap<String, AdminIdentity>>,
    requests: Mutex<Vec<RecordedRequest>>,
    write_failure: Mutex<Option<(StatusCode, String)>>,
    verify_delay: Mutex<Duration>,
    next_token: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process settings backend.
///
/// Stops serving when dropped.
pub struct TestBackend {
    base_url: Url,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl TestBackend {
    /// Start a backend with no settings and no admins.
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());

        let api = Router::new()
            .route("/settings/{key}", get(get_setting))
            .route(
                "/admin/settings/{key}",
                axum::routing::put(put_setting).delete(delete_setting),
            )
            .route("/admin/all-settings", get(all_settings))
            .route("/admin/auth/login", post(login))
            .route("/admin/auth/logout", post(logout))
            .route("/admin/auth/verify", get(verify));

        let app = Router::new()
            .nest("/api", api)
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend serves");
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}/api")).expect("valid url"),
            state,
            server,
        }
    }

    /// Base URL to point clients at.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client configuration for this backend with a fast poll interval.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url.as_str()).expect("valid config");
        config.poll_interval = Duration::from_millis(50);
        config.verify_interval = Duration::from_millis(50);
        config
    }

    /// API client for this backend.
    #[must_use]
    pub fn api(&self) -> ApiClient {
        ApiClient::with_base_url(self.base_url.clone()).expect("client builds")
    }

    /// Register an admin account.
    pub fn add_admin(&self, username: &str, password: &str, role: AdminRole) -> AdminIdentity {
        let mut admins = lock(&self.state.admins);
        let identity = AdminIdentity {
            id: (admins.len() + 1).to_string(),
            username: username.to_owned(),
            role,
        };
        admins.insert(username.to_owned(), (password.to_owned(), identity.clone()));
        identity
    }

    /// Issue a token directly, bypassing login.
    pub fn issue_token(&self, identity: &AdminIdentity) -> String {
        let token = format!(
            "tok-{}",
            self.state.next_token.fetch_add(1, Ordering::SeqCst) + 1
        );
        lock(&self.state.tokens).insert(token.clone(), identity.clone());
        token
    }

    /// Invalidate every issued token (simulates server-side expiry).
    pub fn revoke_all_tokens(&self) {
        lock(&self.state.tokens).clear();
    }

    /// Whether `token` is currently accepted.
    #[must_use]
    pub fn token_is_valid(&self, token: &str) -> bool {
        lock(&self.state.tokens).contains_key(token)
    }

    /// Change a setting out of band, as another admin would.
    pub fn set_value(&self, key: &str, value: Value) {
        lock(&self.state.settings).insert(key.to_owned(), value);
    }

    /// Stored value of a setting.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        lock(&self.state.settings).get(key).cloned()
    }

    /// Make every subsequent write and delete fail.
    pub fn fail_writes_with(&self, status: StatusCode, message: &str) {
        *lock(&self.state.write_failure) = Some((status, message.to_owned()));
    }

    /// Hold every verify response for `delay` after the token is checked.
    pub fn delay_verify(&self, delay: Duration) {
        *lock(&self.state.verify_delay) = delay;
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.state.requests).len()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        lock(&self.state.requests).clear();
    }
}

// =============================================================================
// Handlers
// =============================================================================

type Shared = State<Arc<BackendState>>;

async fn record(State(state): Shared, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().clone(),
        path: request.uri().path().to_owned(),
        admin_token: request
            .headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };
    lock(&state.requests).push(recorded);
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<AdminIdentity, Response> {
    let token = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Admin token required"))?;

    lock(&state.tokens)
        .get(token)
        .cloned()
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
}

fn injected_failure(state: &BackendState) -> Option<Response> {
    lock(&state.write_failure)
        .as_ref()
        .map(|(status, message)| error(*status, message))
}

async fn get_setting(State(state): Shared, Path(key): Path<String>) -> Response {
    let value = lock(&state.settings).get(&key).cloned();
    Json(json!({ "success": true, "value": value })).into_response()
}

async fn put_setting(
    State(state): Shared,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(body): Json<WriteSettingBody>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    if let Some(failure) = injected_failure(&state) {
        return failure;
    }
    lock(&state.settings).insert(key, body.value);
    Json(json!({ "success": true })).into_response()
}

async fn delete_setting(
    State(state): Shared,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    if let Some(failure) = injected_failure(&state) {
        return failure;
    }
    lock(&state.settings).remove(&key);
    Json(json!({ "success": true })).into_response()
}

async fn all_settings(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let settings = lock(&state.settings).clone();
    Json(json!({ "success": true, "settings": settings })).into_response()
}

async fn login(State(state): Shared, Json(body): Json<LoginRequest>) -> Response {
    let identity = lock(&state.admins)
        .get(&body.username)
        .filter(|(password, _)| *password == body.password)
        .map(|(_, identity)| identity.clone());

    let Some(identity) = identity else {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };

    let token = format!("tok-{}", state.next_token.fetch_add(1, Ordering::SeqCst) + 1);
    lock(&state.tokens).insert(token.clone(), identity.clone());
    Json(json!({ "success": true, "token": token, "admin": identity })).into_response()
}

async fn logout(State(state): Shared, headers: HeaderMap) -> Response {
    if let Some(token) = headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        lock(&state.tokens).remove(token);
    }
    Json(json!({ "success": true })).into_response()
}

async fn verify(State(state): Shared, headers: HeaderMap) -> Response {
    let verdict = authorize(&state, &headers);
    let delay = *lock(&state.verify_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    match verdict {
        Ok(identity) => Json(json!({ "success": true, "admin": identity })).into_response(),
        Err(rejection) => rejection,
    }
}
