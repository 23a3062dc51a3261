//! Setting bindings against the in-process backend.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use mission_client::session::{AdminGate, AdminSession, Anonymous};
use mission_client::settings::{BindingOptions, SettingBinding, SettingSnapshot, WriteError};
use mission_client::storage::{MemoryTokenStore, StoredCredentials};
use mission_core::values::{CountdownTarget, ElementPosition};
use mission_core::{AdminRole, AdminToken, SettingKey};
use mission_integration_tests::TestBackend;
use serde_json::json;
use tokio::sync::watch;

const WAIT: Duration = Duration::from_secs(5);

fn key(name: &str) -> SettingKey {
    SettingKey::parse(name).expect("valid key")
}

/// Session already holding a token the backend accepts.
async fn admin_session(backend: &TestBackend) -> AdminSession {
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let token = backend.issue_token(&admin);
    let store = MemoryTokenStore::with_credentials(StoredCredentials {
        token: AdminToken::new(token),
        identity: Some(admin),
    });
    let session = AdminSession::new(backend.api(), Arc::new(store), &backend.config());
    session.init().await;
    assert!(session.is_authenticated());
    session
}

async fn wait_until<T, F>(rx: &mut watch::Receiver<SettingSnapshot<T>>, mut f: F)
where
    F: FnMut(&SettingSnapshot<T>) -> bool,
{
    tokio::time::timeout(WAIT, rx.wait_for(|snap| f(snap)))
        .await
        .expect("condition reached within timeout")
        .expect("binding alive");
}

#[tokio::test]
async fn test_absent_setting_keeps_default() {
    let backend = TestBackend::start().await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("countdown_target"),
        CountdownTarget::default(),
        BindingOptions::no_poll(),
    );

    let snap = binding.loaded().await;
    assert!(!snap.loading);
    assert_eq!(snap.value, CountdownTarget::default());
    assert!(snap.error.is_none());
}

#[tokio::test]
async fn test_stored_value_replaces_default() {
    let backend = TestBackend::start().await;
    backend.set_value("timer_position", json!({"x": 120.0, "y": 48.5}));

    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("timer_position"),
        ElementPosition::default(),
        BindingOptions::no_poll(),
    );

    let snap = binding.loaded().await;
    assert_eq!(snap.value, ElementPosition::new(120.0, 48.5));
}

#[tokio::test]
async fn test_unexpected_shape_falls_back_to_default() {
    let backend = TestBackend::start().await;
    backend.set_value("countdown_target", json!("not an object"));

    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("countdown_target"),
        CountdownTarget::default(),
        BindingOptions::no_poll(),
    );

    assert_eq!(binding.loaded().await.value, CountdownTarget::default());
}

#[tokio::test]
async fn test_write_without_admin_sends_nothing() {
    let backend = TestBackend::start().await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    binding.loaded().await;
    backend.clear_requests();

    assert_eq!(
        binding.write("Hello".to_string()).await,
        Err(WriteError::NotAuthenticated)
    );
    assert_eq!(binding.reset().await, Err(WriteError::NotAuthenticated));

    assert_eq!(backend.request_count(), 0);
    assert_eq!(binding.value(), "Welcome");
    assert!(binding.error().is_none());
}

#[tokio::test]
async fn test_admin_write_applies_and_persists() {
    let backend = TestBackend::start().await;
    let session = admin_session(&backend).await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(session.clone()),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    binding.loaded().await;
    backend.clear_requests();

    binding.write("Hello".to_string()).await.unwrap();

    assert_eq!(binding.value(), "Hello");
    assert_eq!(backend.value("hero_title"), Some(json!("Hello")));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::PUT);
    assert_eq!(
        requests[0].admin_token,
        session.admin_token().map(|t| t.expose().to_owned())
    );
}

#[tokio::test]
async fn test_reset_reverts_to_default() {
    let backend = TestBackend::start().await;
    backend.set_value("hero_title", json!("Custom"));
    let session = admin_session(&backend).await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(session),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    assert_eq!(binding.loaded().await.value, "Custom");

    binding.reset().await.unwrap();

    assert_eq!(binding.value(), "Welcome");
    assert!(backend.value("hero_title").is_none());
}

#[tokio::test]
async fn test_rejected_write_records_error_and_keeps_value() {
    let backend = TestBackend::start().await;
    let session = admin_session(&backend).await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(session),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    binding.loaded().await;
    backend.fail_writes_with(StatusCode::FORBIDDEN, "Editors cannot change this setting");

    let err = binding.write("Hello".to_string()).await.unwrap_err();

    assert_eq!(
        err,
        WriteError::Rejected("Editors cannot change this setting".to_string())
    );
    assert_eq!(binding.value(), "Welcome");
    assert_eq!(
        binding.error().as_deref(),
        Some("Editors cannot change this setting")
    );
}

#[tokio::test]
async fn test_write_errors_are_per_binding() {
    let backend = TestBackend::start().await;
    let session = admin_session(&backend).await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(session.clone()),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    binding.loaded().await;

    let other = SettingBinding::bind(
        backend.api(),
        Arc::new(session),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    other.loaded().await;

    backend.fail_writes_with(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    binding.write("Hello".to_string()).await.unwrap_err();
    assert!(binding.error().is_some());
    assert!(other.error().is_none());
}

#[tokio::test]
async fn test_gate_is_consulted_at_call_time() {
    let backend = TestBackend::start().await;
    let session = admin_session(&backend).await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(session.clone()),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    binding.loaded().await;

    binding.write("Hello".to_string()).await.unwrap();
    session.logout().await;
    backend.clear_requests();

    assert_eq!(
        binding.write("Again".to_string()).await,
        Err(WriteError::NotAuthenticated)
    );
    assert_eq!(backend.request_count(), 0);
    assert_eq!(binding.value(), "Hello");
}

#[tokio::test]
async fn test_poll_picks_up_external_change() {
    let backend = TestBackend::start().await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::from_config(&backend.config()),
    );
    binding.loaded().await;

    let mut rx = binding.subscribe();
    backend.set_value("hero_title", json!("Changed elsewhere"));

    wait_until(&mut rx, |snap| snap.value == "Changed elsewhere").await;
    assert!(!binding.loading());
}

#[tokio::test]
async fn test_polling_stops_when_binding_dropped() {
    let backend = TestBackend::start().await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::every(Duration::from_millis(20)),
    );
    binding.loaded().await;
    drop(binding);

    tokio::time::sleep(Duration::from_millis(50)).await;
    backend.clear_requests();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_refetch_outside_poll_cadence() {
    let backend = TestBackend::start().await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    binding.loaded().await;

    backend.set_value("hero_title", json!("Fresh"));
    binding.refetch().await;
    assert_eq!(binding.value(), "Fresh");
}

#[tokio::test]
async fn test_rebind_tracks_new_key() {
    let backend = TestBackend::start().await;
    backend.set_value("first", json!(1));
    backend.set_value("second", json!(2));

    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("first"),
        0_i64,
        BindingOptions::every(Duration::from_millis(20)),
    );
    assert_eq!(binding.loaded().await.value, 1);

    binding.rebind(key("second"));
    let snap = binding.snapshot();
    assert_eq!(snap.key.as_str(), "second");
    assert_eq!(snap.value, 0, "rebinding starts over from the default");

    let snap = binding.loaded().await;
    assert_eq!(snap.value, 2);

    // The old key is no longer tracked.
    backend.set_value("first", json!(100));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(binding.value(), 2);

    let polled_first = backend
        .requests()
        .iter()
        .rev()
        .take(3)
        .any(|r| r.path == "/api/settings/first");
    assert!(!polled_first);
}

#[tokio::test]
async fn test_two_clients_converge_through_polling() {
    let backend = TestBackend::start().await;
    let session = admin_session(&backend).await;
    let options = BindingOptions::from_config(&backend.config());

    let editor = SettingBinding::bind(
        backend.api(),
        Arc::new(session),
        key("hero_title"),
        "Welcome".to_string(),
        options,
    );
    let viewer = SettingBinding::bind(
        backend.api(),
        Arc::new(Anonymous),
        key("hero_title"),
        "Welcome".to_string(),
        options,
    );
    editor.loaded().await;
    viewer.loaded().await;

    editor.write("Launch day".to_string()).await.unwrap();

    let mut rx = viewer.subscribe();
    wait_until(&mut rx, |snap| snap.value == "Launch day").await;
}

#[tokio::test]
async fn test_write_and_reset_on_one_binding_run_in_order() {
    let backend = TestBackend::start().await;
    let session = admin_session(&backend).await;
    let binding = SettingBinding::bind(
        backend.api(),
        Arc::new(session),
        key("hero_title"),
        "Welcome".to_string(),
        BindingOptions::no_poll(),
    );
    binding.loaded().await;
    backend.clear_requests();

    let (written, reset) = tokio::join!(binding.write("Hello".to_string()), binding.reset());
    written.unwrap();
    reset.unwrap();

    let methods: Vec<Method> = backend.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::PUT, Method::DELETE]);
    assert_eq!(binding.value(), "Welcome");
    assert!(backend.value("hero_title").is_none());
}
