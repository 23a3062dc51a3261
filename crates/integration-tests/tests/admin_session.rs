//! Admin session lifecycle against the in-process backend.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use mission_client::session::{AdminGate, AdminSession, LoginError, SessionStatus};
use mission_client::storage::{FileTokenStore, MemoryTokenStore, StoredCredentials, TokenStore};
use mission_core::{AdminIdentity, AdminRole, AdminToken};
use mission_integration_tests::TestBackend;
use secrecy::SecretString;

fn session(backend: &TestBackend, store: Arc<dyn TokenStore>) -> AdminSession {
    AdminSession::new(backend.api(), store, &backend.config())
}

fn credentials(token: &str, identity: &AdminIdentity) -> StoredCredentials {
    StoredCredentials {
        token: AdminToken::new(token),
        identity: Some(identity.clone()),
    }
}

#[tokio::test]
async fn test_init_without_stored_token_makes_no_request() {
    let backend = TestBackend::start().await;
    let session = session(&backend, Arc::new(MemoryTokenStore::new()));

    let state = session.init().await;
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_init_with_valid_token_restores_session() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let token = backend.issue_token(&admin);
    let store = Arc::new(MemoryTokenStore::with_credentials(credentials(&token, &admin)));
    let session = session(&backend, store.clone());

    let state = session.init().await;
    assert_eq!(state.status, SessionStatus::Authenticated);
    assert_eq!(state.identity, Some(admin));
    assert_eq!(session.admin_token(), Some(AdminToken::new(token.clone())));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/admin/auth/verify");
    assert_eq!(requests[0].admin_token.as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn test_init_with_invalid_token_purges_storage() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let store = Arc::new(MemoryTokenStore::with_credentials(credentials("expired", &admin)));
    let session = session(&backend, store.clone());

    let state = session.init().await;
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert!(state.token.is_none());
    assert!(state.identity.is_none());
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn test_init_refreshes_stored_identity() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let token = backend.issue_token(&admin);
    let stored = StoredCredentials {
        token: AdminToken::new(token),
        identity: None,
    };
    let store = Arc::new(MemoryTokenStore::with_credentials(stored));
    let session = session(&backend, store.clone());

    session.init().await;
    assert_eq!(store.snapshot().and_then(|c| c.identity), Some(admin));
}

#[tokio::test]
async fn test_login_persists_token_and_identity() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("editor1", "pw", AdminRole::Editor);
    let store = Arc::new(MemoryTokenStore::new());
    let session = session(&backend, store.clone());
    session.init().await;

    let identity = session
        .login("editor1", &SecretString::from("pw".to_string()))
        .await
        .unwrap();
    assert_eq!(identity, admin);
    assert!(session.is_authenticated());
    assert!(session.last_error().is_none());

    let saved = store.snapshot().expect("credentials saved");
    assert_eq!(saved.identity, Some(admin));
    assert!(backend.token_is_valid(saved.token.expose()));
}

#[tokio::test]
async fn test_login_with_bad_password_reports_backend_message() {
    let backend = TestBackend::start().await;
    backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let store = Arc::new(MemoryTokenStore::new());
    let session = session(&backend, store.clone());
    session.init().await;

    let err = session
        .login("root", &SecretString::from("nope".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, LoginError::InvalidCredentials(ref m) if m == "Invalid credentials"));
    assert!(!err.is_retryable());
    assert_eq!(session.last_error().as_deref(), Some("Invalid credentials"));
    assert!(!session.is_authenticated());
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn test_logout_invalidates_token_and_clears_storage() {
    let backend = TestBackend::start().await;
    backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let store = Arc::new(MemoryTokenStore::new());
    let session = session(&backend, store.clone());
    session
        .login("root", &SecretString::from("hunter2".to_string()))
        .await
        .unwrap();
    let token = session.token().expect("authenticated");

    session.logout().await;

    assert_eq!(session.state().status, SessionStatus::Unauthenticated);
    assert!(session.admin_token().is_none());
    assert!(store.snapshot().is_none());
    assert!(!backend.token_is_valid(token.expose()));
}

#[tokio::test]
async fn test_reverify_purge_is_observed_atomically() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let token = backend.issue_token(&admin);
    let store = Arc::new(MemoryTokenStore::with_credentials(credentials(&token, &admin)));
    let session = session(&backend, store.clone());
    session.init().await;

    let mut rx = session.subscribe();
    rx.mark_unchanged();
    backend.revoke_all_tokens();

    let state = session.reverify_now().await;
    assert_eq!(state.status, SessionStatus::Unauthenticated);

    // Every published snapshot has token and identity either both present
    // or both absent.
    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone();
    assert!(seen.token.is_none());
    assert!(seen.identity.is_none());
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn test_background_reverify_purges_revoked_token() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let token = backend.issue_token(&admin);
    let store = Arc::new(MemoryTokenStore::with_credentials(credentials(&token, &admin)));
    let session = session(&backend, store.clone());
    session.init().await;
    assert!(session.is_authenticated());

    let _reverify = session.spawn_reverify();
    backend.revoke_all_tokens();

    let mut rx = session.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| !s.is_authenticated()))
        .await
        .expect("purged within timeout")
        .unwrap();

    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn test_background_reverify_stops_when_handle_dropped() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let token = backend.issue_token(&admin);
    let store = Arc::new(MemoryTokenStore::with_credentials(credentials(&token, &admin)));
    let session = session(&backend, store);
    session.init().await;

    drop(session.spawn_reverify());
    backend.clear_requests();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(backend.request_count(), 0);
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_session_survives_restart_with_file_store() {
    let backend = TestBackend::start().await;
    backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = session(&backend, Arc::new(FileTokenStore::new(&path)));
    first
        .login("root", &SecretString::from("hunter2".to_string()))
        .await
        .unwrap();
    drop(first);

    let second = session(&backend, Arc::new(FileTokenStore::new(&path)));
    let state = second.init().await;
    assert_eq!(state.status, SessionStatus::Authenticated);
    assert_eq!(state.identity.map(|a| a.username).as_deref(), Some("root"));
}

#[tokio::test]
async fn test_logout_during_verify_keeps_storage_empty() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let token = backend.issue_token(&admin);
    let store = Arc::new(MemoryTokenStore::with_credentials(credentials(&token, &admin)));
    let session = session(&backend, store.clone());
    backend.delay_verify(Duration::from_millis(300));

    let init = tokio::spawn({
        let session = session.clone();
        async move { session.init().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.logout().await;

    let state = init.await.unwrap();
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert!(session.admin_token().is_none());
    assert!(store.snapshot().is_none(), "late verify must not restore the token");
}

#[tokio::test]
async fn test_failed_recheck_of_old_token_spares_new_login() {
    let backend = TestBackend::start().await;
    let admin = backend.add_admin("root", "hunter2", AdminRole::SuperAdmin);
    let token = backend.issue_token(&admin);
    let store = Arc::new(MemoryTokenStore::with_credentials(credentials(&token, &admin)));
    let session = session(&backend, store.clone());
    session.init().await;
    assert!(session.is_authenticated());

    backend.revoke_all_tokens();
    backend.delay_verify(Duration::from_millis(300));
    let recheck = tokio::spawn({
        let session = session.clone();
        async move { session.reverify_now().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    session
        .login("root", &SecretString::from("hunter2".to_string()))
        .await
        .unwrap();
    let fresh = session.token().expect("logged in again");

    let state = recheck.await.unwrap();
    assert_eq!(state.status, SessionStatus::Authenticated);
    assert_eq!(state.token, Some(fresh.clone()));
    assert_eq!(store.snapshot().map(|c| c.token), Some(fresh));
}
