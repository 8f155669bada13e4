#![allow(clippy::unwrap_used)]
// Credential manager: restore priority, single-flight renewal, failure
// handling, and persistence.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use secrecy::ExposeSecret;

use hearth_core::{AuthError, PersistedSession, SessionSource, SessionStore};

use common::{FakeCloud, credentials};

fn persist(dir: &std::path::Path, refresh_token: &str) {
    SessionStore::new(dir.join("session.json"))
        .save(&PersistedSession {
            refresh_token: refresh_token.into(),
            access_token: None,
            token_expiry: None,
            appliances: None,
            updated_at: Utc::now(),
        })
        .unwrap();
}

// ── Restore ─────────────────────────────────────────────────────────

#[tokio::test]
async fn persisted_token_wins_over_configured() {
    let dir = tempfile::tempdir().unwrap();
    persist(dir.path(), "rt-persisted");
    let cloud = FakeCloud::new();
    let manager = credentials(&cloud, dir.path(), Some("rt-config"));

    assert_eq!(manager.restore().await, SessionSource::Persisted);
    manager.ensure_valid().await.unwrap();

    assert_eq!(cloud.seen_refresh_tokens(), vec!["rt-persisted".to_owned()]);
}

#[tokio::test]
async fn configured_token_used_without_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    let manager = credentials(&cloud, dir.path(), Some("rt-config"));

    assert_eq!(manager.restore().await, SessionSource::Configured);
    let session = manager.ensure_valid().await.unwrap();

    assert_eq!(cloud.seen_refresh_tokens(), vec!["rt-config".to_owned()]);
    assert_eq!(session.access_token.unwrap().expose_secret(), "at-1");
}

#[tokio::test]
async fn no_token_anywhere_fails_without_calling_cloud() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    let manager = credentials(&cloud, dir.path(), None);

    assert_eq!(manager.restore().await, SessionSource::Empty);
    let err = manager.ensure_valid().await.unwrap_err();

    assert!(matches!(err, AuthError::NoRefreshToken));
    assert_eq!(cloud.exchanges(), 0);
}

// ── Renewal ─────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_callers_share_one_renewal() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    cloud.set_exchange_delay(Duration::from_millis(50));
    let manager = credentials(&cloud, dir.path(), Some("rt-0"));
    manager.restore().await;

    let calls = (0..8).map(|_| {
        let manager = Arc::clone(&manager);
        async move { manager.ensure_valid().await }
    });
    let sessions = join_all(calls).await;

    assert_eq!(cloud.exchanges(), 1);
    assert_eq!(manager.renewal_count(), 1);
    for session in sessions {
        let session = session.unwrap();
        assert_eq!(session.access_token.unwrap().expose_secret(), "at-1");
        assert_eq!(session.refresh_token.expose_secret(), "rt-1");
    }
}

#[tokio::test]
async fn concurrent_callers_share_one_failure() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    cloud.set_exchange_delay(Duration::from_millis(20));
    cloud
        .fail_exchange
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let manager = credentials(&cloud, dir.path(), Some("rt-0"));
    manager.restore().await;

    let calls = (0..4).map(|_| {
        let manager = Arc::clone(&manager);
        async move { manager.ensure_valid().await }
    });
    let results = join_all(calls).await;

    assert_eq!(cloud.exchanges(), 1);
    for result in results {
        assert!(matches!(result, Err(AuthError::RenewalFailed { .. })));
    }
}

#[tokio::test]
async fn short_lived_grant_is_shared_by_queued_callers() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    cloud.set_exchange_delay(Duration::from_millis(20));
    cloud.set_grant_lifetime(60);
    let manager = credentials(&cloud, dir.path(), Some("rt-0"));
    manager.restore().await;

    let calls = (0..4).map(|_| {
        let manager = Arc::clone(&manager);
        async move { manager.ensure_valid().await }
    });
    let sessions = join_all(calls).await;

    assert_eq!(cloud.exchanges(), 1);
    for session in sessions {
        assert_eq!(session.unwrap().access_token.unwrap().expose_secret(), "at-1");
    }
}

#[tokio::test]
async fn explicit_renew_always_exchanges() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    let manager = credentials(&cloud, dir.path(), Some("rt-0"));
    manager.restore().await;
    manager.ensure_valid().await.unwrap();

    let renewed = manager.renew().await.unwrap();

    assert_eq!(cloud.exchanges(), 2);
    assert_eq!(cloud.seen_refresh_tokens(), vec!["rt-0".to_owned(), "rt-1".to_owned()]);
    assert_eq!(renewed.refresh_token.expose_secret(), "rt-2");
    assert_eq!(manager.store().load().unwrap().unwrap().refresh_token, "rt-2");

    // The fresh session satisfies the next caller without another exchange.
    manager.ensure_valid().await.unwrap();
    assert_eq!(cloud.exchanges(), 2);
}

#[tokio::test]
async fn valid_session_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    let manager = credentials(&cloud, dir.path(), Some("rt-0"));
    manager.restore().await;

    manager.ensure_valid().await.unwrap();
    manager.ensure_valid().await.unwrap();

    assert_eq!(cloud.exchanges(), 1);
}

#[tokio::test]
async fn renewal_persists_the_new_refresh_token() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    let manager = credentials(&cloud, dir.path(), Some("rt-0"));
    manager.restore().await;

    manager.ensure_valid().await.unwrap();

    let saved = manager.store().load().unwrap().unwrap();
    assert_eq!(saved.refresh_token, "rt-1");
    assert_eq!(saved.access_token.as_deref(), Some("at-1"));
    assert!(saved.token_expiry.unwrap() > Utc::now().timestamp_millis());
}

#[tokio::test]
async fn failed_renewal_clears_session_then_recovers_from_store() {
    let dir = tempfile::tempdir().unwrap();
    persist(dir.path(), "rt-good");
    let cloud = FakeCloud::new();
    let manager = credentials(&cloud, dir.path(), Some("rt-config"));
    manager.restore().await;

    cloud
        .fail_exchange
        .store(true, std::sync::atomic::Ordering::SeqCst);
    assert!(manager.ensure_valid().await.is_err());
    assert!(manager.session().await.is_none());

    cloud
        .fail_exchange
        .store(false, std::sync::atomic::Ordering::SeqCst);
    manager.ensure_valid().await.unwrap();

    assert_eq!(
        cloud.seen_refresh_tokens(),
        vec!["rt-good".to_owned(), "rt-good".to_owned()]
    );
}

#[tokio::test]
async fn invalidated_access_token_forces_renewal() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = FakeCloud::new();
    let manager = credentials(&cloud, dir.path(), Some("rt-0"));
    manager.restore().await;
    manager.ensure_valid().await.unwrap();

    manager.invalidate_access_token().await;
    let session = manager.ensure_valid().await.unwrap();

    assert_eq!(cloud.exchanges(), 2);
    assert_eq!(cloud.seen_refresh_tokens().last().unwrap(), "rt-1");
    assert_eq!(session.access_token.unwrap().expose_secret(), "at-2");
}
