//! E2E tests for session reuse across visits.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use gate_service::controller::{AdmissionResult, DenialReason};
use gate_test_utils::{StubNavigator, TestGate, TestTokenBuilder};
use serde_json::json;

/// A granted session admits a later visit that carries no query token.
#[tokio::test]
async fn test_cached_session_grants_later_visit() {
    let token = TestTokenBuilder::new()
        .with_email("a@b.com")
        .expires_in(3600)
        .build();

    // First visit carries the token and is granted.
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"email": "a@b.com"}]}))
        .await;
    assert!(gate.controller.check_access().await.is_granted());

    // Second visit: no query token; the cached session's token is used and
    // the directory is consulted again.
    let result = gate.controller.check_access().await;

    let AdmissionResult::Granted { user } = result else {
        panic!("Expected cached session to grant");
    };
    assert_eq!(user.email, Some("a@b.com".to_string()));
}

/// An explicit query token takes priority over the cached session.
#[tokio::test]
async fn test_query_token_takes_priority_over_session() {
    let cached = TestTokenBuilder::new()
        .with_email("cached@b.com")
        .with_jti("cached-tok")
        .build();
    let presented = TestTokenBuilder::new()
        .with_email("fresh@b.com")
        .with_jti("fresh-tok")
        .build();

    let gate = TestGate::spawn(StubNavigator::with_token(&presented)).await;
    // Only the freshly presented token's email is authorized.
    gate.mount_document(json!({"entries": [{"email": "fresh@b.com"}]}))
        .await;

    gate.store.set_raw(
        &json!({
            "token": cached,
            "payload": {"email": "cached@b.com", "jti": "cached-tok"},
            "timestamp": 1
        })
        .to_string(),
    );

    let AdmissionResult::Granted { user } = gate.controller.check_access().await else {
        panic!("Expected grant via the query token");
    };
    assert_eq!(user.email, Some("fresh@b.com".to_string()));
}

/// An expired cached session is evicted; with no query token the outcome
/// is "missing token".
#[tokio::test]
async fn test_expired_cached_session_denies_missing_token() {
    let token = TestTokenBuilder::new().with_email("a@b.com").build();
    let gate = TestGate::spawn(StubNavigator::without_token()).await;
    gate.expect_no_fetch().await;

    gate.store.set_raw(
        &json!({
            "token": token,
            "payload": {"email": "a@b.com", "exp": 1},
            "timestamp": 1,
            "exp": 1
        })
        .to_string(),
    );

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::MissingToken
        }
    );
    assert!(gate.store.raw().is_none(), "expired session should be evicted");
}

/// A corrupt session record self-heals: it is deleted and treated as
/// absent.
#[tokio::test]
async fn test_corrupt_session_record_self_heals() {
    let gate = TestGate::spawn(StubNavigator::without_token()).await;
    gate.expect_no_fetch().await;

    gate.store.set_raw("{definitely not json");

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::MissingToken
        }
    );
    assert!(gate.store.raw().is_none(), "corrupt record should be deleted");
}

/// A failing session write degrades the cache, not the admission: the
/// grant still goes through.
#[tokio::test]
async fn test_session_write_failure_still_grants() {
    let token = TestTokenBuilder::new().with_email("a@b.com").build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"email": "a@b.com"}]}))
        .await;
    gate.store.fail_writes(true);

    assert!(gate.controller.check_access().await.is_granted());
    assert!(gate.store.raw().is_none());
}
