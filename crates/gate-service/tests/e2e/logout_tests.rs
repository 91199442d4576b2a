//! E2E tests for logout and the session-info projection.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use gate_test_utils::{StubNavigator, TestGate, TestTokenBuilder, FALLBACK_URL};
use serde_json::json;

/// Logout clears the session and redirects immediately, with no delay and
/// regardless of prior grant/deny state.
#[tokio::test]
async fn test_logout_clears_session_and_redirects_immediately() {
    let token = TestTokenBuilder::new().with_email("a@b.com").build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"email": "a@b.com"}]}))
        .await;

    assert!(gate.controller.check_access().await.is_granted());
    assert!(gate.store.raw().is_some());

    gate.controller.logout().await;

    assert!(gate.store.raw().is_none(), "logout should clear the session");
    assert_eq!(
        gate.navigator.redirects(),
        vec![FALLBACK_URL.to_string()],
        "logout should redirect without waiting"
    );
}

/// Logout without any session is still a redirect, not an error.
#[tokio::test]
async fn test_logout_without_session_still_redirects() {
    let gate = TestGate::spawn(StubNavigator::without_token()).await;

    gate.controller.logout().await;

    assert_eq!(gate.navigator.redirects(), vec![FALLBACK_URL.to_string()]);
}

/// The session-info projection reflects the cached claims after a grant.
#[tokio::test]
async fn test_session_info_projects_granted_session() {
    let token = TestTokenBuilder::new()
        .with_sub("mario")
        .with_email("a@b.com")
        .with_jti("x1")
        .expires_in(3600)
        .build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"jti": "x1"}]}))
        .await;

    assert!(gate.controller.check_access().await.is_granted());

    let view = gate
        .controller
        .session_info()
        .await
        .expect("session should exist after grant");

    assert_eq!(view.email, Some("a@b.com".to_string()));
    assert_eq!(view.subject, Some("mario".to_string()));
    assert_eq!(view.jti, Some("x1".to_string()));
    assert!(view.expires.is_some());
    assert!(view.is_valid);
}

/// Session info is absent before any grant and after logout.
#[tokio::test]
async fn test_session_info_absent_without_session() {
    let token = TestTokenBuilder::new().with_email("a@b.com").build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"email": "a@b.com"}]}))
        .await;

    assert!(gate.controller.session_info().await.is_none());

    assert!(gate.controller.check_access().await.is_granted());
    assert!(gate.controller.session_info().await.is_some());

    gate.controller.logout().await;
    assert!(gate.controller.session_info().await.is_none());
}
