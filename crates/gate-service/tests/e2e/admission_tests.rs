//! E2E tests for the admission state machine.
//!
//! Each test wires a real controller against a wiremock directory server
//! and observes the result, the session slot, and the recorded port calls.
//!
//! ## Test Naming
//!
//! Tests follow the convention: `test_<scenario>_<expected_result>`

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use gate_service::controller::{AdmissionResult, DenialReason};
use gate_service::session::Session;
use gate_test_utils::{NotifierEvent, StubNavigator, TestGate, TestTokenBuilder, FALLBACK_URL};
use serde_json::json;

/// Happy path: valid unexpired token, directory entry matching by email.
///
/// The admission is granted, the session is persisted with a matching
/// payload, the token parameter is stripped, and the output port sees
/// exactly one grant.
#[tokio::test]
async fn test_valid_token_with_email_entry_grants() -> Result<(), anyhow::Error> {
    // Arrange
    let token = TestTokenBuilder::new()
        .with_email("a@b.com")
        .with_jti("x1")
        .expires_in(3600)
        .build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"email": "a@b.com"}]}))
        .await;

    // Act
    let result = gate.controller.check_access().await;

    // Assert
    let AdmissionResult::Granted { user } = &result else {
        panic!("Expected grant, got {result:?}");
    };
    assert_eq!(user.email, Some("a@b.com".to_string()));
    assert_eq!(user.jti, Some("x1".to_string()));

    let record = gate
        .store
        .raw()
        .ok_or_else(|| anyhow::anyhow!("session should be persisted on grant"))?;
    let session: Session = serde_json::from_str(&record)?;
    assert_eq!(session.token, token);
    assert_eq!(&session.payload, user);

    assert!(gate.navigator.stripped(), "token parameter should be stripped");
    assert!(gate.navigator.redirects().is_empty(), "grant should not redirect");
    assert_eq!(gate.notifier.events(), vec![NotifierEvent::Granted(user.clone())]);
    Ok(())
}

/// A directory entry matching by jti grants even when its email differs.
#[tokio::test]
async fn test_jti_entry_with_different_email_grants() {
    let token = TestTokenBuilder::new()
        .with_email("a@b.com")
        .with_jti("x1")
        .build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"jti": "x1", "email": "someone-else@b.com"}]}))
        .await;

    assert!(gate.controller.check_access().await.is_granted());
}

/// A token without an expiry claim never expires.
#[tokio::test]
async fn test_token_without_expiry_grants() {
    let token = TestTokenBuilder::new()
        .with_email("a@b.com")
        .without_expiry()
        .build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"email": "a@b.com"}]}))
        .await;

    assert!(gate.controller.check_access().await.is_granted());
}

/// No query token and no cached session: deny "missing token" without
/// attempting decode or directory fetch.
#[tokio::test]
async fn test_no_token_anywhere_denies_missing_token() {
    let gate = TestGate::spawn(StubNavigator::without_token()).await;
    gate.expect_no_fetch().await;

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::MissingToken
        }
    );
    assert_eq!(
        gate.notifier.events(),
        vec![NotifierEvent::Denied(DenialReason::MissingToken)]
    );
}

/// Malformed token (wrong segment count): deny "invalid token" before any
/// directory fetch.
#[tokio::test]
async fn test_malformed_token_denies_invalid_token() {
    let gate = TestGate::spawn(StubNavigator::with_token("only.two-segments")).await;
    gate.expect_no_fetch().await;

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::InvalidToken
        }
    );
}

/// Expired claims fold into the same "invalid token" reason as a decode
/// failure, and deny before the directory is consulted.
#[tokio::test]
async fn test_expired_claims_deny_invalid_token() {
    let token = TestTokenBuilder::new()
        .with_email("a@b.com")
        .expires_in(-60)
        .build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.expect_no_fetch().await;

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::InvalidToken
        }
    );
}

/// Directory fetch failure: deny "unauthorized token", persist nothing,
/// and clear any prior session.
#[tokio::test]
async fn test_directory_http_error_denies_unauthorized_and_clears_session() {
    let prior = TestTokenBuilder::new().with_email("old@b.com").build();
    let token = TestTokenBuilder::new()
        .with_email("a@b.com")
        .with_jti("x1")
        .build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_status(500).await;

    // Seed a prior session directly into the slot.
    gate.store.set_raw(
        &json!({"token": prior, "payload": {"email": "old@b.com"}, "timestamp": 1}).to_string(),
    );

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::Unauthorized
        }
    );
    assert!(gate.store.raw().is_none(), "prior session should be cleared");
}

/// An entry list without a match denies "unauthorized token".
#[tokio::test]
async fn test_unmatched_claims_deny_unauthorized() {
    let token = TestTokenBuilder::new()
        .with_email("a@b.com")
        .with_jti("x1")
        .build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"email": "someone-else@b.com"}]}))
        .await;

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::Unauthorized
        }
    );
}

/// A matching directory entry that has itself expired denies.
#[tokio::test]
async fn test_expired_directory_entry_denies_unauthorized() {
    let token = TestTokenBuilder::new()
        .with_email("a@b.com")
        .build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"entries": [{"email": "a@b.com", "expires": 1}]}))
        .await;

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::Unauthorized
        }
    );
}

/// A directory document of the wrong shape is "no entries", which denies.
#[tokio::test]
async fn test_wrong_document_shape_denies_unauthorized() {
    let token = TestTokenBuilder::new().with_email("a@b.com").build();
    let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
    gate.mount_document(json!({"allow": ["a@b.com"]})).await;

    let result = gate.controller.check_access().await;

    assert_eq!(
        result,
        AdmissionResult::Denied {
            reason: DenialReason::Unauthorized
        }
    );
}

/// Denial schedules the fallback redirect after the configured delay; it
/// has not fired by the time `check_access` returns.
///
/// Runs with the clock paused: the spawned redirect timer fires under
/// auto-advanced time, so the test is not sensitive to real scheduling.
#[tokio::test(start_paused = true)]
async fn test_denial_schedules_delayed_fallback_redirect() {
    let gate = TestGate::spawn(StubNavigator::without_token()).await;
    gate.expect_no_fetch().await;

    let result = gate.controller.check_access().await;

    assert!(!result.is_granted());
    assert!(
        gate.navigator.redirects().is_empty(),
        "redirect should be delayed, not immediate"
    );

    let redirects = gate.wait_for_redirect().await;
    assert_eq!(redirects, vec![FALLBACK_URL.to_string()]);
}
