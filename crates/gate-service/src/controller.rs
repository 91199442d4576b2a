//! Access controller: the end-to-end admission state machine.
//!
//! One `check_access` run walks a single pass with no retries:
//!
//! ```text
//! START -> LOCATING -> DECODING -> AUTHORIZING -> GRANTED | DENIED
//! ```
//!
//! Token location prefers an explicit `t` query parameter on the current
//! page location over a cached session's token. Every denial clears any
//! existing session, notifies the output port, and schedules a redirect to
//! the fallback location; every grant persists the session and strips the
//! token parameter from the location.
//!
//! The controller is an explicitly constructed instance owned by its
//! caller; there is no ambient global gate. Page concerns (location access,
//! redirects, result rendering) sit behind the [`Navigator`] and
//! [`AccessNotifier`] ports so the state machine is testable without a
//! rendering surface.

use crate::claims::{self, ClaimsSet};
use crate::config::Config;
use crate::directory::{is_authorized, DirectoryClient};
use crate::session::{SessionCache, SessionStore, SessionView};
use chrono::Utc;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

// =============================================================================
// Ports
// =============================================================================

/// Capability over the current page location.
pub trait Navigator: Send + Sync {
    /// The `t` query parameter of the current location, if present.
    fn query_token(&self) -> Option<String>;

    /// Remove the `t` query parameter from the current location.
    /// A no-op when the parameter is absent.
    fn strip_query_token(&self);

    /// Navigate to the given location.
    fn redirect(&self, target: &str);
}

/// Output port notified of every admission outcome.
pub trait AccessNotifier: Send + Sync {
    /// Called once per granted admission.
    fn granted(&self, user: &ClaimsSet);

    /// Called once per denied admission.
    fn denied(&self, reason: DenialReason);
}

// =============================================================================
// Admission Outcome Types
// =============================================================================

/// The three outward-visible denial reasons.
///
/// Decode failures and expired claims are folded into the same
/// `InvalidToken` reason; callers are not told which one occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No token in the query parameter and no cached session.
    MissingToken,

    /// Token failed to decode, or its claims have expired.
    InvalidToken,

    /// No valid directory entry matches the claims.
    Unauthorized,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::MissingToken => write!(f, "missing token"),
            DenialReason::InvalidToken => write!(f, "invalid token"),
            DenialReason::Unauthorized => write!(f, "unauthorized token"),
        }
    }
}

/// Outcome of one `check_access` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionResult {
    /// Admission granted; the page may render.
    Granted {
        /// Claims of the admitted holder.
        user: ClaimsSet,
    },

    /// Admission denied; a redirect to the fallback location is scheduled.
    Denied {
        /// Why admission was denied.
        reason: DenialReason,
    },
}

impl AdmissionResult {
    /// Whether this outcome is a grant.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, AdmissionResult::Granted { .. })
    }

    /// Wire shape of the outcome:
    /// `{success, user, message}` on grant, `{success, reason, message}` on deny.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AdmissionResult::Granted { user } => json!({
                "success": true,
                "user": user,
                "message": "Access granted",
            }),
            AdmissionResult::Denied { reason } => json!({
                "success": false,
                "reason": reason.to_string(),
                "message": "Access denied",
            }),
        }
    }
}

// =============================================================================
// Access Controller
// =============================================================================

/// Orchestrates token location, decoding, directory authorization, and
/// session caching into the admission decision.
pub struct AccessController {
    fallback_url: String,
    redirect_delay: Duration,
    sessions: SessionCache,
    directory: DirectoryClient,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn AccessNotifier>,

    /// Serializes admission runs. Concurrent decisions racing to overwrite
    /// the singleton session slot would be last-write-wins otherwise.
    in_flight: Mutex<()>,
}

impl AccessController {
    /// Build a controller from configuration and its capabilities.
    #[must_use]
    pub fn new(
        config: &Config,
        store: Box<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn AccessNotifier>,
    ) -> Self {
        Self {
            fallback_url: config.fallback_url.clone(),
            redirect_delay: config.redirect_delay,
            sessions: SessionCache::new(store),
            directory: DirectoryClient::with_timeout(
                config.directory_url.clone(),
                config.http_timeout,
            ),
            navigator,
            notifier,
            in_flight: Mutex::new(()),
        }
    }

    /// Run the full admission state machine once.
    ///
    /// Suspends at the directory fetch (and at storage access when the
    /// store is asynchronous); steps execute in strict sequence and
    /// concurrent calls are serialized by the in-flight guard.
    pub async fn check_access(&self) -> AdmissionResult {
        let _guard = self.in_flight.lock().await;
        let now = Utc::now().timestamp();

        tracing::debug!(target: "gate.controller", "Admission check started");

        // LOCATING: explicit query token wins over a cached session.
        let Some(token) = self.locate_token().await else {
            tracing::debug!(target: "gate.controller", "No token in location or session");
            return self.deny(DenialReason::MissingToken).await;
        };

        // DECODING: parse failures and expired claims fold into one reason.
        let decoded = match claims::decode(&token) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(target: "gate.controller", error = %e, "Token failed to decode");
                return self.deny(DenialReason::InvalidToken).await;
            }
        };

        let user = decoded.claims;
        if claims::is_expired(user.exp, now) {
            tracing::debug!(target: "gate.controller", "Token claims have expired");
            return self.deny(DenialReason::InvalidToken).await;
        }

        // AUTHORIZING: an unreachable directory yields no entries, which
        // denies; it never grants blanket access.
        let entries = self.directory.fetch().await;
        if !is_authorized(&user, &entries, now) {
            return self.deny(DenialReason::Unauthorized).await;
        }

        // GRANTED: cache the outcome and clean the location. A failed cache
        // write degrades the next visit, not this admission.
        if let Err(e) = self.sessions.save(&token, &user).await {
            tracing::warn!(target: "gate.controller", error = %e, "Failed to persist session");
        }
        self.navigator.strip_query_token();

        tracing::info!(target: "gate.controller", "Access granted");
        self.notifier.granted(&user);
        AdmissionResult::Granted { user }
    }

    /// Read-only projection of the current session, independent of
    /// `check_access`.
    pub async fn session_info(&self) -> Option<SessionView> {
        match self.sessions.load().await {
            Ok(session) => session.map(|s| s.view()),
            Err(e) => {
                tracing::warn!(target: "gate.controller", error = %e, "Failed to load session");
                None
            }
        }
    }

    /// Clear the session and redirect to the fallback location immediately,
    /// bypassing the state machine.
    pub async fn logout(&self) {
        let _guard = self.in_flight.lock().await;

        if let Err(e) = self.sessions.clear().await {
            tracing::warn!(target: "gate.controller", error = %e, "Failed to clear session on logout");
        }

        tracing::info!(target: "gate.controller", "Logged out");
        self.navigator.redirect(&self.fallback_url);
    }

    /// Acquire the candidate token: query parameter first, cached session
    /// second. Storage failures are absorbed as "no session".
    async fn locate_token(&self) -> Option<String> {
        if let Some(token) = self.navigator.query_token() {
            tracing::debug!(target: "gate.controller", "Token found in page location");
            return Some(token);
        }

        match self.sessions.load().await {
            Ok(Some(session)) => {
                tracing::debug!(target: "gate.controller", "Token found in cached session");
                Some(session.token)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(target: "gate.controller", error = %e, "Failed to load session");
                None
            }
        }
    }

    /// DENIED: clear any existing session, notify the output port, and
    /// schedule the (non-cancellable) fallback redirect.
    async fn deny(&self, reason: DenialReason) -> AdmissionResult {
        tracing::info!(target: "gate.controller", reason = %reason, "Access denied");

        if let Err(e) = self.sessions.clear().await {
            tracing::warn!(target: "gate.controller", error = %e, "Failed to clear session on denial");
        }

        self.notifier.denied(reason);
        self.schedule_redirect();
        AdmissionResult::Denied { reason }
    }

    /// Spawn the delayed denial redirect so the denial message stays
    /// visible first.
    fn schedule_redirect(&self) {
        let navigator = Arc::clone(&self.navigator);
        let target = self.fallback_url.clone();
        let delay = self.redirect_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.redirect(&target);
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
