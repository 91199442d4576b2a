//! Recording implementations of the controller's ports.

use gate_service::claims::ClaimsSet;
use gate_service::controller::{AccessNotifier, DenialReason, Navigator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Navigator stub holding an optional query token and recording calls.
#[derive(Default)]
pub struct StubNavigator {
    token: Mutex<Option<String>>,
    stripped: AtomicBool,
    redirects: Mutex<Vec<String>>,
}

impl StubNavigator {
    /// A location with no `t` query parameter.
    #[must_use]
    pub fn without_token() -> Self {
        Self::default()
    }

    /// A location carrying the given token in its `t` query parameter.
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
            ..Self::default()
        }
    }

    /// Whether `strip_query_token` has been called.
    #[must_use]
    pub fn stripped(&self) -> bool {
        self.stripped.load(Ordering::SeqCst)
    }

    /// All redirect targets in call order.
    #[must_use]
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .map(|redirects| redirects.clone())
            .unwrap_or_default()
    }
}

impl Navigator for StubNavigator {
    fn query_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|token| token.clone())
    }

    fn strip_query_token(&self) {
        self.stripped.store(true, Ordering::SeqCst);
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
    }

    fn redirect(&self, target: &str) {
        if let Ok(mut redirects) = self.redirects.lock() {
            redirects.push(target.to_string());
        }
    }
}

/// One observed output-port event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierEvent {
    /// Grant with the admitted claims.
    Granted(ClaimsSet),

    /// Denial with its reason.
    Denied(DenialReason),
}

/// Output port that records every grant/deny event.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifierEvent>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All observed events in call order.
    #[must_use]
    pub fn events(&self) -> Vec<NotifierEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AccessNotifier for RecordingNotifier {
    fn granted(&self, user: &ClaimsSet) {
        if let Ok(mut events) = self.events.lock() {
            events.push(NotifierEvent::Granted(user.clone()));
        }
    }

    fn denied(&self, reason: DenialReason) {
        if let Ok(mut events) = self.events.lock() {
            events.push(NotifierEvent::Denied(reason));
        }
    }
}
