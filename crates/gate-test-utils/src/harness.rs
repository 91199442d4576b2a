//! Test gate harness for E2E testing
//!
//! Wires a real [`AccessController`] against a wiremock directory server,
//! an in-memory session store, and recording ports.

use crate::ports::{RecordingNotifier, StubNavigator};
use crate::stores::MemoryStore;
use gate_service::config::Config;
use gate_service::controller::AccessController;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fallback location every harness gate redirects to.
pub const FALLBACK_URL: &str = "https://example.com/make-token.html";

/// Directory document path served by the harness mock server.
pub const DIRECTORY_PATH: &str = "/whitelist.json";

/// Redirect delay used by harness gates. Short enough for tests to wait
/// out in real time, long enough to observe the "not yet redirected" state.
pub const TEST_REDIRECT_DELAY: Duration = Duration::from_millis(50);

/// Fully wired gate with observable edges.
///
/// # Example
/// ```rust,ignore
/// let gate = TestGate::spawn(StubNavigator::with_token(&token)).await;
/// gate.mount_entries(serde_json::json!({"entries": [{"email": "a@b.com"}]})).await;
///
/// let result = gate.controller.check_access().await;
///
/// assert!(result.is_granted());
/// assert!(gate.navigator.stripped());
/// ```
pub struct TestGate {
    /// Mock directory server. Dropping it verifies `expect` counts.
    pub server: MockServer,

    /// Handle onto the session slot for seeding and assertions.
    pub store: MemoryStore,

    /// The navigator the controller sees.
    pub navigator: Arc<StubNavigator>,

    /// The output port the controller notifies.
    pub notifier: Arc<RecordingNotifier>,

    /// The controller under test.
    pub controller: AccessController,
}

impl TestGate {
    /// Wire a gate around the given navigator.
    pub async fn spawn(navigator: StubNavigator) -> Self {
        let server = MockServer::start().await;
        let store = MemoryStore::new();
        let navigator = Arc::new(navigator);
        let notifier = Arc::new(RecordingNotifier::new());

        let config = Config::new(
            format!("{}{}", server.uri(), DIRECTORY_PATH),
            FALLBACK_URL.to_string(),
        )
        .with_redirect_delay(TEST_REDIRECT_DELAY)
        .with_http_timeout(Duration::from_secs(2));

        let controller = AccessController::new(
            &config,
            Box::new(store.clone()),
            navigator.clone(),
            notifier.clone(),
        );

        Self {
            server,
            store,
            navigator,
            notifier,
            controller,
        }
    }

    /// Serve the given directory document for any number of fetches.
    pub async fn mount_document(&self, document: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(DIRECTORY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    /// Serve the given HTTP status for any directory fetch.
    pub async fn mount_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(DIRECTORY_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Assert that the directory is never fetched during this test.
    pub async fn expect_no_fetch(&self) {
        Mock::given(method("GET"))
            .and(path(DIRECTORY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "entries": []
            })))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Wait (in real time) until a redirect has been observed, or panic
    /// after one second.
    pub async fn wait_for_redirect(&self) -> Vec<String> {
        for _ in 0..100 {
            let redirects = self.navigator.redirects();
            if !redirects.is_empty() {
                return redirects;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("No redirect observed within one second");
    }
}
