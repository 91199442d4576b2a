//! Admission gate binary.
//!
//! Wires an [`AccessController`] from environment configuration and runs one
//! admission check against a page location given on the command line:
//!
//! ```text
//! admission-gate 'https://example.com/admin/?t=<token>'
//! admission-gate --session-info
//! admission-gate --logout
//! ```
//!
//! The admission result is printed as JSON on stdout; redirects are logged.

use gate_service::claims::ClaimsSet;
use gate_service::config::Config;
use gate_service::controller::{AccessController, AccessNotifier, DenialReason, Navigator};
use gate_service::session::FileStore;
use reqwest::Url;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Navigator over a command-line supplied page location.
///
/// Stands in for the browser location bar: the `t` query parameter is read
/// and stripped here, and redirects are logged rather than followed.
struct PageNavigator {
    location: Mutex<Url>,
}

impl PageNavigator {
    fn parse(page_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            location: Mutex::new(Url::parse(page_url)?),
        })
    }

    fn location(&self) -> Option<String> {
        self.location.lock().ok().map(|url| url.to_string())
    }
}

impl Navigator for PageNavigator {
    fn query_token(&self) -> Option<String> {
        let location = self.location.lock().ok()?;
        location
            .query_pairs()
            .find(|(key, _)| key == "t")
            .map(|(_, value)| value.into_owned())
    }

    fn strip_query_token(&self) {
        let Ok(mut location) = self.location.lock() else {
            return;
        };

        let remaining: Vec<(String, String)> = location
            .query_pairs()
            .filter(|(key, _)| key != "t")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        location.set_query(None);
        if !remaining.is_empty() {
            location.query_pairs_mut().extend_pairs(remaining);
        }
    }

    fn redirect(&self, target: &str) {
        info!(target: "gate.navigator", location = %target, "Redirecting");
        if let (Ok(mut location), Ok(url)) = (self.location.lock(), Url::parse(target)) {
            *location = url;
        }
    }
}

/// Output port that logs admission outcomes.
struct LogNotifier;

impl AccessNotifier for LogNotifier {
    fn granted(&self, user: &ClaimsSet) {
        info!(target: "gate.notify", user = ?user, "Admission granted");
    }

    fn denied(&self, reason: DenialReason) {
        warn!(target: "gate.notify", reason = %reason, "Admission denied");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gate_service=debug,admission_gate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting admission gate");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_default();

    let store = Box::new(FileStore::new(&config.session_path));
    let navigator = match mode.as_str() {
        "--logout" | "--session-info" => {
            // No page location involved; an inert one keeps the wiring uniform.
            Arc::new(PageNavigator::parse(&config.fallback_url)?)
        }
        "" => {
            error!("Usage: admission-gate <page-url> | --session-info | --logout");
            return Err("missing page URL argument".into());
        }
        page_url => Arc::new(PageNavigator::parse(page_url)?),
    };

    let controller = AccessController::new(&config, store, navigator.clone(), Arc::new(LogNotifier));

    match mode.as_str() {
        "--logout" => {
            controller.logout().await;
            return Ok(());
        }
        "--session-info" => {
            match controller.session_info().await {
                Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
                None => println!("null"),
            }
            return Ok(());
        }
        _ => {}
    }

    let result = controller.check_access().await;
    println!("{}", serde_json::to_string_pretty(&result.to_json())?);

    if result.is_granted() {
        if let Some(location) = navigator.location() {
            info!(location = %location, "Page location after admission");
        }
        Ok(())
    } else {
        // Stay alive until the scheduled fallback redirect fires, the way
        // the denied page would.
        tokio::time::sleep(config.redirect_delay).await;
        std::process::exit(1);
    }
}
