//! Gate configuration.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default denial redirect delay, matching the page behavior the gate
/// replaces: the denial message stays visible for three seconds before the
/// fallback location loads.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(3);

/// Default session slot path for the file-backed store.
const DEFAULT_SESSION_PATH: &str = "gate-session.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Resource location of the authorization directory document.
    pub directory_url: String,

    /// Fallback location used for denial and logout redirects.
    pub fallback_url: String,

    /// Delay between a denial and its scheduled redirect.
    pub redirect_delay: Duration,

    /// Request timeout for directory fetches.
    pub http_timeout: Duration,

    /// Path of the file-backed session slot (binary only).
    pub session_path: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Create a configuration with default delay, timeout, and session path.
    #[must_use]
    pub fn new(directory_url: String, fallback_url: String) -> Self {
        Self {
            directory_url,
            fallback_url,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            http_timeout: crate::directory::DEFAULT_HTTP_TIMEOUT,
            session_path: DEFAULT_SESSION_PATH.to_string(),
        }
    }

    /// Set the denial redirect delay.
    #[must_use]
    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    /// Set the directory fetch timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the file-backed session slot path.
    #[must_use]
    pub fn with_session_path(mut self, path: impl Into<String>) -> Self {
        self.session_path = path.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// numeric variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// numeric variable fails to parse.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let directory_url = vars
            .get("GATE_DIRECTORY_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("GATE_DIRECTORY_URL".to_string()))?
            .clone();

        let fallback_url = vars
            .get("GATE_FALLBACK_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("GATE_FALLBACK_URL".to_string()))?
            .clone();

        let redirect_delay = match vars.get("GATE_REDIRECT_DELAY_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("GATE_REDIRECT_DELAY_SECS", raw)?),
            None => DEFAULT_REDIRECT_DELAY,
        };

        let http_timeout = match vars.get("GATE_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("GATE_HTTP_TIMEOUT_SECS", raw)?),
            None => crate::directory::DEFAULT_HTTP_TIMEOUT,
        };

        let session_path = vars
            .get("GATE_SESSION_PATH")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SESSION_PATH.to_string());

        Ok(Config {
            directory_url,
            fallback_url,
            redirect_delay,
            http_timeout,
            session_path,
        })
    }
}

fn parse_secs(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw.to_string()))
}
