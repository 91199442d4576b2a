//! Authorization directory client and claims matcher.
//!
//! The directory is an externally maintained allow-list fetched per
//! admission attempt. Fetching is deliberately fail-closed: an unreachable
//! or malformed directory degrades to "no entries", which the matcher turns
//! into a denial. A directory outage can therefore never grant access, and
//! it never crashes the admission flow either.

use crate::claims::{is_expired, ClaimsSet};
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default request timeout for directory fetches.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection timeout for the directory HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Directory Types
// =============================================================================

/// One record from the authorization list.
///
/// An entry matches a [`ClaimsSet`] when its `jti` or its `email` equals the
/// corresponding claims field; an entry may also carry its own expiry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AuthorizationEntry {
    /// Token identifier this entry authorizes.
    #[serde(default)]
    pub jti: Option<String>,

    /// Email address this entry authorizes.
    #[serde(default)]
    pub email: Option<String>,

    /// Entry expiry (Unix epoch seconds). Absent means never expires.
    #[serde(default)]
    pub expires: Option<i64>,
}

/// Directory document shape: `{ "entries": [...] }`.
///
/// Missing or malformed `entries` deserializes to an empty list rather than
/// an error, so any other document shape is treated as "no entries".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryDocument {
    /// Ordered authorization list. List order is significant: the first
    /// matching entry wins.
    #[serde(default)]
    pub entries: Vec<AuthorizationEntry>,
}

// =============================================================================
// Matcher
// =============================================================================

/// Resolve whether claims satisfy an authorization list.
///
/// The first entry whose `jti` equals the claims' `jti` or whose `email`
/// equals the claims' `email` is used; there is no precedence between the
/// two criteria beyond list order. Returns false when no entry matches or
/// when the matching entry has itself expired.
#[must_use]
pub fn is_authorized(claims: &ClaimsSet, entries: &[AuthorizationEntry], now: i64) -> bool {
    let matched = entries.iter().find(|entry| {
        (entry.jti.is_some() && entry.jti == claims.jti)
            || (entry.email.is_some() && entry.email == claims.email)
    });

    let Some(entry) = matched else {
        tracing::debug!(target: "gate.directory", "No matching directory entry for claims");
        return false;
    };

    if is_expired(entry.expires, now) {
        tracing::debug!(target: "gate.directory", "Matching directory entry has expired");
        return false;
    }

    true
}

// =============================================================================
// Directory Client
// =============================================================================

/// HTTP client for the authorization directory.
pub struct DirectoryClient {
    /// Resource location of the directory document.
    directory_url: String,

    /// HTTP client for fetching the document.
    http_client: reqwest::Client,
}

impl DirectoryClient {
    /// Create a new directory client with the default request timeout.
    #[must_use]
    pub fn new(directory_url: String) -> Self {
        Self::with_timeout(directory_url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a new directory client with a custom request timeout.
    #[must_use]
    pub fn with_timeout(directory_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gate.directory", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            directory_url,
            http_client,
        }
    }

    /// Fetch the authorization list. Never fails outward.
    ///
    /// A cache-busting `t=<now millis>` query parameter defeats intermediary
    /// caching. On network error, non-success status, or a malformed body,
    /// the failure is logged and the empty list is returned: nobody is
    /// authorized while the directory is unreachable.
    pub async fn fetch(&self) -> Vec<AuthorizationEntry> {
        tracing::debug!(
            target: "gate.directory",
            url = %self.directory_url,
            "Fetching authorization directory"
        );

        let response = match self
            .http_client
            .get(&self.directory_url)
            .query(&[("t", Utc::now().timestamp_millis())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(target: "gate.directory", error = %e, "Failed to fetch directory");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                target: "gate.directory",
                status = %response.status(),
                "Directory endpoint returned error"
            );
            return Vec::new();
        }

        match response.json::<DirectoryDocument>().await {
            Ok(document) => {
                tracing::debug!(
                    target: "gate.directory",
                    entry_count = document.entries.len(),
                    "Directory loaded"
                );
                document.entries
            }
            Err(e) => {
                tracing::warn!(target: "gate.directory", error = %e, "Failed to parse directory document");
                Vec::new()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
