//! Persisted session cache.
//!
//! A granted admission is cached in a single named storage slot so later
//! visits can be admitted without re-presenting the token in the page
//! location. The slot is a singleton: every save is a full overwrite, and
//! the record is deleted outright on expiry, corruption, or logout (no
//! tombstones).
//!
//! Storage itself is a capability: anything that can hold one string slot
//! implements [`SessionStore`]. The binary uses [`FileStore`]; tests inject
//! an in-memory store.

use crate::claims::{is_expired, ClaimsSet};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while touching the storage capability.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Underlying storage read or write failed.
    #[error("Session storage error: {0}")]
    Storage(String),
}

// =============================================================================
// Session Types
// =============================================================================

/// Cached admission outcome, as persisted in the session slot.
///
/// Field names (`token`, `payload`, `timestamp`, `exp`) are the on-disk
/// record shape; changing them invalidates existing sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// The original compact token string.
    pub token: String,

    /// Decoded claims captured at grant time.
    pub payload: ClaimsSet,

    /// Capture time (Unix epoch milliseconds).
    pub timestamp: i64,

    /// Expiry inherited from the claims (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Session {
    /// Read-only projection of this session for callers.
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.view_at(Utc::now().timestamp())
    }

    /// Deterministic projection against an explicit `now` timestamp.
    #[must_use]
    pub fn view_at(&self, now: i64) -> SessionView {
        SessionView {
            email: self.payload.email.clone(),
            subject: self.payload.sub.clone(),
            jti: self.payload.jti.clone(),
            expires: self
                .exp
                .and_then(|exp| Utc.timestamp_opt(exp, 0).single()),
            is_valid: !is_expired(self.exp, now),
        }
    }
}

/// Read-only view of the current session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionView {
    /// Holder email address from the cached claims.
    pub email: Option<String>,

    /// Subject identifier from the cached claims.
    pub subject: Option<String>,

    /// Token identifier from the cached claims.
    pub jti: Option<String>,

    /// Session expiry, if any.
    pub expires: Option<DateTime<Utc>>,

    /// Whether the session had expired at projection time.
    pub is_valid: bool,
}

// =============================================================================
// Storage Capability
// =============================================================================

/// Capability interface over the single session slot.
///
/// Implementations hold at most one record; `put` overwrites and `remove`
/// is idempotent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the raw record from the slot, if present.
    async fn get(&self) -> Result<Option<String>, StoreError>;

    /// Overwrite the slot with a raw record.
    async fn put(&self, record: &str) -> Result<(), StoreError>;

    /// Delete the slot. Removing an absent slot is not an error.
    async fn remove(&self) -> Result<(), StoreError>;
}

/// File-backed session slot used by the binary.
///
/// One JSON file standing in for the browser's local storage entry.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Storage(format!(
                "Failed to read session file: {e}"
            ))),
        }
    }

    async fn put(&self, record: &str) -> Result<(), StoreError> {
        tokio::fs::write(&self.path, record)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write session file: {e}")))
    }

    async fn remove(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!(
                "Failed to remove session file: {e}"
            ))),
        }
    }
}

// =============================================================================
// Session Cache
// =============================================================================

/// Owner of the singleton session slot.
///
/// All session reads and writes in the crate go through this cache; nothing
/// else touches the storage capability.
pub struct SessionCache {
    store: Box<dyn SessionStore>,
}

impl SessionCache {
    /// Create a cache over a storage capability.
    #[must_use]
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Load the persisted session, if one exists and is still valid.
    ///
    /// A record that fails to parse is deleted and treated as absent
    /// (self-healing); an expired record is likewise deleted and treated
    /// as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when the underlying storage read fails.
    pub async fn load(&self) -> Result<Option<Session>, StoreError> {
        self.load_at(Utc::now().timestamp()).await
    }

    /// Deterministic [`SessionCache::load`] against an explicit `now`.
    ///
    /// Prefer `load` in production code; this variant exists so that expiry
    /// boundaries can be tested without wall-clock dependence.
    pub async fn load_at(&self, now: i64) -> Result<Option<Session>, StoreError> {
        let Some(record) = self.store.get().await? else {
            return Ok(None);
        };

        let session: Session = match serde_json::from_str(&record) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(
                    target: "gate.session",
                    error = %e,
                    "Corrupt session record, deleting"
                );
                self.discard().await;
                return Ok(None);
            }
        };

        if is_expired(session.exp, now) {
            tracing::debug!(target: "gate.session", "Cached session expired, deleting");
            self.discard().await;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Overwrite the session slot with a freshly granted admission.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying storage write fails.
    pub async fn save(&self, token: &str, claims: &ClaimsSet) -> Result<(), StoreError> {
        self.save_at(token, claims, Utc::now().timestamp_millis())
            .await
    }

    /// Deterministic [`SessionCache::save`] with an explicit capture time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying storage write fails.
    pub async fn save_at(
        &self,
        token: &str,
        claims: &ClaimsSet,
        captured_at_millis: i64,
    ) -> Result<(), StoreError> {
        let session = Session {
            token: token.to_string(),
            payload: claims.clone(),
            timestamp: captured_at_millis,
            exp: claims.exp,
        };

        let record = serde_json::to_string(&session)
            .map_err(|e| StoreError::Storage(format!("Failed to encode session: {e}")))?;

        self.store.put(&record).await?;
        tracing::debug!(target: "gate.session", "Session saved");
        Ok(())
    }

    /// Delete the session slot unconditionally. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying storage delete fails.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove().await?;
        tracing::debug!(target: "gate.session", "Session cleared");
        Ok(())
    }

    /// Best-effort deletion used by self-healing paths.
    ///
    /// A slot that cannot be deleted is still treated as absent by the
    /// caller; the failure is only logged.
    async fn discard(&self) {
        if let Err(e) = self.store.remove().await {
            tracing::warn!(
                target: "gate.session",
                error = %e,
                "Failed to delete invalid session record"
            );
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
