//! In-memory session store for tests.

use async_trait::async_trait;
use gate_service::session::{SessionStore, StoreError};
use std::sync::{Arc, Mutex};

/// In-memory single-slot store.
///
/// Clones share the same slot, so a test can hold one handle for
/// assertions while the cache under test owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the raw record, bypassing the `SessionStore` interface.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    /// Write a raw record, bypassing the `SessionStore` interface.
    /// Useful for planting corrupt or hand-crafted session records.
    pub fn set_raw(&self, record: &str) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(record.to_string());
        }
    }

    /// Make subsequent `put` and `remove` calls fail.
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    fn writes_failing(&self) -> bool {
        self.fail_writes.lock().map(|flag| *flag).unwrap_or(false)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self.raw())
    }

    async fn put(&self, record: &str) -> Result<(), StoreError> {
        if self.writes_failing() {
            return Err(StoreError::Storage("simulated write failure".to_string()));
        }
        self.set_raw(record);
        Ok(())
    }

    async fn remove(&self) -> Result<(), StoreError> {
        if self.writes_failing() {
            return Err(StoreError::Storage("simulated remove failure".to_string()));
        }
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}
