//! In-memory record store.
//!
//! Shared-handle store used by unit tests and embedding callers. Clones
//! share the same underlying map, so one handle can mutate records while
//! another is polling them — the same shape the real store presents to
//! concurrently scheduled invocations.

use super::{LockStore, StoreError};
use crate::lock::Lock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A lock store backed by a mutexed map keyed on `(pool, id)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<(String, String), Lock>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a record entirely.
    ///
    /// The protocol itself never deletes; this exists so tests can
    /// simulate a name vanishing from the namespace underneath a waiter.
    pub fn remove(&self, pool: &str, id: &str) {
        self.records()
            .remove(&(pool.to_string(), id.to_string()));
    }

    fn records(&self) -> MutexGuard<'_, HashMap<(String, String), Lock>> {
        // A poisoned mutex only means another test thread panicked while
        // holding it; the map itself is still usable.
        self.records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl LockStore for MemoryStore {
    fn query_pool(&self, pool: &str) -> Result<Vec<Lock>, StoreError> {
        Ok(self
            .records()
            .iter()
            .filter(|((record_pool, _), _)| record_pool == pool)
            .map(|(_, lock)| lock.clone())
            .collect())
    }

    fn scan(&self) -> Result<Vec<Lock>, StoreError> {
        Ok(self.records().values().cloned().collect())
    }

    fn put(&self, lock: &Lock) -> Result<(), StoreError> {
        self.records()
            .insert((lock.pool.clone(), lock.id.clone()), lock.clone());
        Ok(())
    }
}
