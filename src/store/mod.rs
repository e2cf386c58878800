//! The shared record store boundary.
//!
//! The state machine never talks to a concrete store directly; it goes
//! through [`LockStore`], which models exactly what the external store
//! offers: a range query over one pool partition, a full scan for
//! operator tooling, and an unconditional overwrite. Store failures are
//! fatal to the invocation — nothing at this layer retries.

mod dir;
mod memory;

pub use dir::{DEFAULT_STORE_DIR, DirStore};
pub use memory::MemoryStore;

use crate::lock::Lock;
use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be read or written.
    #[error("store i/o failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored record could not be decoded. Not skipped: a record that
    /// cannot be read could be a claimed lock.
    #[error("corrupt record at '{path}': {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Access to the shared lock records.
pub trait LockStore {
    /// All records in one pool partition, in no particular order.
    fn query_pool(&self, pool: &str) -> Result<Vec<Lock>, StoreError>;

    /// Every record across all pools. Operator tooling only.
    fn scan(&self) -> Result<Vec<Lock>, StoreError>;

    /// Unconditionally overwrite the record identified by
    /// `(lock.pool, lock.id)`. No concurrency token is checked; two
    /// concurrent writers of the same record clobber each other in
    /// timestamp order.
    fn put(&self, lock: &Lock) -> Result<(), StoreError>;
}
