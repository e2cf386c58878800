//! Directory-backed record store.
//!
//! One JSON document per record at `<root>/<pool>/<id>.json`. Writes go
//! through a temp file in the same directory followed by an atomic
//! rename, so readers never observe a half-written record. The root is
//! shared between invocations; the filesystem provides the
//! read-your-writes consistency the coordination protocol assumes.

use super::{LockStore, StoreError};
use crate::lock::Lock;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default store root when the source configuration names none.
pub const DEFAULT_STORE_DIR: &str = "/var/lib/gatelock";

/// A record store rooted at a shared directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pool_dir(&self, pool: &str) -> PathBuf {
        self.root.join(pool)
    }

    fn record_path(&self, pool: &str, id: &str) -> PathBuf {
        self.pool_dir(pool).join(format!("{}.json", id))
    }

    fn read_record(path: &Path) -> Result<Lock, StoreError> {
        let content = fs::read(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&content).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn read_pool_dir(dir: &Path, records: &mut Vec<Lock>) -> Result<(), StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            // A pool that has never seen a claim has no directory yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                });
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            // Skip in-flight temp files and anything else that is not a record.
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            records.push(Self::read_record(&path)?);
        }

        Ok(())
    }
}

impl LockStore for DirStore {
    fn query_pool(&self, pool: &str) -> Result<Vec<Lock>, StoreError> {
        let mut records = Vec::new();
        Self::read_pool_dir(&self.pool_dir(pool), &mut records)?;
        Ok(records)
    }

    fn scan(&self) -> Result<Vec<Lock>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source: e,
                });
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io {
                path: self.root.clone(),
                source: e,
            })?;
            if entry.path().is_dir() {
                Self::read_pool_dir(&entry.path(), &mut records)?;
            }
        }
        Ok(records)
    }

    fn put(&self, lock: &Lock) -> Result<(), StoreError> {
        let target = self.record_path(&lock.pool, &lock.id);
        let pool_dir = self.pool_dir(&lock.pool);
        fs::create_dir_all(&pool_dir).map_err(|e| StoreError::Io {
            path: pool_dir.clone(),
            source: e,
        })?;

        let content = serde_json::to_vec_pretty(lock).map_err(|e| StoreError::Corrupt {
            path: target.clone(),
            source: e,
        })?;

        // Write-then-rename keeps concurrent readers off partial records.
        let temp = pool_dir.join(format!(".{}.json.tmp", lock.id));
        write_and_sync(&temp, &content)?;
        fs::rename(&temp, &target).map_err(|e| {
            let _ = fs::remove_file(&temp);
            StoreError::Io {
                path: target.clone(),
                source: e,
            }
        })?;

        Ok(())
    }
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let io_err = |e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            io_err(e)
        })?;
    Ok(())
}
