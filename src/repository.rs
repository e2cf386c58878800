//! Query layer over the record store.
//!
//! Exactly the three access patterns the state machine needs, plus the
//! by-identity lookup the operator tool uses. All policy (waiting,
//! claiming, approval) lives above this layer.

use crate::lock::Lock;
use crate::store::{LockStore, StoreError};
use chrono::{DateTime, Utc};

/// Thin repository over a [`LockStore`].
#[derive(Debug)]
pub struct LockRepository<S> {
    store: S,
}

impl<S: LockStore> LockRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The single most-recent record for a name, or `None` if the name
    /// was never claimed.
    ///
    /// Should the store ever hold several records for one name, the most
    /// recent by timestamp wins — older ones are ignored, not repaired.
    pub fn find_by_name(&self, pool: &str, lockname: &str) -> Result<Option<Lock>, StoreError> {
        Ok(self
            .store
            .query_pool(pool)?
            .into_iter()
            .filter(|lock| lock.lockname == lockname)
            .max_by_key(|lock| lock.timestamp))
    }

    /// All records in the pool strictly newer than `cursor`, ordered by
    /// timestamp ascending.
    pub fn find_since(&self, pool: &str, cursor: DateTime<Utc>) -> Result<Vec<Lock>, StoreError> {
        let mut records: Vec<Lock> = self
            .store
            .query_pool(pool)?
            .into_iter()
            .filter(|lock| lock.timestamp > cursor)
            .collect();
        records.sort_by_key(|lock| lock.timestamp);
        Ok(records)
    }

    /// Lookup by immutable identity across all pools. Operator path.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Lock>, StoreError> {
        Ok(self.store.scan()?.into_iter().find(|lock| lock.id == id))
    }

    /// All currently claimed records across all pools. Operator path.
    pub fn find_claimed(&self) -> Result<Vec<Lock>, StoreError> {
        let mut records: Vec<Lock> = self
            .store
            .scan()?
            .into_iter()
            .filter(|lock| lock.claimed)
            .collect();
        records.sort_by(|a, b| (&a.pool, &a.lockname).cmp(&(&b.pool, &b.lockname)));
        Ok(records)
    }

    /// Unconditional overwrite of the record identified by `lock.id`.
    pub fn save(&self, lock: &Lock) -> Result<(), StoreError> {
        self.store.put(lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn repository() -> LockRepository<MemoryStore> {
        LockRepository::new(MemoryStore::new())
    }

    fn lock_at(name: &str, offset_secs: i64) -> Lock {
        let mut lock = Lock::new("ci", name, "team", "pipeline", None);
        lock.timestamp = Utc::now() + Duration::seconds(offset_secs);
        lock
    }

    #[test]
    fn find_by_name_returns_none_for_unknown_name() {
        let repo = repository();
        assert!(repo.find_by_name("ci", "build-gate").unwrap().is_none());
    }

    #[test]
    fn find_by_name_picks_most_recent_record() {
        let repo = repository();
        let older = lock_at("build-gate", -60);
        let newer = lock_at("build-gate", 0);
        repo.save(&older).unwrap();
        repo.save(&newer).unwrap();

        let found = repo.find_by_name("ci", "build-gate").unwrap().unwrap();
        assert_eq!(found.id, newer.id);
    }

    #[test]
    fn find_since_is_strictly_greater_and_ascending() {
        let repo = repository();
        let first = lock_at("a", -20);
        let second = lock_at("b", -10);
        let third = lock_at("c", 0);
        repo.save(&third).unwrap();
        repo.save(&first).unwrap();
        repo.save(&second).unwrap();

        // A cursor equal to a record's timestamp excludes that record.
        let since = repo.find_since("ci", first.timestamp).unwrap();
        let names: Vec<&str> = since.iter().map(|l| l.lockname.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn find_since_is_scoped_to_the_pool() {
        let repo = repository();
        let mut other_pool = lock_at("a", 0);
        other_pool.pool = "staging".to_string();
        repo.save(&other_pool).unwrap();

        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert!(repo.find_since("ci", epoch).unwrap().is_empty());
    }

    #[test]
    fn find_by_id_searches_all_pools() {
        let repo = repository();
        let mut lock = lock_at("a", 0);
        lock.pool = "staging".to_string();
        repo.save(&lock).unwrap();

        let found = repo.find_by_id(&lock.id).unwrap().unwrap();
        assert_eq!(found.lockname, "a");
        assert!(repo.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn find_claimed_filters_and_sorts() {
        let repo = repository();
        let claimed = lock_at("b-gate", 0);
        let mut released = lock_at("a-gate", 0);
        released.claimed = false;
        let mut other = lock_at("a-gate", 0);
        other.pool = "staging".to_string();
        repo.save(&claimed).unwrap();
        repo.save(&released).unwrap();
        repo.save(&other).unwrap();

        let listed = repo.find_claimed().unwrap();
        let keys: Vec<(&str, &str)> = listed
            .iter()
            .map(|l| (l.pool.as_str(), l.lockname.as_str()))
            .collect();
        assert_eq!(keys, vec![("ci", "b-gate"), ("staging", "a-gate")]);
    }
}
