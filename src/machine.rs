//! The lock state machine.
//!
//! Everything a single invocation does to a lock goes through here:
//! claiming (including the forced-rejection hand-off), releasing, and
//! the fetch path that waits out a pending approval. The machine runs
//! one operation to completion in one sequential flow — all concurrency
//! lives *between* invocations, which contend on the shared store.
//!
//! Mutations are read-modify-overwrite with no concurrency token. The
//! protocol assumes the invoking system does not run two claims for the
//! same name at the same instant outside the designed hand-off window.

use crate::error::{GatelockError, Result};
use crate::lock::{Approval, Lock};
use crate::poll::{self, Polled};
use crate::repository::LockRepository;
use crate::store::LockStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tracing::{debug, info};

/// Extra pause appended to the hand-off delay after a forced rejection.
pub const DEFAULT_HANDOFF_GRACE: Duration = Duration::from_secs(5);

/// Per-invocation configuration for the state machine.
///
/// There is deliberately no process-global state: the driver resolves
/// this once per invocation and hands it to the constructor.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Namespace partition every operation is scoped to.
    pub pool: String,

    /// Poll interval for the wait loops.
    pub wait_lock: Duration,

    /// Provenance recorded on locks created by this invocation.
    pub team: String,
    pub pipeline: String,

    /// Extra hand-off pause after a forced rejection, on top of one
    /// poll interval. The binaries always use the default; tests
    /// compress it.
    pub handoff_grace: Duration,
}

impl MachineConfig {
    pub fn new(
        pool: impl Into<String>,
        wait_lock: Duration,
        team: impl Into<String>,
        pipeline: impl Into<String>,
    ) -> Self {
        Self {
            pool: pool.into(),
            wait_lock,
            team: team.into(),
            pipeline: pipeline.into(),
            handoff_grace: DEFAULT_HANDOFF_GRACE,
        }
    }
}

/// Parameters for a claim.
#[derive(Debug, Clone, Default)]
pub struct AcquireRequest {
    pub lock_name: String,
    pub need_approval: bool,
    pub override_approval: bool,
    pub description: Option<String>,
}

/// Parameters for the fetch path.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    /// Fetch this lock, waiting out a pending approval if the record
    /// requires one.
    pub lock_name: Option<String>,

    /// Plain-lock mode: with no name, the latest record strictly newer
    /// than this cursor is fetched with no approval semantics.
    pub cursor: Option<DateTime<Utc>>,

    /// Approval deadline, counted from the claim timestamp.
    pub timeout: Option<Duration>,
}

/// The claim/approval state machine over one pool.
#[derive(Debug)]
pub struct LockMachine<S> {
    repo: LockRepository<S>,
    config: MachineConfig,
}

impl<S: LockStore> LockMachine<S> {
    pub fn new(repo: LockRepository<S>, config: MachineConfig) -> Self {
        Self { repo, config }
    }

    /// Claim a lock, creating it on first use.
    ///
    /// If the lock is already claimed, blocks until its holder releases
    /// it. With `override_approval`, any pending approval is forcibly
    /// rejected first and the call pauses for one poll interval plus the
    /// hand-off grace, giving an in-flight approval waiter time to
    /// observe the rejection, fail its job, and release the lock before
    /// this caller proceeds.
    pub fn acquire(&self, request: &AcquireRequest) -> Result<Lock> {
        let mut current = self
            .repo
            .find_by_name(&self.config.pool, &request.lock_name)?;

        if request.override_approval
            && let Some(lock) = current.as_mut()
        {
            lock.approved = Approval::Rejected;
            lock.touch();
            self.repo.save(lock)?;
            info!(
                "forced a rejection on the lock {}, pausing for in-flight waiters",
                request.lock_name
            );
            std::thread::sleep(self.config.wait_lock + self.config.handoff_grace);
        }

        let lock = match current {
            Some(lock) => {
                let mut lock = if lock.claimed {
                    self.wait_for_release(&request.lock_name, lock)?
                } else {
                    lock
                };
                // A request can raise the approval requirement but never
                // lower one already on the record.
                if request.need_approval {
                    lock.need_approval = true;
                }
                lock.claimed = true;
                lock.approved = Approval::Pending;
                lock.touch();
                lock
            }
            None => {
                let mut lock = Lock::new(
                    self.config.pool.clone(),
                    request.lock_name.clone(),
                    self.config.team.clone(),
                    self.config.pipeline.clone(),
                    request.description.clone(),
                );
                lock.need_approval = request.need_approval;
                lock
            }
        };

        self.repo.save(&lock)?;
        info!("claimed the lock {}", lock.lockname);
        Ok(lock)
    }

    /// Release a lock.
    ///
    /// Releasing always resets the approval decision; a lock that was
    /// never claimed cannot be released.
    pub fn release(&self, lock_name: &str) -> Result<Lock> {
        let mut lock = self
            .repo
            .find_by_name(&self.config.pool, lock_name)?
            .ok_or_else(|| {
                GatelockError::NotFound(format!("the lock '{}' does not exist", lock_name))
            })?;

        lock.claimed = false;
        lock.approved = Approval::Pending;
        lock.touch();
        self.repo.save(&lock)?;
        info!("released the lock {}", lock_name);
        Ok(lock)
    }

    /// Fetch a lock for a dependent job, waiting out a pending approval.
    ///
    /// Returns `Ok(None)` when there is nothing to fetch — that is a
    /// no-op for the driver, not a failure. A rejected or timed-out
    /// approval releases the lock and fails the operation.
    pub fn fetch(&self, request: &FetchRequest) -> Result<Option<Lock>> {
        match &request.lock_name {
            Some(lock_name) => {
                let Some(lock) = self.repo.find_by_name(&self.config.pool, lock_name)? else {
                    info!("no lock has been found");
                    return Ok(None);
                };

                if lock.need_approval && lock.approved.is_pending() {
                    return self.await_approval(lock, request.timeout).map(Some);
                }
                Ok(Some(lock))
            }
            None => {
                // Plain-lock mode: newest record past the cursor, no
                // approval semantics.
                let cursor = request.cursor.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
                let latest = self.repo.find_since(&self.config.pool, cursor)?.pop();
                if latest.is_none() {
                    info!("no lock has been found");
                }
                Ok(latest)
            }
        }
    }

    /// Block until the lock is observed unclaimed.
    fn wait_for_release(&self, lock_name: &str, current: Lock) -> Result<Lock> {
        info!("the lock {} is already claimed", lock_name);

        let outcome = poll::wait_until(
            current,
            self.config.wait_lock,
            None,
            || {
                debug!("re-reading the lock {}", lock_name);
                self.repo
                    .find_by_name(&self.config.pool, lock_name)?
                    .ok_or_else(|| {
                        GatelockError::NotFound(format!(
                            "the lock '{}' disappeared while waiting for its release",
                            lock_name
                        ))
                    })
            },
            |lock: &Lock| !lock.claimed,
        )?;

        // No deadline was supplied, so the wait can only end satisfied.
        let (Polled::Satisfied(lock) | Polled::Expired(lock)) = outcome;
        Ok(lock)
    }

    /// Block until the pending approval is decided.
    ///
    /// With a timeout, the deadline is the claim timestamp plus the
    /// timeout; once it passes, a rejection is synthesized for that
    /// cycle's observation regardless of the stored value.
    fn await_approval(&self, lock: Lock, timeout: Option<Duration>) -> Result<Lock> {
        let lock_name = lock.lockname.clone();
        let deadline = match timeout {
            Some(timeout) => {
                let timeout = ChronoDuration::from_std(timeout).map_err(|_| {
                    GatelockError::Config(format!("timeout of {:?} is out of range", timeout))
                })?;
                Some(lock.timestamp + timeout)
            }
            None => None,
        };

        info!("the lock {} is waiting for an approval", lock_name);

        let outcome = poll::wait_until(
            lock,
            self.config.wait_lock,
            deadline,
            || {
                if let Some(deadline) = deadline {
                    let remaining = deadline - Utc::now();
                    if remaining > ChronoDuration::zero() {
                        info!(
                            "the lock {} has {}s left before the approval deadline",
                            lock_name,
                            remaining.num_seconds()
                        );
                    }
                }
                self.repo
                    .find_by_name(&self.config.pool, &lock_name)?
                    .ok_or_else(|| {
                        GatelockError::NotFound(format!(
                            "the lock '{}' disappeared while waiting for an approval",
                            lock_name
                        ))
                    })
            },
            |lock: &Lock| !lock.approved.is_pending(),
        )?;

        let (rejected, lock) = match outcome {
            Polled::Satisfied(lock) => (lock.approved == Approval::Rejected, lock),
            Polled::Expired(lock) => (true, lock),
        };

        if rejected {
            info!("the lock {} has not been approved, releasing it", lock_name);
            let mut lock = lock;
            lock.claimed = false;
            lock.approved = Approval::Pending;
            lock.touch();
            self.repo.save(&lock)?;
            return Err(GatelockError::Rejected(lock_name));
        }

        Ok(lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Instant;

    const FAST_POLL: Duration = Duration::from_millis(5);

    fn machine(store: &MemoryStore) -> LockMachine<MemoryStore> {
        let mut config = MachineConfig::new("ci", FAST_POLL, "team", "pipeline");
        config.handoff_grace = Duration::from_millis(100);
        LockMachine::new(LockRepository::new(store.clone()), config)
    }

    fn claim(request_name: &str) -> AcquireRequest {
        AcquireRequest {
            lock_name: request_name.to_string(),
            ..AcquireRequest::default()
        }
    }

    fn store_repo(store: &MemoryStore) -> LockRepository<MemoryStore> {
        LockRepository::new(store.clone())
    }

    #[test]
    fn first_claim_creates_a_claimed_record() {
        let store = MemoryStore::new();
        let machine = machine(&store);

        let lock = machine
            .acquire(&AcquireRequest {
                lock_name: "build-gate".to_string(),
                need_approval: true,
                override_approval: false,
                description: Some("deploy window".to_string()),
            })
            .unwrap();

        assert!(lock.claimed);
        assert!(lock.need_approval);
        assert!(lock.approved.is_pending());
        assert_eq!(lock.team, "team");
        assert_eq!(lock.pipeline, "pipeline");
        assert_eq!(lock.description.as_deref(), Some("deploy window"));

        let stored = store_repo(&store)
            .find_by_name("ci", "build-gate")
            .unwrap()
            .unwrap();
        assert_eq!(stored, lock);
    }

    #[test]
    fn reclaim_preserves_identity_and_advances_timestamp() {
        let store = MemoryStore::new();
        let machine = machine(&store);

        let first = machine.acquire(&claim("build-gate")).unwrap();
        machine.release("build-gate").unwrap();
        let second = machine.acquire(&claim("build-gate")).unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.timestamp > first.timestamp);
        assert_eq!(store_repo(&store).find_claimed().unwrap().len(), 1);
    }

    #[test]
    fn release_resets_claim_and_approval() {
        let store = MemoryStore::new();
        let machine = machine(&store);

        let mut lock = machine
            .acquire(&AcquireRequest {
                lock_name: "build-gate".to_string(),
                need_approval: true,
                ..AcquireRequest::default()
            })
            .unwrap();

        // An operator decision lands, then the holder releases.
        lock.approved = Approval::Approved;
        lock.touch();
        store_repo(&store).save(&lock).unwrap();

        machine.release("build-gate").unwrap();

        let stored = store_repo(&store)
            .find_by_name("ci", "build-gate")
            .unwrap()
            .unwrap();
        assert!(!stored.claimed);
        assert!(stored.approved.is_pending());
    }

    #[test]
    fn release_of_unknown_name_is_not_found() {
        let store = MemoryStore::new();
        let err = machine(&store).release("never-claimed").unwrap_err();
        assert!(matches!(err, GatelockError::NotFound(_)));
    }

    #[test]
    fn second_claim_waits_for_the_first_release() {
        let store = MemoryStore::new();
        let machine = machine(&store);

        let holder = machine.acquire(&claim("build-gate")).unwrap();

        let releaser = {
            let store = store.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                let repo = LockRepository::new(store);
                let mut lock = repo.find_by_name("ci", "build-gate").unwrap().unwrap();
                lock.claimed = false;
                lock.approved = Approval::Pending;
                lock.touch();
                repo.save(&lock).unwrap();
            })
        };

        let started = Instant::now();
        let reclaimed = machine.acquire(&claim("build-gate")).unwrap();
        releaser.join().unwrap();

        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(reclaimed.id, holder.id);
        assert!(reclaimed.claimed);
    }

    #[test]
    fn claim_fails_when_the_lock_disappears_mid_wait() {
        let store = MemoryStore::new();
        let machine = machine(&store);

        let lock = machine.acquire(&claim("build-gate")).unwrap();

        let remover = {
            let store = store.clone();
            let id = lock.id.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                store.remove("ci", &id);
            })
        };

        let err = machine.acquire(&claim("build-gate")).unwrap_err();
        remover.join().unwrap();
        assert!(matches!(err, GatelockError::NotFound(_)));
    }

    #[test]
    fn override_rejection_is_observable_during_the_handoff_pause() {
        let store = MemoryStore::new();
        let machine = machine(&store);

        machine
            .acquire(&AcquireRequest {
                lock_name: "build-gate".to_string(),
                need_approval: true,
                ..AcquireRequest::default()
            })
            .unwrap();

        let overrider = {
            let store = store.clone();
            std::thread::spawn(move || {
                let mut config = MachineConfig::new("ci", FAST_POLL, "team", "pipeline");
                config.handoff_grace = Duration::from_millis(100);
                let machine = LockMachine::new(LockRepository::new(store), config);
                machine.acquire(&AcquireRequest {
                    lock_name: "build-gate".to_string(),
                    need_approval: true,
                    override_approval: true,
                    ..AcquireRequest::default()
                })
            })
        };

        // Inside the hand-off window the forced rejection is already
        // visible while the previous holder still owns the claim.
        std::thread::sleep(Duration::from_millis(50));
        let repo = store_repo(&store);
        let observed = repo.find_by_name("ci", "build-gate").unwrap().unwrap();
        assert_eq!(observed.approved, Approval::Rejected);
        assert!(observed.claimed);

        // Play the part of the waiter that saw the rejection and bailed.
        let mut released = observed;
        released.claimed = false;
        released.approved = Approval::Pending;
        released.touch();
        repo.save(&released).unwrap();

        let reclaimed = overrider.join().unwrap().unwrap();
        assert!(reclaimed.claimed);
        assert!(reclaimed.approved.is_pending());
    }

    #[test]
    fn fetch_without_approval_requirement_never_waits() {
        let store = MemoryStore::new();
        let machine = machine(&store);
        let lock = machine.acquire(&claim("build-gate")).unwrap();

        let started = Instant::now();
        let fetched = machine
            .fetch(&FetchRequest {
                lock_name: Some("build-gate".to_string()),
                ..FetchRequest::default()
            })
            .unwrap()
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(fetched, lock);
    }

    #[test]
    fn fetch_blocks_until_the_approval_lands() {
        let store = MemoryStore::new();
        let machine = machine(&store);
        machine
            .acquire(&AcquireRequest {
                lock_name: "build-gate".to_string(),
                need_approval: true,
                ..AcquireRequest::default()
            })
            .unwrap();

        let approver = {
            let store = store.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                let repo = LockRepository::new(store);
                let mut lock = repo.find_by_name("ci", "build-gate").unwrap().unwrap();
                lock.approved = Approval::Approved;
                lock.touch();
                repo.save(&lock).unwrap();
            })
        };

        let fetched = machine
            .fetch(&FetchRequest {
                lock_name: Some("build-gate".to_string()),
                ..FetchRequest::default()
            })
            .unwrap()
            .unwrap();
        approver.join().unwrap();

        assert_eq!(fetched.approved, Approval::Approved);
        assert!(fetched.claimed);
    }

    #[test]
    fn fetch_rejection_releases_the_lock_and_fails() {
        let store = MemoryStore::new();
        let machine = machine(&store);
        machine
            .acquire(&AcquireRequest {
                lock_name: "build-gate".to_string(),
                need_approval: true,
                ..AcquireRequest::default()
            })
            .unwrap();

        let rejecter = {
            let store = store.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                let repo = LockRepository::new(store);
                let mut lock = repo.find_by_name("ci", "build-gate").unwrap().unwrap();
                lock.approved = Approval::Rejected;
                lock.touch();
                repo.save(&lock).unwrap();
            })
        };

        let err = machine
            .fetch(&FetchRequest {
                lock_name: Some("build-gate".to_string()),
                ..FetchRequest::default()
            })
            .unwrap_err();
        rejecter.join().unwrap();

        assert!(matches!(err, GatelockError::Rejected(_)));
        let stored = store_repo(&store)
            .find_by_name("ci", "build-gate")
            .unwrap()
            .unwrap();
        assert!(!stored.claimed);
        assert!(stored.approved.is_pending());
    }

    #[test]
    fn fetch_timeout_synthesizes_a_rejection_at_or_after_the_deadline() {
        let store = MemoryStore::new();
        let machine = machine(&store);
        let claimed = machine
            .acquire(&AcquireRequest {
                lock_name: "build-gate".to_string(),
                need_approval: true,
                ..AcquireRequest::default()
            })
            .unwrap();

        let timeout = Duration::from_millis(150);
        let err = machine
            .fetch(&FetchRequest {
                lock_name: Some("build-gate".to_string()),
                timeout: Some(timeout),
                ..FetchRequest::default()
            })
            .unwrap_err();

        assert!(matches!(err, GatelockError::Rejected(_)));
        // Never before the deadline, measured from the claim timestamp.
        let deadline = claimed.timestamp + ChronoDuration::from_std(timeout).unwrap();
        assert!(Utc::now() >= deadline);

        let stored = store_repo(&store)
            .find_by_name("ci", "build-gate")
            .unwrap()
            .unwrap();
        assert!(!stored.claimed);
        assert!(stored.approved.is_pending());
    }

    #[test]
    fn fetch_without_name_returns_the_latest_record_past_the_cursor() {
        let store = MemoryStore::new();
        let machine = machine(&store);

        let older = machine.acquire(&claim("alpha")).unwrap();
        let newer = machine.acquire(&claim("beta")).unwrap();

        let fetched = machine
            .fetch(&FetchRequest {
                cursor: Some(older.timestamp),
                ..FetchRequest::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, newer.id);

        let nothing = machine
            .fetch(&FetchRequest {
                cursor: Some(newer.timestamp),
                ..FetchRequest::default()
            })
            .unwrap();
        assert!(nothing.is_none());
    }

    #[test]
    fn fetch_without_name_skips_approval_semantics() {
        let store = MemoryStore::new();
        let machine = machine(&store);
        machine
            .acquire(&AcquireRequest {
                lock_name: "build-gate".to_string(),
                need_approval: true,
                ..AcquireRequest::default()
            })
            .unwrap();

        let started = Instant::now();
        let fetched = machine.fetch(&FetchRequest::default()).unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(fetched.approved.is_pending());
    }

    #[test]
    fn fetch_of_unknown_name_is_a_no_op() {
        let store = MemoryStore::new();
        let machine = machine(&store);
        let fetched = machine
            .fetch(&FetchRequest {
                lock_name: Some("never-claimed".to_string()),
                ..FetchRequest::default()
            })
            .unwrap();
        assert!(fetched.is_none());
    }
}
