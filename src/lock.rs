//! The lock record and its approval state.
//!
//! A `Lock` is the sole entity in the system. It is created on the first
//! claim of a never-before-seen `(pool, lockname)` pair and mutated in
//! place afterwards; released locks are retained forever so their
//! timestamps keep feeding the version-cursor history.

use crate::protocol::MetadataPair;
use crate::version;
use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Human decision on a claimed lock.
///
/// Only meaningful while the lock is claimed with `need_approval` set;
/// releasing a lock always resets it to `Pending`. Stored and rendered
/// as a nullable boolean (`null`/`true`/`false`), the shape operator
/// tooling and older records expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Approval {
    /// No decision yet.
    #[default]
    Pending,
    /// An operator approved the lock.
    Approved,
    /// An operator rejected the lock, or a waiter's deadline passed.
    Rejected,
}

impl Approval {
    /// Whether a decision is still outstanding.
    pub fn is_pending(self) -> bool {
        self == Approval::Pending
    }

    /// Metadata rendering: `None` while pending, otherwise the decision
    /// as a stringified boolean.
    pub fn as_metadata_value(self) -> Option<String> {
        match self {
            Approval::Pending => None,
            Approval::Approved => Some("true".to_string()),
            Approval::Rejected => Some("false".to_string()),
        }
    }
}

impl Serialize for Approval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Approval::Pending => serializer.serialize_none(),
            Approval::Approved => serializer.serialize_some(&true),
            Approval::Rejected => serializer.serialize_some(&false),
        }
    }
}

impl<'de> Deserialize<'de> for Approval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<bool>::deserialize(deserializer)? {
            None => Approval::Pending,
            Some(true) => Approval::Approved,
            Some(false) => Approval::Rejected,
        })
    }
}

/// A named lock record in the shared store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    /// Immutable identity, assigned at creation, never reused.
    pub id: String,

    /// Namespace partition; every query is scoped to one pool.
    pub pool: String,

    /// Logical name, unique within a pool.
    pub lockname: String,

    /// Last-mutation time; doubles as the version cursor. Treated as a
    /// monotonic logical clock, not wall-clock truth.
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub timestamp: DateTime<Utc>,

    /// True while a caller holds the lock.
    pub claimed: bool,

    /// Whether the claim requires a human decision before callers may
    /// proceed.
    #[serde(default)]
    pub need_approval: bool,

    /// The human decision; `Pending` while unset.
    #[serde(default)]
    pub approved: Approval,

    /// Provenance, set once at creation.
    pub team: String,

    /// Provenance, set once at creation.
    pub pipeline: String,

    /// Free-form annotation, set once at creation.
    #[serde(default)]
    pub description: Option<String>,
}

impl Lock {
    /// Create a freshly claimed lock record.
    ///
    /// Creation only ever happens on the first claim of a name, so the
    /// record starts out claimed with the approval decision pending.
    pub fn new(
        pool: impl Into<String>,
        lockname: impl Into<String>,
        team: impl Into<String>,
        pipeline: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pool: pool.into(),
            lockname: lockname.into(),
            timestamp: Utc::now(),
            claimed: true,
            need_approval: false,
            approved: Approval::Pending,
            team: team.into(),
            pipeline: pipeline.into(),
            description,
        }
    }

    /// Advance the last-mutation time.
    ///
    /// The timestamp is a logical clock: it must strictly increase on
    /// every write even when the wall clock has not moved past the
    /// previous write.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.timestamp = if now > self.timestamp {
            now
        } else {
            self.timestamp + chrono::Duration::microseconds(1)
        };
    }

    /// Render the record as driver metadata.
    ///
    /// One pair per field, in record order; booleans and the timestamp
    /// are serialized as strings, unset values as null.
    pub fn metadata(&self) -> Vec<MetadataPair> {
        vec![
            MetadataPair::new("id", Some(self.id.clone())),
            MetadataPair::new("lockname", Some(self.lockname.clone())),
            MetadataPair::new("pool", Some(self.pool.clone())),
            MetadataPair::new("timestamp", Some(version::encode_timestamp(self.timestamp))),
            MetadataPair::new("claimed", Some(self.claimed.to_string())),
            MetadataPair::new("need_approval", Some(self.need_approval.to_string())),
            MetadataPair::new("approved", self.approved.as_metadata_value()),
            MetadataPair::new("team", Some(self.team.clone())),
            MetadataPair::new("pipeline", Some(self.pipeline.clone())),
            MetadataPair::new("description", self.description.clone()),
        ]
    }
}
