//! Wire types exchanged with the external driver.
//!
//! Each invocation reads one JSON request from standard input and writes
//! one JSON result to standard output. Unknown fields are ignored so the
//! driver can pass its configuration through verbatim.

use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source-level configuration, passed verbatim from the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    /// Namespace partition for every lock this resource touches.
    /// Required; validated when the configuration is resolved.
    #[serde(default)]
    pub pool: Option<String>,

    /// Poll interval in seconds for the wait loops.
    #[serde(default = "default_wait_lock")]
    pub wait_lock: u64,

    /// Credentials for the external store client, exported into the
    /// process environment.
    #[serde(rename = "AWS_ACCESS_KEY_ID", default)]
    pub aws_access_key_id: Option<String>,

    #[serde(rename = "AWS_SECRET_ACCESS_KEY", default)]
    pub aws_secret_access_key: Option<String>,

    #[serde(rename = "AWS_DEFAULT_REGION", default = "default_region")]
    pub aws_default_region: String,

    /// Enable debug logging on stderr.
    #[serde(default)]
    pub debug: bool,

    /// Root directory of the record store.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            pool: None,
            wait_lock: default_wait_lock(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_default_region: default_region(),
            debug: false,
            store_dir: None,
        }
    }
}

fn default_wait_lock() -> u64 {
    10
}

fn default_region() -> String {
    "eu-west-1".to_string()
}

/// Request body for the `check` command.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub source: Source,

    /// The last version the driver has seen, if any.
    #[serde(default)]
    pub version: Option<Version>,
}

/// Request body for the `in` command.
#[derive(Debug, Clone, Deserialize)]
pub struct InRequest {
    #[serde(default)]
    pub source: Source,

    #[serde(default)]
    pub version: Option<Version>,

    #[serde(default)]
    pub params: InParams,
}

/// Params for the `in` command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InParams {
    /// Fetch this specific lock instead of the latest record in the pool.
    #[serde(default)]
    pub lock_name: Option<String>,

    /// Declared by the pipeline when the get expects an approval gate.
    /// The stored record decides whether a wait actually happens.
    #[serde(default)]
    pub need_approval: bool,

    /// Approval deadline in seconds, counted from the claim timestamp.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Request body for the `out` command.
#[derive(Debug, Clone, Deserialize)]
pub struct OutRequest {
    #[serde(default)]
    pub source: Source,

    #[serde(default)]
    pub params: OutParams,
}

/// Params for the `out` command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutParams {
    /// Name of the lock to claim or release. Required.
    #[serde(default)]
    pub lock_name: Option<String>,

    /// `"claim"` or `"release"`. Required.
    #[serde(default)]
    pub action: Option<String>,

    /// Require a human decision before dependents may proceed.
    #[serde(default)]
    pub need_approval: bool,

    /// Force-reject a pending approval before claiming, giving any
    /// in-flight waiter a hand-off window to observe the rejection.
    #[serde(default)]
    pub override_approval: bool,

    /// Free-form annotation stored at creation.
    #[serde(default)]
    pub description: Option<String>,
}

/// The action requested on the `out` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Claim,
    Release,
}

impl LockAction {
    /// Parse the driver-supplied action string.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "claim" => Some(LockAction::Claim),
            "release" => Some(LockAction::Release),
            _ => None,
        }
    }
}

/// One metadata entry in the driver result and the `metadata` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataPair {
    pub name: String,
    /// Null while the underlying field is unset.
    pub value: Option<String>,
}

impl MetadataPair {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Result body for the `in` and `out` commands.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceOutput {
    pub version: Version,
    pub metadata: Vec<MetadataPair>,
}
