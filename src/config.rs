//! Resolved per-invocation configuration.
//!
//! The source JSON and the CI environment are folded into one explicit
//! value here and handed to the state machine's constructor. Nothing in
//! the crate reads configuration through globals after this point; the
//! only environment writes are the AWS fields exported for the external
//! store client.

use crate::error::{GatelockError, Result};
use crate::machine::MachineConfig;
use crate::protocol::Source;
use crate::store::{DEFAULT_STORE_DIR, DirStore};
use std::path::PathBuf;
use std::time::Duration;

/// CI-provided team name; defaults to the literal `"team"` when unset.
pub const TEAM_ENV: &str = "BUILD_TEAM_NAME";

/// CI-provided pipeline name; defaults to the literal `"pipeline"`.
pub const PIPELINE_ENV: &str = "BUILD_PIPELINE_NAME";

/// Environment toggle that forces debug logging regardless of source
/// configuration.
pub const DEBUG_ENV: &str = "RESOURCE_DEBUG";

/// Everything one invocation needs, resolved up front.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub pool: String,
    pub wait_lock: Duration,
    pub team: String,
    pub pipeline: String,
    pub store_dir: PathBuf,
    pub debug: bool,
}

impl ResourceConfig {
    /// Resolve the configuration from the request source and the
    /// process environment.
    pub fn resolve(source: &Source) -> Result<Self> {
        let pool = source.pool.clone().ok_or_else(|| {
            GatelockError::Config("pool must exist in the source configuration".to_string())
        })?;

        Ok(Self {
            pool,
            wait_lock: Duration::from_secs(source.wait_lock),
            team: env_or(TEAM_ENV, "team"),
            pipeline: env_or(PIPELINE_ENV, "pipeline"),
            store_dir: source
                .store_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
            debug: source.debug || std::env::var_os(DEBUG_ENV).is_some(),
        })
    }

    /// Configuration slice the state machine takes.
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig::new(
            self.pool.clone(),
            self.wait_lock,
            self.team.clone(),
            self.pipeline.clone(),
        )
    }

    /// The record store this invocation talks to.
    pub fn store(&self) -> DirStore {
        DirStore::new(&self.store_dir)
    }
}

/// Export the AWS fields for the external store client.
pub fn export_aws_env(source: &Source) {
    // The process is still single-threaded here; the environment is
    // wired before any store work starts.
    unsafe {
        std::env::set_var(
            "AWS_ACCESS_KEY_ID",
            source.aws_access_key_id.as_deref().unwrap_or(""),
        );
        std::env::set_var(
            "AWS_SECRET_ACCESS_KEY",
            source.aws_secret_access_key.as_deref().unwrap_or(""),
        );
        std::env::set_var("AWS_DEFAULT_REGION", &source.aws_default_region);
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
