//! The `check` command: detect new versions.
//!
//! Returns the timestamps of every record in the pool strictly newer
//! than the incoming cursor, oldest first, each as an independent
//! candidate version. With nothing newer, the input cursor is echoed
//! back so the scheduler always has at least one stable version to
//! converge on.

use super::Outcome;
use crate::config::{self, ResourceConfig};
use crate::error::{GatelockError, Result};
use crate::logging;
use crate::protocol::CheckRequest;
use crate::repository::LockRepository;
use crate::version::Version;
use tracing::debug;

pub(crate) fn run(input: &str) -> Result<Outcome> {
    let request: CheckRequest = serde_json::from_str(input)
        .map_err(|e| GatelockError::Config(format!("invalid check request: {}", e)))?;

    let resource = ResourceConfig::resolve(&request.source)?;
    logging::init(resource.debug);
    config::export_aws_env(&request.source);

    let cursor_version = request.version.clone().unwrap_or_else(Version::epoch);
    let cursor = cursor_version.to_datetime()?;
    debug!("checking pool {} since {}", resource.pool, cursor);

    let repo = LockRepository::new(resource.store());
    let mut versions: Vec<Version> = repo
        .find_since(&resource.pool, cursor)?
        .iter()
        .map(|lock| Version::from_datetime(lock.timestamp))
        .collect();

    if versions.is_empty() {
        versions.push(cursor_version);
    }
    debug!("found {} version(s)", versions.len());

    let value = serde_json::to_value(&versions)
        .map_err(|e| GatelockError::Output(format!("failed to serialize result: {}", e)))?;
    Ok(Outcome::Response(value))
}
