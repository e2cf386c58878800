//! The `in` command: fetch a lock for a dependent job.
//!
//! With a `lock_name` param the named lock is fetched and a pending
//! approval is waited out; otherwise the latest record past the request
//! version is fetched as a plain lock. Finding nothing is a no-op, not
//! a failure — the driver gets a clean exit and no output files.

use super::{Outcome, resource_output, to_response, write_outputs};
use crate::config::{self, ResourceConfig};
use crate::error::{GatelockError, Result};
use crate::logging;
use crate::machine::{FetchRequest, LockMachine};
use crate::protocol::InRequest;
use crate::repository::LockRepository;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub(crate) fn run(target_dir: &Path, input: &str) -> Result<Outcome> {
    let request: InRequest = serde_json::from_str(input)
        .map_err(|e| GatelockError::Config(format!("invalid in request: {}", e)))?;

    let resource = ResourceConfig::resolve(&request.source)?;
    logging::init(resource.debug);
    config::export_aws_env(&request.source);

    let cursor = match &request.version {
        Some(version) => Some(version.to_datetime()?),
        None => None,
    };
    if request.params.need_approval {
        debug!("the get declares an approval gate");
    }

    let machine = LockMachine::new(LockRepository::new(resource.store()), resource.machine_config());
    let fetch = FetchRequest {
        lock_name: request.params.lock_name.clone(),
        cursor,
        timeout: request.params.timeout.map(Duration::from_secs),
    };

    match machine.fetch(&fetch)? {
        Some(lock) => {
            write_outputs(target_dir, &lock)?;
            to_response(&resource_output(&lock))
        }
        None => Ok(Outcome::NoOp),
    }
}
