//! The `out` command: claim or release a lock.
//!
//! `lock_name` and `action` are mandatory; anything else about the
//! request is optional. A claim on a held lock blocks until the holder
//! releases it, so this command can legitimately run for a long time.

use super::{Outcome, resource_output, to_response, write_outputs};
use crate::config::{self, ResourceConfig};
use crate::error::{GatelockError, Result};
use crate::logging;
use crate::machine::{AcquireRequest, LockMachine};
use crate::protocol::{LockAction, OutRequest};
use crate::repository::LockRepository;
use std::path::Path;

pub(crate) fn run(target_dir: &Path, input: &str) -> Result<Outcome> {
    let request: OutRequest = serde_json::from_str(input)
        .map_err(|e| GatelockError::Config(format!("invalid out request: {}", e)))?;

    let resource = ResourceConfig::resolve(&request.source)?;
    logging::init(resource.debug);
    config::export_aws_env(&request.source);

    let lock_name = request
        .params
        .lock_name
        .clone()
        .ok_or_else(|| GatelockError::Config("you must set a lock_name on params".to_string()))?;
    let action = request
        .params
        .action
        .as_deref()
        .ok_or_else(|| GatelockError::Config("you must set an action on params".to_string()))?;
    let action = LockAction::parse(action).ok_or_else(|| {
        GatelockError::Config(format!(
            "unknown action '{}', expected 'claim' or 'release'",
            action
        ))
    })?;

    let machine = LockMachine::new(LockRepository::new(resource.store()), resource.machine_config());

    let lock = match action {
        LockAction::Claim => machine.acquire(&AcquireRequest {
            lock_name,
            need_approval: request.params.need_approval,
            override_approval: request.params.override_approval,
            description: request.params.description.clone(),
        })?,
        LockAction::Release => machine.release(&lock_name)?,
    };

    write_outputs(target_dir, &lock)?;
    to_response(&resource_output(&lock))
}
