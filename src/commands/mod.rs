//! Driver command implementations.
//!
//! This module routes an invocation to its command (`check`, `in`,
//! `out`), each of which consumes one JSON request from a string and
//! produces either a JSON result for stdout or a no-op. The command is
//! selected by the program name — the binary is installed three times
//! as symlinks named `check`/`in`/`out` — or, failing that, by the
//! first positional argument.

mod check;
mod get;
mod put;

use crate::error::{GatelockError, Result};
use crate::lock::Lock;
use crate::protocol::ResourceOutput;
use crate::version::Version;
use std::fs;
use std::path::{Path, PathBuf};

/// The three driver commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Detect new versions.
    Check,
    /// Fetch a lock, waiting out a pending approval.
    In,
    /// Claim or release a lock.
    Out,
}

impl Command {
    /// Parse a command name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "check" => Some(Command::Check),
            "in" => Some(Command::In),
            "out" => Some(Command::Out),
            _ => None,
        }
    }
}

/// A resolved invocation: the command plus its target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub target_dir: Option<PathBuf>,
}

/// Resolve the command from the process arguments.
///
/// Symlink style first: when the program itself is named `check`, `in`
/// or `out`, the first argument is the target directory. Otherwise the
/// first argument names the command and the second is the directory.
pub fn resolve_invocation(args: &[String]) -> Option<Invocation> {
    let program = args
        .first()
        .map(Path::new)
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str());

    if let Some(command) = program.and_then(Command::from_name) {
        return Some(Invocation {
            command,
            target_dir: args.get(1).map(PathBuf::from),
        });
    }

    let command = Command::from_name(args.get(1)?)?;
    Some(Invocation {
        command,
        target_dir: args.get(2).map(PathBuf::from),
    })
}

/// Result of one invocation.
#[derive(Debug)]
pub enum Outcome {
    /// The JSON result to print on stdout.
    Response(serde_json::Value),
    /// Nothing to fetch: success, but no result and no output files.
    NoOp,
}

/// Execute a command against a JSON request body.
pub fn run(command: Command, target_dir: Option<&Path>, input: &str) -> Result<Outcome> {
    match command {
        Command::Check => check::run(input),
        Command::In => get::run(require_target_dir(target_dir)?, input),
        Command::Out => put::run(require_target_dir(target_dir)?, input),
    }
}

fn require_target_dir(target_dir: Option<&Path>) -> Result<&Path> {
    target_dir.ok_or_else(|| {
        GatelockError::Config("this command requires a target directory argument".to_string())
    })
}

/// Write the `name` and `metadata` files for a fetched or mutated lock.
fn write_outputs(target_dir: &Path, lock: &Lock) -> Result<()> {
    let name_path = target_dir.join("name");
    fs::write(&name_path, &lock.lockname).map_err(|e| {
        GatelockError::Output(format!(
            "failed to write name file '{}': {}",
            name_path.display(),
            e
        ))
    })?;

    let metadata_path = target_dir.join("metadata");
    let metadata = serde_json::to_string(&lock.metadata()).map_err(|e| {
        GatelockError::Output(format!("failed to serialize metadata: {}", e))
    })?;
    fs::write(&metadata_path, metadata).map_err(|e| {
        GatelockError::Output(format!(
            "failed to write metadata file '{}': {}",
            metadata_path.display(),
            e
        ))
    })?;

    Ok(())
}

/// Build the version + metadata result for a lock.
fn resource_output(lock: &Lock) -> ResourceOutput {
    ResourceOutput {
        version: Version::from_datetime(lock.timestamp),
        metadata: lock.metadata(),
    }
}

fn to_response(output: &ResourceOutput) -> Result<Outcome> {
    let value = serde_json::to_value(output)
        .map_err(|e| GatelockError::Output(format!("failed to serialize result: {}", e)))?;
    Ok(Outcome::Response(value))
}
