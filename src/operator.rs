//! Operator operations behind the admin CLI.
//!
//! Humans resolve pending approvals here: list what is currently
//! claimed, then approve or reject a lock by its identity. This is the
//! only code path that ever writes `approved=true`.

use crate::error::{GatelockError, Result};
use crate::lock::{Approval, Lock};
use crate::repository::LockRepository;
use crate::store::LockStore;
use crate::version;
use tracing::info;

/// Approve a lock by identity.
pub fn approve<S: LockStore>(repo: &LockRepository<S>, id: &str) -> Result<Lock> {
    decide(repo, id, Approval::Approved)
}

/// Reject a lock by identity.
pub fn reject<S: LockStore>(repo: &LockRepository<S>, id: &str) -> Result<Lock> {
    decide(repo, id, Approval::Rejected)
}

fn decide<S: LockStore>(
    repo: &LockRepository<S>,
    id: &str,
    decision: Approval,
) -> Result<Lock> {
    let mut lock = repo
        .find_by_id(id)?
        .ok_or_else(|| GatelockError::NotFound(format!("no lock with id '{}'", id)))?;

    lock.approved = decision;
    // Advance the version so waiters and check cursors see the decision.
    lock.touch();
    repo.save(&lock)?;
    info!("recorded {:?} for the lock {}", decision, lock.lockname);
    Ok(lock)
}

/// Render claimed locks as an aligned table.
pub fn render_claimed(locks: &[Lock]) -> String {
    let headers = [
        "id",
        "pool",
        "lockname",
        "timestamp",
        "need_approval",
        "approved",
        "team",
        "pipeline",
        "description",
    ];

    let rows: Vec<Vec<String>> = locks
        .iter()
        .map(|lock| {
            vec![
                lock.id.clone(),
                lock.pool.clone(),
                lock.lockname.clone(),
                version::encode_timestamp(lock.timestamp),
                lock.need_approval.to_string(),
                lock.approved
                    .as_metadata_value()
                    .unwrap_or_else(|| "pending".to_string()),
                lock.team.clone(),
                lock.pipeline.clone(),
                lock.description.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|header| header.len()).collect();
    for row in &rows {
        for (column, cell) in row.iter().enumerate() {
            widths[column] = widths[column].max(cell.len());
        }
    }

    let mut out = String::new();
    out.push_str(&format_row(
        &headers.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        &widths,
    ));
    for row in &rows {
        out.push('\n');
        out.push_str(&format_row(row, &widths));
    }
    out
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
