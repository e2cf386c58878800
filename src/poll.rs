//! Generic blocking re-check loop.
//!
//! One loop shape serves every wait in the system: re-check a predicate
//! against freshly fetched state until it holds or an optional deadline
//! passes. Each cycle blocks the calling process for the interval; with
//! no deadline the wait is unbounded, because a release or an approval
//! may legitimately take arbitrarily long.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// How a wait ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Polled<T> {
    /// The predicate held for this observation.
    Satisfied(T),
    /// The deadline passed; carries the cycle's observation. The
    /// deadline wins over the observation, so an expired wait reports
    /// `Expired` even when the same cycle's state would satisfy the
    /// predicate.
    Expired(T),
}

/// Re-check `is_ready` until it holds or `deadline` passes.
///
/// The initial state counts as the first observation; `refresh` is only
/// called after a sleep, so a state that is already ready returns
/// without blocking.
pub fn wait_until<T, E, F, P>(
    initial: T,
    interval: Duration,
    deadline: Option<DateTime<Utc>>,
    mut refresh: F,
    mut is_ready: P,
) -> Result<Polled<T>, E>
where
    F: FnMut() -> Result<T, E>,
    P: FnMut(&T) -> bool,
{
    let mut state = initial;
    loop {
        if let Some(deadline) = deadline
            && Utc::now() >= deadline
        {
            return Ok(Polled::Expired(state));
        }
        if is_ready(&state) {
            return Ok(Polled::Satisfied(state));
        }
        std::thread::sleep(interval);
        state = refresh()?;
    }
}
