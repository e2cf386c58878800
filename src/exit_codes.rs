//! Exit code constants for the gatelock binaries.
//!
//! The external driver distinguishes outcomes purely by exit status:
//! - 0: Success (including the no-op path that produces no output files)
//! - 1: Configuration error (bad request JSON, missing source/params)
//! - 2: Lock not found (release of a never-claimed name, or a lock
//!   disappearing while a waiter was polling it)
//! - 3: Approval rejected or timed out (the lock is released first)
//! - 4: Store I/O failure
//! - 5: Output file write failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Configuration error: malformed request, missing `pool`, missing or
/// unknown `action`, missing `lock_name`.
pub const CONFIG_ERROR: i32 = 1;

/// Lock not found where one was required to exist.
pub const NOT_FOUND: i32 = 2;

/// The approval was rejected, or the approval wait hit its deadline.
pub const REJECTED: i32 = 3;

/// Store read/write failed or a stored record could not be decoded.
pub const STORE_FAILURE: i32 = 4;

/// Writing the `name`/`metadata` files into the target directory failed.
pub const OUTPUT_FAILURE: i32 = 5;
