//! Gatelock: a namespaced, human-gated distributed lock for CI pipelines.
//!
//! A lock is a named record in a shared store. Short-lived invocations
//! claim it, optionally wait for a human approval/rejection decision,
//! and release it — coordinating purely through the store, with no
//! long-running server. The `gatelock` binary speaks the driver
//! protocol (`check`/`in`/`out` over stdin/stdout JSON); the
//! `gatelock-admin` binary is the operator tool that resolves pending
//! approvals.
//!
//! The interesting parts live in [`machine`] (the claim/approval state
//! machine), [`poll`] (the shared wait loop), and [`version`] (the
//! cursor protocol the external scheduler uses to detect new lock
//! states).

pub mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod lock;
pub mod logging;
pub mod machine;
pub mod operator;
pub mod poll;
pub mod protocol;
pub mod repository;
pub mod store;
pub mod version;
