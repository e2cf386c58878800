//! Error types for gatelock.
//!
//! Uses thiserror for derive macros. Every variant maps to a distinct
//! exit code so the external driver can tell configuration mistakes,
//! missing locks, and rejected approvals apart.

use crate::exit_codes;
use crate::store::StoreError;
use thiserror::Error;

/// Main error type for gatelock operations.
#[derive(Error, Debug)]
pub enum GatelockError {
    /// The request or source configuration is invalid.
    #[error("{0}")]
    Config(String),

    /// A lock that had to exist could not be found.
    #[error("{0}")]
    NotFound(String),

    /// The approval was rejected or the approval wait timed out.
    /// The lock has already been released when this is raised.
    #[error("the lock '{0}' has not been approved")]
    Rejected(String),

    /// The store failed; not retried, propagates as fatal.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Writing the `name`/`metadata` output files failed.
    #[error("{0}")]
    Output(String),
}

impl GatelockError {
    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            GatelockError::Config(_) => exit_codes::CONFIG_ERROR,
            GatelockError::NotFound(_) => exit_codes::NOT_FOUND,
            GatelockError::Rejected(_) => exit_codes::REJECTED,
            GatelockError::Store(_) => exit_codes::STORE_FAILURE,
            GatelockError::Output(_) => exit_codes::OUTPUT_FAILURE,
        }
    }
}

/// Result type alias for gatelock operations.
pub type Result<T> = std::result::Result<T, GatelockError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn config_error_has_correct_exit_code() {
        let err = GatelockError::Config("pool must exist in the source configuration".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn not_found_error_has_correct_exit_code() {
        let err = GatelockError::NotFound("the lock 'build-gate' does not exist".to_string());
        assert_eq!(err.exit_code(), exit_codes::NOT_FOUND);
    }

    #[test]
    fn rejected_error_has_correct_exit_code() {
        let err = GatelockError::Rejected("build-gate".to_string());
        assert_eq!(err.exit_code(), exit_codes::REJECTED);
    }

    #[test]
    fn store_error_has_correct_exit_code() {
        let err = GatelockError::Store(StoreError::Io {
            path: PathBuf::from("/nowhere"),
            source: std::io::Error::other("down"),
        });
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);
    }

    #[test]
    fn output_error_has_correct_exit_code() {
        let err = GatelockError::Output("failed to write name file".to_string());
        assert_eq!(err.exit_code(), exit_codes::OUTPUT_FAILURE);
    }

    #[test]
    fn rejected_message_names_the_lock() {
        let err = GatelockError::Rejected("build-gate".to_string());
        assert_eq!(err.to_string(), "the lock 'build-gate' has not been approved");
    }
}
