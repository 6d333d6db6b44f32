//! Error types for fabtrack
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown fabric/task, invalid input)
//! - 4: Operation failed (storage, serialization, remote)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the fabtrack CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for fabtrack operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown fabric: {0}")]
    UnknownFabric(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Catalog file not found: {0}")]
    CatalogNotFound(PathBuf),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::UnknownFabric(_)
            | Error::UnknownTask(_)
            | Error::UnknownSection(_)
            | Error::CatalogNotFound(_) => exit_codes::USER_ERROR,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::Remote(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for fabtrack operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_map_to_exit_code_2() {
        assert_eq!(
            Error::UnknownFabric("west-it".into()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::InvalidArgument("empty name".into()).exit_code(),
            exit_codes::USER_ERROR
        );
    }

    #[test]
    fn operation_errors_map_to_exit_code_4() {
        assert_eq!(
            Error::Remote("503".into()).exit_code(),
            exit_codes::OPERATION_FAILED
        );
        assert_eq!(
            Error::LockFailed(PathBuf::from("/tmp/x.lock")).exit_code(),
            exit_codes::OPERATION_FAILED
        );
    }

    #[test]
    fn messages_carry_the_offending_value() {
        let err = Error::UnknownTask("task-zzz".into());
        assert!(err.to_string().contains("task-zzz"));
    }
}
