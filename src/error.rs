//! Error types for tandem
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (validation, unknown task, bad config)
//! - 4: Operation failed (backend rejection, IO, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tandem CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tandem operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Unknown assignee '{0}'")]
    UnknownAssignee(String),

    #[error("Unknown tag '{0}'")]
    UnknownTag(String),

    #[error("No board found at {0}")]
    NotInitialized(PathBuf),

    // Operation failures (exit code 4)
    #[error("Backend rejected {op}: {reason}")]
    Backend { op: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Board dispatcher is no longer running")]
    DispatcherClosed,

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
            | Error::EmptyTitle
            | Error::TaskNotFound(_)
            | Error::UnknownAssignee(_)
            | Error::UnknownTag(_)
            | Error::NotInitialized(_) => exit_codes::USER_ERROR,

            // Operation failures
            Error::Backend { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::DispatcherClosed
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True for errors raised before any backend round-trip.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyTitle
                | Error::InvalidArgument(_)
                | Error::UnknownAssignee(_)
                | Error::UnknownTag(_)
        )
    }

    /// Structured context for JSON error output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskNotFound(id) => Some(serde_json::json!({ "task": id })),
            Error::UnknownAssignee(name) => Some(serde_json::json!({ "assignee": name })),
            Error::UnknownTag(tag) => Some(serde_json::json!({ "tag": tag })),
            Error::Backend { op, .. } => Some(serde_json::json!({ "op": op })),
            Error::LockFailed(path) | Error::NotInitialized(path) => {
                Some(serde_json::json!({ "path": path }))
            }
            _ => None,
        }
    }

    pub fn backend(op: &'static str, reason: impl Into<String>) -> Self {
        Error::Backend {
            op,
            reason: reason.into(),
        }
    }
}

/// Result type alias for tandem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
