//! Error types for checkmate
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (invalid task data, bad args, bad config, unknown task)
//! - 4: Operation failed (filesystem or repository failure)
//!
//! Layering: the file store raises [`IoFailure`], the repository wraps it in
//! [`RepositoryError`] with the logical operation that was in progress, and
//! the service wraps that again in [`Error::TaskOperation`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Exit codes for the checkmate CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Filesystem-level failure on one backing file.
#[derive(Error, Debug)]
#[error("{path}: {source}")]
pub struct IoFailure {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl IoFailure {
    pub fn new(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Logical repository operation, used as error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryOperation {
    Open,
    LoadActive,
    LoadCompleted,
    Save,
    Delete,
}

impl RepositoryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryOperation::Open => "open task files",
            RepositoryOperation::LoadActive => "load active tasks",
            RepositoryOperation::LoadCompleted => "load completed tasks",
            RepositoryOperation::Save => "save task",
            RepositoryOperation::Delete => "delete task",
        }
    }
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task store failure wrapping the underlying filesystem error.
#[derive(Error, Debug)]
#[error("could not {operation}: {source}")]
pub struct RepositoryError {
    pub operation: RepositoryOperation,
    #[source]
    pub source: IoFailure,
}

impl RepositoryError {
    pub fn new(operation: RepositoryOperation, source: IoFailure) -> Self {
        Self { operation, source }
    }

    /// Path of the file that failed
    pub fn path(&self) -> &Path {
        &self.source.path
    }
}

/// Main error type for checkmate operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("{0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // Operation failures (exit code 4)
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Failed to {action}: {source}")]
    TaskOperation {
        action: &'static str,
        #[source]
        source: RepositoryError,
    },

    #[error("IO error: {0}")]
    Io(#[from] IoFailure),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_) => exit_codes::USER_ERROR,

            Error::Repository(_) | Error::TaskOperation { .. } | Error::Io(_) | Error::Json(_) => {
                exit_codes::OPERATION_FAILED
            }
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Repository(err) | Error::TaskOperation { source: err, .. } => {
                Some(serde_json::json!({
                    "operation": err.operation.as_str(),
                    "path": err.path().display().to_string(),
                }))
            }
            Error::Io(err) => Some(serde_json::json!({
                "path": err.path.display().to_string(),
            })),
            Error::TaskNotFound(reference) => Some(serde_json::json!({
                "task": reference,
            })),
            _ => None,
        }
    }
}

/// Result type alias for checkmate operations
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
