//! Error types for dabs-pkg

use dabs_exec::ExecError;
use thiserror::Error;

/// Errors that can occur while collecting packages
#[derive(Error, Debug, Clone)]
pub enum PackageError {
    /// Package manager not found on system
    #[error("package manager not found: {0}")]
    ManagerNotFound(String),

    /// Query command exited unsuccessfully
    #[error("{program} failed: {status} - {message}")]
    CommandFailed {
        /// Program that was run
        program: String,
        /// Exit status
        status: i32,
        /// Error message
        message: String,
    },

    /// Failed to parse command output
    #[error("parse error: {0}")]
    ParseError(String),

    /// Execution error from the command executor
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// Reading a package-manager file failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl PackageError {
    /// Check if the error means the backend is unavailable
    #[must_use]
    pub fn is_manager_not_found(&self) -> bool {
        matches!(self, PackageError::ManagerNotFound(_))
    }
}

impl From<ExecError> for PackageError {
    fn from(error: ExecError) -> Self {
        match error {
            ExecError::NotFound(program) => {
                PackageError::ManagerNotFound(format!("command '{program}' not found"))
            }
            other => PackageError::ExecutionError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for PackageError {
    fn from(error: std::io::Error) -> Self {
        PackageError::Io(error.to_string())
    }
}
