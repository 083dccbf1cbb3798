//! Error types for dabs-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running a query tool
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Program is not installed or not on `PATH`
    #[error("program not found: {0}")]
    NotFound(String),

    /// Program exists but could not be started
    #[error("failed to start {program}: {message}")]
    Spawn {
        /// Program that was run
        program: String,
        /// Underlying error
        message: String,
    },

    /// Reading the program's output failed
    #[error("failed to read output of {program}: {message}")]
    Output {
        /// Program that was run
        program: String,
        /// Underlying error
        message: String,
    },

    /// Program did not finish in time and was killed
    #[error("{program} timed out after {timeout:?}")]
    Timeout {
        /// Program that was run
        program: String,
        /// Timeout duration that was exceeded
        timeout: Duration,
    },
}
