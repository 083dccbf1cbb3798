//! Local command execution using `tokio::process`

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::CommandExecutor;

/// Locale forced on every query tool
const QUERY_LOCALE: &str = "C";

/// Executor for programs on the local machine
///
/// Programs are spawned directly, without a shell, under the C locale. A
/// program that outlives its timeout is killed.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    #[instrument(skip(self), level = "debug")]
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        let child = Command::new(program)
            .args(args)
            .env("LC_ALL", QUERY_LOCALE)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ExecError::NotFound(program.to_string()),
                _ => ExecError::Spawn {
                    program: program.to_string(),
                    message: e.to_string(),
                },
            })?;

        // Dropping the child on timeout kills it
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(program, ?timeout, "query timed out");
                ExecError::Timeout {
                    program: program.to_string(),
                    timeout,
                }
            })?
            .map_err(|e| ExecError::Output {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        let result = CommandResult {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: start.elapsed(),
        };

        debug!(
            program,
            status = result.status,
            bytes = result.stdout.len(),
            elapsed = ?result.elapsed,
            "query finished"
        );
        Ok(result)
    }
}
