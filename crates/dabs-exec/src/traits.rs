//! Command executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Runs package-manager query tools and captures their output
///
/// A non-zero exit status is not an error at this level: `zcat` and
/// `rpm --whatprovides` report ordinary conditions through it.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args`, failing once `timeout` elapses
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;
}
