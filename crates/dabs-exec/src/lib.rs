//! dabs-exec: Command execution abstraction
//!
//! Provides the trait collectors use to run package-manager query tools, and
//! a local implementation backed by `tokio::process`.

pub mod error;
pub mod local;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::CommandResult;
pub use traits::CommandExecutor;
