//! dabs-pkg: Package manager collectors
//!
//! Provides the [`Collector`] trait, implementations for APT, DNF and Flatpak,
//! and the pipeline that turns a collector's output into a fully computed
//! [`PackageCollection`].

pub mod apt;
pub mod dnf;
pub mod error;
pub mod flatpak;
pub mod traits;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dabs_core::PackageCollection;
use dabs_exec::CommandExecutor;
use tracing::{debug, info, instrument};

pub use apt::AptCollector;
pub use dnf::DnfCollector;
pub use error::PackageError;
pub use flatpak::FlatpakCollector;
pub use traits::Collector;
pub use types::{CollectorConfig, PackageManagerType};

/// Create the collector for a backend
pub fn create_collector(
    manager: PackageManagerType,
    executor: Arc<dyn CommandExecutor>,
    config: CollectorConfig,
) -> Box<dyn Collector> {
    match manager {
        PackageManagerType::Apt => Box::new(AptCollector::new(executor, config)),
        PackageManagerType::Dnf => Box::new(DnfCollector::new(executor, config)),
        PackageManagerType::Flatpak => Box::new(FlatpakCollector::new(executor, config)),
    }
}

/// Collect packages and compute recursive dependencies and attributed sizes
///
/// # Errors
/// Returns [`PackageError::ManagerNotFound`] when the backend's tools are not
/// installed, or any error raised while querying them.
#[instrument(skip(collector), fields(manager = %collector.manager_type()))]
pub async fn build_collection(
    collector: &dyn Collector,
) -> Result<PackageCollection, PackageError> {
    if !collector.is_available() {
        return Err(PackageError::ManagerNotFound(format!(
            "{} is not installed",
            collector.manager_type()
        )));
    }

    let start = Instant::now();
    let mut collection = collector.collect().await?;
    debug!(
        "Collection time: {:.1} s",
        start.elapsed().as_secs_f64()
    );

    collection.compute_recursive_dependencies();
    collector.post_process(&mut collection);
    collection.compute_pseudobytes();

    info!(
        top = collection.top().len(),
        bottom = collection.bottom().len(),
        "package collection ready"
    );

    Ok(collection)
}

/// Run a query command and return its stdout, treating a non-zero status as failure
pub(crate) async fn query(
    executor: &dyn CommandExecutor,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, PackageError> {
    let result = executor.run(program, args, timeout).await?;
    if !result.success() {
        return Err(PackageError::CommandFailed {
            program: program.to_string(),
            status: result.status,
            message: result.stderr.trim().to_string(),
        });
    }
    Ok(result.stdout)
}

/// Parse a size column; empty and `(none)` mean zero
pub(crate) fn parse_size(text: &str, package: &str) -> Result<u64, PackageError> {
    let text = text.trim();
    if text.is_empty() || text == "(none)" {
        return Ok(0);
    }
    text.parse()
        .map_err(|_| PackageError::ParseError(format!("invalid size '{text}' for {package}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size(" 3900 ", "vim").unwrap(), 3900);
        assert_eq!(parse_size("", "vim").unwrap(), 0);
        assert_eq!(parse_size("(none)", "gpg-pubkey").unwrap(), 0);

        let err = parse_size("12k", "vim").unwrap_err();
        assert!(err.to_string().contains("'12k' for vim"));
    }
}
