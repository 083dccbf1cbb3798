//! Collector trait

use async_trait::async_trait;
use dabs_core::PackageCollection;

use crate::error::PackageError;
use crate::types::PackageManagerType;

/// A package-manager backend that can describe the installed packages
#[async_trait]
pub trait Collector: Send + Sync {
    /// Query the package manager and assemble the two-level collection
    ///
    /// Only direct dependencies are filled in; recursive sets and sizes are
    /// computed by the pipeline.
    async fn collect(&self) -> Result<PackageCollection, PackageError>;

    /// Adjust levels once recursive dependencies are known
    fn post_process(&self, _collection: &mut PackageCollection) {}

    /// Backend type
    fn manager_type(&self) -> PackageManagerType;

    /// Whether the query tools are installed
    fn is_available(&self) -> bool;
}
