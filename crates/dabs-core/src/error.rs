//! Core error types for dabs-core

use thiserror::Error;

/// Errors raised by the collection model and converters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Size string could not be parsed
    #[error("invalid size: {0:?}")]
    InvalidSize(String),

    /// Size string used a unit we do not know
    #[error("unknown size unit: {0:?}")]
    UnknownUnit(String),

    /// Identifier is not part of the collection
    #[error("package not found: {0}")]
    PackageNotFound(String),
}
