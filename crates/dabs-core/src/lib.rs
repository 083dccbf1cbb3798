//! dabs-core: Package collection model and helpers
//!
//! Holds the two-level package collection every collector fills in and every
//! renderer reads, plus the small graph, size and numeric utilities they share.

pub mod collection;
pub mod convert;
pub mod distro;
pub mod error;
pub mod formulas;
pub mod graph;

pub use collection::{
    DependencyEdge, EdgeKind, Level, PackageCollection, PackageDetails, Variety,
};
pub use error::CoreError;
