//! Core data types.

pub mod abi;
pub mod error;
pub mod manifest;
pub mod platform;

pub use error::RebuildError;
pub use manifest::{default_dependency_kinds, DependencyKind, PackageManifest, MANIFEST_FILE};
pub use platform::{host_arch, Platform, RuntimeTarget, DEFAULT_RUNTIME};
