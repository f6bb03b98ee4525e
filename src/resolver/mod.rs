//! Dependency classification.
//!
//! Determines which installed packages are production dependencies of the
//! project, following manifests through nested and hoisted installs.

pub mod production;

pub use production::{classify, DependencyClassifier, ProductionDeps, NODE_MODULES};
