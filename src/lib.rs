//! addon-rebuild - Rebuild native Node addons against a target runtime ABI
//!
//! This crate provides the library behind the `addon-rebuild` tool: it
//! classifies a project's production dependencies, walks the installed
//! `node_modules` tree, and drives external build backends to rebuild every
//! native module for the requested runtime version and architecture.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test fixtures for installed dependency trees.
///
/// This module is only available when compiling with `--cfg test`.
#[cfg(test)]
pub mod test_support;

pub use builder::{EventSink, ExecutionMode, LifecycleEvent, ModuleOutcome};
pub use core::{DependencyKind, RebuildError, RuntimeTarget};
pub use ops::{rebuild, start, RebuildHandle, RebuildOptions, RebuildSummary};
