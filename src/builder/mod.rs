//! Native module rebuilding.
//!
//! This module walks the installed dependency tree, decides which native
//! modules need rebuilding and drives the external build backends.

pub mod backend;
pub mod binary;
pub mod context;
pub mod events;
pub mod fingerprint;
pub mod module;
pub mod scheduler;
pub mod walker;

use std::fmt;

pub use backend::{BackendKind, BackendPaths, BuildInvocationSpec};
pub use context::RebuildContext;
pub use events::{EventSink, LifecycleEvent};
pub use fingerprint::Fingerprint;
pub use module::{ModuleOutcome, ModuleRebuilder};
pub use scheduler::{BuildScheduler, ExecutionMode, RebuildTask};
pub use walker::{collect_tasks, ModuleWalker};

/// Build configuration passed to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BuildConfiguration {
    /// Optimized build (the default)
    #[default]
    Release,
    /// Debug build
    Debug,
}

impl BuildConfiguration {
    /// Select the configuration for a debug flag.
    pub fn from_debug(debug: bool) -> Self {
        if debug {
            BuildConfiguration::Debug
        } else {
            BuildConfiguration::Release
        }
    }

    /// Directory name under `build/`, also the `{configuration}` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildConfiguration::Release => "Release",
            BuildConfiguration::Debug => "Debug",
        }
    }

    /// Whether this is a debug build.
    pub fn is_debug(&self) -> bool {
        matches!(self, BuildConfiguration::Debug)
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
