//! Rebuild error kinds.
//!
//! Library functions return `anyhow::Result` but raise these values so
//! callers can tell failure kinds apart with `downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

/// A fatal error that aborts a rebuild run.
#[derive(Debug, Error)]
pub enum RebuildError {
    /// The run was configured with values it cannot use.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// No usable build backend executable could be found.
    #[error("could not locate {backend}\nhelp: install it as a dev dependency or put it on PATH")]
    MissingBackend { backend: String },

    /// A required package manifest is absent or malformed.
    #[error("failed to read manifest `{}`: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },

    /// A build backend could not be spawned or exited unsuccessfully.
    #[error("failed to rebuild `{}` with {backend}{}\n{stderr}", .module.display(), exit_suffix(.code))]
    BackendInvocation {
        module: PathBuf,
        backend: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The ABI for the target runtime version is not known.
    #[error("could not detect the ABI for {runtime} v{version}\nhelp: pass --abi explicitly")]
    UnknownAbi { runtime: String, version: String },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

impl RebuildError {
    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        RebuildError::Configuration {
            message: message.into(),
        }
    }
}
