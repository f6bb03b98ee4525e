//! Build backends.
//!
//! Two external tools do the actual compiling:
//! - `node-gyp` rebuilds a module from source
//! - `node-pre-gyp` reinstalls a module's prebuilt binary, falling back to a
//!   source build, and is used for packages that declare a `binary` section

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::error::RebuildError;
use crate::core::platform::Platform;
use crate::util::process::{find_executable, ProcessBuilder};

/// Which backend rebuilds a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Rebuild from source.
    Gyp,
    /// Reinstall, falling back to a source build.
    PreGyp,
}

impl BackendKind {
    /// Executable name.
    pub fn executable(&self) -> &'static str {
        match self {
            BackendKind::Gyp => "node-gyp",
            BackendKind::PreGyp => "node-pre-gyp",
        }
    }

    /// Positional action argument.
    pub fn action(&self) -> &'static str {
        match self {
            BackendKind::Gyp => "rebuild",
            BackendKind::PreGyp => "reinstall",
        }
    }

    /// Flag selecting source builds for this backend.
    pub fn source_flag(&self) -> &'static str {
        match self {
            BackendKind::Gyp => "--build-from-source",
            BackendKind::PreGyp => "--fallback-to-build",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Located backend executables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendPaths {
    /// Path to `node-gyp`
    pub gyp: Option<PathBuf>,
    /// Path to `node-pre-gyp`
    pub pre_gyp: Option<PathBuf>,
}

impl BackendPaths {
    /// Locate both backends, starting from `start` and walking up.
    ///
    /// Fails with `MissingBackend` when neither can be found.
    pub fn locate(start: &Path, platform: &Platform) -> Result<Self> {
        let paths = BackendPaths {
            gyp: locate_backend(BackendKind::Gyp, start, platform),
            pre_gyp: locate_backend(BackendKind::PreGyp, start, platform),
        };
        paths.ensure_any()?;
        Ok(paths)
    }

    /// Fail unless at least one backend is known.
    pub fn ensure_any(&self) -> Result<()> {
        if self.gyp.is_none() && self.pre_gyp.is_none() {
            return Err(RebuildError::MissingBackend {
                backend: format!(
                    "{} or {}",
                    BackendKind::Gyp.executable(),
                    BackendKind::PreGyp.executable()
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Path for one backend.
    pub fn get(&self, kind: BackendKind) -> Result<&Path> {
        let path = match kind {
            BackendKind::Gyp => self.gyp.as_deref(),
            BackendKind::PreGyp => self.pre_gyp.as_deref(),
        };
        path.ok_or_else(|| {
            RebuildError::MissingBackend {
                backend: kind.executable().to_string(),
            }
            .into()
        })
    }
}

/// Find a backend in the nearest `node_modules/.bin`, then on PATH.
pub fn locate_backend(kind: BackendKind, start: &Path, platform: &Platform) -> Option<PathBuf> {
    let file_name = if platform.is_windows() {
        format!("{}.cmd", kind.executable())
    } else {
        kind.executable().to_string()
    };

    for dir in start.ancestors() {
        let candidate = dir.join("node_modules").join(".bin").join(&file_name);
        if candidate.is_file() {
            tracing::debug!("found {} at {}", kind, candidate.display());
            return Some(candidate);
        }
    }

    find_executable(kind.executable())
}

/// A fully resolved backend invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocationSpec {
    /// Backend used
    pub backend: BackendKind,
    /// Executable path
    pub program: PathBuf,
    /// Arguments, starting with the action
    pub args: Vec<String>,
    /// Working directory (the module directory)
    pub cwd: PathBuf,
    /// Environment overlay
    pub env: BTreeMap<String, String>,
}

impl BuildInvocationSpec {
    /// Convert into a process builder.
    pub fn to_process(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .cwd(&self.cwd)
    }
}
