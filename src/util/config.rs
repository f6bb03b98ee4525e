//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.addon-rebuild/config.toml` - User-wide defaults
//! - Project: `<module dir>/.addon-rebuild/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::scheduler::ExecutionMode;
use crate::core::manifest::DependencyKind;

/// Name of the configuration directory, both global and per project.
pub const CONFIG_DIR_NAME: &str = ".addon-rebuild";

/// Tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rebuild settings
    pub rebuild: RebuildConfig,
}

/// Defaults for a rebuild run, all optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildConfig {
    /// Target runtime version
    pub target: Option<String>,

    /// Target architecture
    pub arch: Option<String>,

    /// Explicit module ABI
    pub abi: Option<String>,

    /// Runtime name (e.g., "electron")
    pub runtime: Option<String>,

    /// Header download URL
    pub dist_url: Option<String>,

    /// Dependency kinds to treat as production
    pub types: Option<Vec<String>>,

    /// Execution mode (sequential, parallel)
    pub mode: Option<String>,

    /// Extra module names to rebuild
    pub extra_modules: Vec<String>,

    /// Only rebuild these modules
    pub only: Vec<String>,

    /// Bound on concurrently running backends (None = unbounded)
    pub jobs: Option<usize>,

    /// Rebuild even when the fingerprint matches
    pub force: bool,

    /// Build the Debug configuration
    pub debug: bool,

    /// Directory the backends use as their home
    pub gyp_home: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let ours = &mut self.rebuild;
        let theirs = other.rebuild;

        if theirs.target.is_some() {
            ours.target = theirs.target;
        }
        if theirs.arch.is_some() {
            ours.arch = theirs.arch;
        }
        if theirs.abi.is_some() {
            ours.abi = theirs.abi;
        }
        if theirs.runtime.is_some() {
            ours.runtime = theirs.runtime;
        }
        if theirs.dist_url.is_some() {
            ours.dist_url = theirs.dist_url;
        }
        if theirs.types.is_some() {
            ours.types = theirs.types;
        }
        if theirs.mode.is_some() {
            ours.mode = theirs.mode;
        }
        if !theirs.extra_modules.is_empty() {
            ours.extra_modules = theirs.extra_modules;
        }
        if !theirs.only.is_empty() {
            ours.only = theirs.only;
        }
        if theirs.jobs.is_some() {
            ours.jobs = theirs.jobs;
        }
        if theirs.gyp_home.is_some() {
            ours.gyp_home = theirs.gyp_home;
        }
        // Flags only ever switch on.
        ours.force |= theirs.force;
        ours.debug |= theirs.debug;
    }

    /// Parse the configured execution mode.
    pub fn mode(&self) -> Result<Option<ExecutionMode>> {
        self.rebuild
            .mode
            .as_deref()
            .map(|s| s.parse::<ExecutionMode>().map_err(anyhow::Error::msg))
            .transpose()
    }

    /// Parse the configured dependency kinds.
    pub fn types(&self) -> Result<Option<BTreeSet<DependencyKind>>> {
        self.rebuild
            .types
            .as_ref()
            .map(|kinds| {
                kinds
                    .iter()
                    .map(|s| s.parse::<DependencyKind>().map_err(anyhow::Error::msg))
                    .collect::<Result<BTreeSet<_>>>()
            })
            .transpose()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.addon-rebuild/config.toml)
/// 2. Global config (~/.addon-rebuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global config directory (~/.addon-rebuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the global config path (~/.addon-rebuild/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.addon-rebuild/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR_NAME).join("config.toml")
}

/// Default isolated home for backend header and build caches (~/.electron-gyp).
pub fn default_gyp_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".electron-gyp"))
}
