//! Build fingerprinting for skipping up-to-date modules.
//!
//! After a successful rebuild the (architecture, ABI) pair is written to a
//! metadata file in the module's build output directory. A later run for the
//! same pair finds the file and skips the module.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::builder::BuildConfiguration;
use crate::util::fs::{ensure_dir, read_if_exists};

/// Metadata file name inside `build/<configuration>`.
pub const META_FILE: &str = ".addon-meta";

/// The configuration a module was last built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Target architecture
    pub arch: String,
    /// Runtime module ABI
    pub abi: String,
}

impl Fingerprint {
    /// Create a fingerprint.
    pub fn new(arch: impl Into<String>, abi: impl Into<String>) -> Self {
        Fingerprint {
            arch: arch.into(),
            abi: abi.into(),
        }
    }

    /// The persisted token, `<arch>--<abi>`.
    pub fn token(&self) -> String {
        format!("{}--{}", self.arch, self.abi)
    }

    /// Path of the metadata file for a module.
    pub fn meta_path(module_dir: &Path, configuration: BuildConfiguration) -> PathBuf {
        module_dir
            .join("build")
            .join(configuration.as_str())
            .join(META_FILE)
    }

    /// Whether the module's persisted token equals this fingerprint exactly.
    ///
    /// The file is compared byte for byte, so unreadable text is stale.
    pub fn is_current(&self, module_dir: &Path, configuration: BuildConfiguration) -> Result<bool> {
        let path = Self::meta_path(module_dir, configuration);
        Ok(read_if_exists(&path)?.is_some_and(|stored| stored == self.token().as_bytes()))
    }

    /// Persist this fingerprint for a module, creating parent directories.
    pub fn save(&self, module_dir: &Path, configuration: BuildConfiguration) -> Result<()> {
        let path = Self::meta_path(module_dir, configuration);
        let dir = path
            .parent()
            .context("fingerprint path has no parent directory")?;
        ensure_dir(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(self.token().as_bytes())?;
        tmp.persist(&path)
            .with_context(|| format!("failed to write fingerprint: {}", path.display()))?;
        Ok(())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}
