//! `package.json` reading.
//!
//! Only the keys the rebuild cares about are modeled; everything else in the
//! file is ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::error::RebuildError;

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// A dependency section of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// `dependencies`
    #[serde(alias = "production")]
    Prod,
    /// `optionalDependencies`
    Optional,
    /// `devDependencies`
    #[serde(alias = "development")]
    Dev,
}

impl DependencyKind {
    /// Get the kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Prod => "prod",
            DependencyKind::Optional => "optional",
            DependencyKind::Dev => "dev",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prod" | "production" => Ok(DependencyKind::Prod),
            "optional" => Ok(DependencyKind::Optional),
            "dev" | "development" => Ok(DependencyKind::Dev),
            _ => Err(format!(
                "invalid dependency kind '{}'; expected 'prod', 'optional', or 'dev'",
                s
            )),
        }
    }
}

/// The dependency kinds selected when none are configured.
pub fn default_dependency_kinds() -> BTreeSet<DependencyKind> {
    [DependencyKind::Prod, DependencyKind::Optional]
        .into_iter()
        .collect()
}

/// The parsed subset of a `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package name
    #[serde(default)]
    pub name: Option<String>,

    /// Package version
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Prebuilt-binary configuration (`module_name`, `module_path`, `host`, ...).
    /// Its presence selects the reinstall-with-fallback backend.
    #[serde(default)]
    pub binary: Option<BTreeMap<String, serde_json::Value>>,
}

impl PackageManifest {
    /// Load the manifest in `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| manifest_error(&path, e))?;
        Self::parse(&content, &path)
    }

    /// Parse manifest content read from `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| manifest_error(path, e))
    }

    /// Load the manifest in `dir`, treating any failure as "not installed".
    pub fn load_if_installed(dir: &Path) -> Option<Self> {
        match Self::load(dir) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::debug!("treating {} as not installed: {}", dir.display(), e);
                None
            }
        }
    }

    /// Names declared in one dependency section.
    pub fn dependency_names(&self, kind: DependencyKind) -> impl Iterator<Item = &str> {
        let section = match kind {
            DependencyKind::Prod => &self.dependencies,
            DependencyKind::Optional => &self.optional_dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
        };
        section.keys().map(String::as_str)
    }

    /// Names a package needs at runtime: regular plus optional dependencies.
    pub fn runtime_dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependency_names(DependencyKind::Prod)
            .chain(self.dependency_names(DependencyKind::Optional))
    }
}

fn manifest_error(path: &Path, err: impl fmt::Display) -> anyhow::Error {
    RebuildError::Manifest {
        path: PathBuf::from(path),
        message: err.to_string(),
    }
    .into()
}
