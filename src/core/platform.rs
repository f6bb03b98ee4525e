//! Host platform and target runtime naming.
//!
//! Node-style names are used throughout (`win32`, `darwin`, `x64`, `ia32`)
//! because they appear in backend arguments, prebuilt-binary paths and the
//! binary cache layout. Everything here is plain data so a run can simulate
//! any platform.

use std::fmt;

use anyhow::Result;
use semver::Version;

use crate::core::abi::{lookup_abi, node_abi, parse_runtime_version};

/// Runtime name used when none is configured.
pub const DEFAULT_RUNTIME: &str = "electron";

/// The host operating system, in Node's `process.platform` naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform(String);

impl Platform {
    /// Create a platform from a Node-style name.
    pub fn new(name: impl Into<String>) -> Self {
        Platform(name.into())
    }

    /// Detect the host platform.
    pub fn host() -> Self {
        Platform::new(match std::env::consts::OS {
            "windows" => "win32",
            "macos" => "darwin",
            other => other,
        })
    }

    /// Get the platform name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the Windows platform.
    pub fn is_windows(&self) -> bool {
        self.0 == "win32"
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a Rust architecture name to Node's `process.arch` naming.
pub fn host_arch() -> String {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
    .to_string()
}

/// The runtime being rebuilt for: its name, version and module ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeTarget {
    /// Runtime name (e.g., "electron")
    pub runtime: String,
    /// Runtime version
    pub version: Version,
    /// Module ABI (e.g., "88")
    pub abi: String,
}

impl RuntimeTarget {
    /// Resolve a target, looking up the ABI unless one is given.
    pub fn resolve(runtime: &str, version: &str, abi_override: Option<&str>) -> Result<Self> {
        let version = parse_runtime_version(version)?;
        let abi = match abi_override {
            Some(abi) => abi.to_string(),
            None => lookup_abi(runtime, &version)?,
        };

        Ok(RuntimeTarget {
            runtime: runtime.to_string(),
            version,
            abi,
        })
    }

    /// The `{node_abi}` identifier (e.g., "electron-v10.1").
    pub fn node_abi(&self) -> String {
        node_abi(&self.runtime, &self.version)
    }
}
