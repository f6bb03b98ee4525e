//! Rebuild context - runtime target, platform, and backend configuration.

use std::path::{Path, PathBuf};

use crate::builder::backend::BackendPaths;
use crate::builder::fingerprint::Fingerprint;
use crate::builder::BuildConfiguration;
use crate::core::platform::{Platform, RuntimeTarget};

/// Extension of compiled native modules.
pub const NATIVE_EXTENSION: &str = ".node";

/// Settings shared by every module rebuild in a run.
#[derive(Debug, Clone)]
pub struct RebuildContext {
    /// Runtime name, version and ABI being built for
    pub target: RuntimeTarget,

    /// Target architecture (e.g., "x64")
    pub arch: String,

    /// Host platform (e.g., "linux")
    pub platform: Platform,

    /// Base URL the backend downloads runtime headers from
    pub header_url: String,

    /// Release or Debug
    pub configuration: BuildConfiguration,

    /// Rebuild even when the fingerprint matches
    pub force: bool,

    /// When non-empty, only modules with these directory names are rebuilt
    pub only_modules: Vec<String>,

    /// Isolated home directory for backend header caches
    pub gyp_home: PathBuf,

    /// Located backend executables
    pub backends: BackendPaths,
}

impl RebuildContext {
    /// Fingerprint of the configuration being built.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(&self.arch, &self.target.abi)
    }

    /// Whether the `only` filter admits a module directory name.
    pub fn admits(&self, name: &str) -> bool {
        self.only_modules.is_empty() || self.only_modules.iter().any(|m| m == name)
    }

    /// Path of a shipped prebuilt binary matching this configuration.
    pub fn prebuilt_path(&self, module_dir: &Path) -> PathBuf {
        module_dir
            .join("prebuilds")
            .join(format!("{}-{}", self.platform, self.arch))
            .join(format!(
                "{}-{}{}",
                self.target.runtime, self.target.abi, NATIVE_EXTENSION
            ))
    }

    /// Directory a freshly built binary is cached in.
    pub fn binary_cache_dir(&self, module_dir: &Path) -> PathBuf {
        module_dir
            .join("bin")
            .join(format!("{}-{}-{}", self.platform, self.arch, self.target.abi))
    }

    /// Default backend output directory.
    pub fn build_output_dir(&self, module_dir: &Path) -> PathBuf {
        module_dir.join("build").join(self.configuration.as_str())
    }
}


#[cfg(test)]
mod tests {
    use super::test_context::linux_x64;
    use super::*;

    #[test]
    fn test_context_paths() {
        let ctx = linux_x64(BackendPaths::default());
        let module = Path::new("/app/node_modules/leaf");

        assert_eq!(ctx.target.abi, "85");
        assert_eq!(
            ctx.prebuilt_path(module),
            module.join("prebuilds/linux-x64/electron-85.node")
        );
        assert_eq!(ctx.binary_cache_dir(module), module.join("bin/linux-x64-85"));
        assert_eq!(ctx.build_output_dir(module), module.join("build/Release"));
        assert_eq!(ctx.fingerprint().token(), "x64--85");
    }

    #[test]
    fn test_only_filter() {
        let mut ctx = linux_x64(BackendPaths::default());
        assert!(ctx.admits("anything"));

        ctx.only_modules = vec!["leaf".to_string()];
        assert!(ctx.admits("leaf"));
        assert!(!ctx.admits("other"));
    }
}
