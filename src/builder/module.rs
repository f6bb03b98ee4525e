//! Per-module rebuild decisions.
//!
//! A package is a native module when it has a `binding.gyp`. For each one
//! the rebuilder decides whether the existing build already matches the
//! target (fingerprint), whether the package ships a matching prebuilt
//! binary, and otherwise runs the appropriate backend and records the new
//! fingerprint.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::backend::{BackendKind, BuildInvocationSpec};
use crate::builder::binary::{resolve_binary, TemplateValues};
use crate::builder::context::{RebuildContext, NATIVE_EXTENSION};
use crate::builder::events::{EventSink, LifecycleEvent};
use crate::builder::scheduler::RebuildTask;
use crate::core::error::RebuildError;
use crate::core::manifest::PackageManifest;
use crate::util::fs::{copy_file, list_dir_names};

/// File marking a package as a native module.
pub const BINDING_FILE: &str = "binding.gyp";

/// What happened to one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    /// Not a native module.
    NotNative,
    /// Excluded by the `only` filter.
    Filtered,
    /// Already built for this configuration.
    UpToDate,
    /// Ships a matching prebuilt binary.
    Prebuilt,
    /// The backend ran successfully.
    Rebuilt {
        /// Where the built binary was cached, if one was found
        artifact: Option<PathBuf>,
    },
}

impl ModuleOutcome {
    /// Whether the backend ran.
    pub fn is_rebuilt(&self) -> bool {
        matches!(self, ModuleOutcome::Rebuilt { .. })
    }
}

/// A planned backend run for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBuildPlan {
    /// The backend invocation
    pub invocation: BuildInvocationSpec,
    /// Directory the backend writes the binary to
    pub artifact_dir: PathBuf,
}

/// Rebuilds single modules under a shared context.
#[derive(Debug, Clone)]
pub struct ModuleRebuilder {
    ctx: RebuildContext,
    events: EventSink,
}

impl ModuleRebuilder {
    /// Create a rebuilder.
    pub fn new(ctx: RebuildContext, events: EventSink) -> Self {
        ModuleRebuilder { ctx, events }
    }

    /// Get the rebuild context.
    pub fn context(&self) -> &RebuildContext {
        &self.ctx
    }

    /// Rebuild the dependency at `module_dir` if it needs it.
    pub fn rebuild_at(&self, module_dir: &Path) -> Result<ModuleOutcome> {
        self.rebuild_task(&RebuildTask::module(module_dir.to_path_buf()))
    }

    /// Rebuild a scheduled task. The `only` filter never applies to the root.
    pub fn rebuild_task(&self, task: &RebuildTask) -> Result<ModuleOutcome> {
        let module_dir = task.path.as_path();
        let name = module_name(module_dir);
        if !task.is_root && !self.ctx.admits(&name) {
            tracing::debug!("{} is not selected", name);
            return Ok(ModuleOutcome::Filtered);
        }
        if !module_dir.join(BINDING_FILE).is_file() {
            return Ok(ModuleOutcome::NotNative);
        }

        self.events.emit(LifecycleEvent::found(&name));

        let fingerprint = self.ctx.fingerprint();
        let configuration = self.ctx.configuration;
        if !self.ctx.force && fingerprint.is_current(module_dir, configuration)? {
            tracing::debug!("{} is already built for {}", name, fingerprint);
            self.events.emit(LifecycleEvent::ModuleDone);
            self.events.emit(LifecycleEvent::ModuleSkip);
            return Ok(ModuleOutcome::UpToDate);
        }

        let prebuilt = self.ctx.prebuilt_path(module_dir);
        if prebuilt.is_file() {
            tracing::debug!("{} ships {}", name, prebuilt.display());
            return Ok(ModuleOutcome::Prebuilt);
        }

        let manifest = PackageManifest::load(module_dir)?;
        let plan = self.plan(module_dir, &manifest)?;

        tracing::info!(
            "rebuilding {} for {} {} ({})",
            name,
            self.ctx.target.runtime,
            self.ctx.target.version,
            self.ctx.arch
        );
        run_backend(module_dir, &plan.invocation)?;

        fingerprint.save(module_dir, configuration)?;
        let artifact = self.cache_artifact(module_dir, &plan.artifact_dir)?;

        self.events.emit(LifecycleEvent::ModuleDone);
        Ok(ModuleOutcome::Rebuilt { artifact })
    }

    /// Plan the backend invocation for a module.
    pub fn plan(&self, module_dir: &Path, manifest: &PackageManifest) -> Result<ModuleBuildPlan> {
        let ctx = &self.ctx;
        let backend = if manifest.binary.is_some() {
            BackendKind::PreGyp
        } else {
            BackendKind::Gyp
        };
        let program = ctx.backends.get(backend)?.to_path_buf();

        let mut args = vec![
            backend.action().to_string(),
            format!("--target={}", ctx.target.version),
            format!("--arch={}", ctx.arch),
            format!("--dist-url={}", ctx.header_url),
            backend.source_flag().to_string(),
        ];
        if ctx.configuration.is_debug() {
            args.push("--debug".to_string());
        }

        let mut artifact_dir = ctx.build_output_dir(module_dir);
        if let Some(ref binary) = manifest.binary {
            let values = TemplateValues {
                configuration: ctx.configuration,
                node_abi: ctx.target.node_abi(),
                platform: ctx.platform.to_string(),
                arch: ctx.arch.clone(),
                version: manifest.version.clone().unwrap_or_default(),
                name: manifest
                    .name
                    .clone()
                    .unwrap_or_else(|| module_name(module_dir)),
            };
            let resolved = resolve_binary(binary, &values, module_dir);
            args.extend(resolved.args);
            if let Some(path) = resolved.module_path {
                artifact_dir = path;
            }
        }

        let home = ctx.gyp_home.display().to_string();
        let mut env = BTreeMap::new();
        env.insert("HOME".to_string(), home.clone());
        env.insert("USERPROFILE".to_string(), home);
        env.insert("npm_config_disturl".to_string(), ctx.header_url.clone());
        env.insert("npm_config_runtime".to_string(), ctx.target.runtime.clone());
        env.insert("npm_config_target".to_string(), ctx.target.version.to_string());
        env.insert("npm_config_arch".to_string(), ctx.arch.clone());
        env.insert("npm_config_target_arch".to_string(), ctx.arch.clone());
        if backend == BackendKind::Gyp {
            env.insert("npm_config_build_from_source".to_string(), "true".to_string());
        }

        Ok(ModuleBuildPlan {
            invocation: BuildInvocationSpec {
                backend,
                program,
                args,
                cwd: module_dir.to_path_buf(),
                env,
            },
            artifact_dir,
        })
    }

    /// Copy the single built binary into the per-ABI cache directory.
    fn cache_artifact(&self, module_dir: &Path, artifact_dir: &Path) -> Result<Option<PathBuf>> {
        if !artifact_dir.is_dir() {
            tracing::debug!("no output directory at {}", artifact_dir.display());
            return Ok(None);
        }

        let candidates: Vec<PathBuf> = list_dir_names(artifact_dir)?
            .into_iter()
            .filter(|n| n.ends_with(NATIVE_EXTENSION) && n != NATIVE_EXTENSION)
            .map(|n| artifact_dir.join(n))
            .filter(|p| p.is_file())
            .collect();

        match candidates.as_slice() {
            [] => Ok(None),
            [built] => {
                let dest = self
                    .ctx
                    .binary_cache_dir(module_dir)
                    .join(format!("{}{}", module_name(module_dir), NATIVE_EXTENSION));
                copy_file(built, &dest)?;
                tracing::debug!("cached {} at {}", built.display(), dest.display());
                Ok(Some(dest))
            }
            _ => {
                tracing::warn!(
                    "{} contains {} native binaries; not caching any",
                    artifact_dir.display(),
                    candidates.len()
                );
                Ok(None)
            }
        }
    }
}

/// Run a backend, turning spawn failures and non-zero exits into errors.
fn run_backend(module_dir: &Path, invocation: &BuildInvocationSpec) -> Result<()> {
    let process = invocation.to_process();
    tracing::debug!("running `{}` in {}", process.display_command(), module_dir.display());

    let failure = |code: Option<i32>, stderr: String| RebuildError::BackendInvocation {
        module: module_dir.to_path_buf(),
        backend: invocation.backend.to_string(),
        code,
        stderr,
    };

    let output = process
        .exec()
        .map_err(|e| failure(None, format!("{:#}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        tracing::debug!("{}", stdout.trim_end());
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        return Err(failure(output.status.code(), stderr).into());
    }
    Ok(())
}

/// Directory name of a module, used in events and cache file names.
fn module_name(module_dir: &Path) -> String {
    module_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
