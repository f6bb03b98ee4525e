//! Implementation of a rebuild run.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::builder::backend::BackendPaths;
use crate::builder::context::RebuildContext;
use crate::builder::events::{EventSink, LifecycleEvent};
use crate::builder::module::{ModuleOutcome, ModuleRebuilder};
use crate::builder::scheduler::{BuildScheduler, ExecutionMode, RebuildTask};
use crate::builder::walker::collect_tasks;
use crate::builder::BuildConfiguration;
use crate::core::error::RebuildError;
use crate::core::manifest::{default_dependency_kinds, DependencyKind, PackageManifest};
use crate::core::platform::{host_arch, Platform, RuntimeTarget, DEFAULT_RUNTIME};
use crate::resolver::production::classify;
use crate::util::config::default_gyp_home;
use crate::util::fs::real_path;

/// Where runtime headers are downloaded from by default.
pub const DEFAULT_HEADER_URL: &str = "https://www.electronjs.org/headers";

/// Options for a rebuild run.
#[derive(Debug, Clone)]
pub struct RebuildOptions {
    /// Absolute path of the project to rebuild
    pub build_path: PathBuf,

    /// Target runtime version (e.g., "11.0.0")
    pub target_version: String,

    /// Target architecture
    pub arch: String,

    /// Platform the modules are built on
    pub platform: Platform,

    /// Explicit module ABI, skipping the lookup
    pub abi: Option<String>,

    /// Runtime name
    pub runtime: String,

    /// Additional package names to treat as production dependencies
    pub extra_modules: Vec<String>,

    /// Only rebuild modules with these directory names (empty = all)
    pub only_modules: Vec<String>,

    /// Rebuild even when already built for this target
    pub force: bool,

    /// Header download URL
    pub header_url: String,

    /// Dependency sections of the root manifest that count as production
    pub types: BTreeSet<DependencyKind>,

    /// Execution mode (None = platform default)
    pub mode: Option<ExecutionMode>,

    /// Build the Debug configuration
    pub debug: bool,

    /// Home directory for the backends (None = ~/.electron-gyp)
    pub gyp_home: Option<PathBuf>,

    /// Backend executables (None = locate from the project)
    pub backends: Option<BackendPaths>,

    /// Bound on concurrently running backends
    pub jobs: Option<usize>,
}

impl RebuildOptions {
    /// Options for rebuilding `build_path` against a runtime version, with
    /// host defaults for everything else.
    pub fn new(build_path: impl Into<PathBuf>, target_version: impl Into<String>) -> Self {
        RebuildOptions {
            build_path: build_path.into(),
            target_version: target_version.into(),
            arch: host_arch(),
            platform: Platform::host(),
            abi: None,
            runtime: DEFAULT_RUNTIME.to_string(),
            extra_modules: Vec::new(),
            only_modules: Vec::new(),
            force: false,
            header_url: DEFAULT_HEADER_URL.to_string(),
            types: default_dependency_kinds(),
            mode: None,
            debug: false,
            gyp_home: None,
            backends: None,
            jobs: None,
        }
    }

    /// The effective execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
            .unwrap_or_else(|| ExecutionMode::default_for(&self.platform))
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RebuildSummary {
    /// The runtime that was targeted
    pub target: RuntimeTarget,

    /// Mode the tasks ran in
    pub mode: ExecutionMode,

    /// Number of production dependency names
    pub production_deps: usize,

    /// Outcome per task, root last
    pub modules: Vec<(PathBuf, ModuleOutcome)>,
}

impl RebuildSummary {
    fn count(&self, pred: impl Fn(&ModuleOutcome) -> bool) -> usize {
        self.modules.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Modules the backend rebuilt.
    pub fn rebuilt(&self) -> usize {
        self.count(ModuleOutcome::is_rebuilt)
    }

    /// Modules already built for the target.
    pub fn up_to_date(&self) -> usize {
        self.count(|o| *o == ModuleOutcome::UpToDate)
    }

    /// Modules shipping a matching prebuilt binary.
    pub fn prebuilt(&self) -> usize {
        self.count(|o| *o == ModuleOutcome::Prebuilt)
    }

    /// Native modules considered.
    pub fn native(&self) -> usize {
        self.count(|o| !matches!(o, ModuleOutcome::NotNative | ModuleOutcome::Filtered))
    }
}

/// Rebuild every native production dependency of a project, then the
/// project itself.
///
/// Blocks until all scheduled rebuilds finish. Events are sent to `events`
/// as the run progresses.
pub fn rebuild(options: &RebuildOptions, events: &EventSink) -> Result<RebuildSummary> {
    if !options.build_path.is_absolute() {
        return Err(RebuildError::configuration(format!(
            "build path `{}` must be absolute",
            options.build_path.display()
        ))
        .into());
    }
    url::Url::parse(&options.header_url).map_err(|e| {
        RebuildError::configuration(format!("invalid header url `{}`: {}", options.header_url, e))
    })?;

    let target = RuntimeTarget::resolve(
        &options.runtime,
        &options.target_version,
        options.abi.as_deref(),
    )?;
    let gyp_home = options
        .gyp_home
        .clone()
        .or_else(default_gyp_home)
        .ok_or_else(|| {
            RebuildError::configuration("could not determine a home directory for the build backends")
        })?;
    let mode = options.mode();

    events.emit(LifecycleEvent::Start);

    let root = real_path(&options.build_path).unwrap_or_else(|| options.build_path.clone());
    let manifest = PackageManifest::load(&root)?;

    let backends = match options.backends {
        Some(ref backends) => {
            backends.ensure_any()?;
            backends.clone()
        }
        None => BackendPaths::locate(&root, &options.platform)?,
    };

    let deps = classify(&root, &manifest, &options.types, &options.extra_modules);
    let mut tasks = collect_tasks(&root, &deps)?;
    tasks.push(RebuildTask::root(root.clone()));

    tracing::info!(
        "rebuilding {} for {} {} (abi {}, {}) in {} mode",
        root.display(),
        target.runtime,
        target.version,
        target.abi,
        options.arch,
        mode
    );
    tracing::debug!(
        "{} production dependencies, {} task(s)",
        deps.len(),
        tasks.len()
    );

    let rebuilder = ModuleRebuilder::new(
        RebuildContext {
            target: target.clone(),
            arch: options.arch.clone(),
            platform: options.platform.clone(),
            header_url: options.header_url.clone(),
            configuration: BuildConfiguration::from_debug(options.debug),
            force: options.force,
            only_modules: options.only_modules.clone(),
            gyp_home,
            backends,
        },
        events.clone(),
    );

    let outcomes = BuildScheduler::new(mode)
        .jobs(options.jobs)
        .run(&tasks, |task| {
            rebuilder
                .rebuild_task(task)
                .with_context(|| format!("failed to rebuild `{}`", task.path.display()))
        })?;

    let summary = RebuildSummary {
        target,
        mode,
        production_deps: deps.len(),
        modules: tasks.into_iter().map(|t| t.path).zip(outcomes).collect(),
    };
    tracing::info!(
        "{} rebuilt, {} up to date, {} prebuilt",
        summary.rebuilt(),
        summary.up_to_date(),
        summary.prebuilt()
    );
    Ok(summary)
}

/// A run in progress on a background thread.
pub struct RebuildHandle {
    /// Live lifecycle events; closes when the run ends
    pub events: Receiver<LifecycleEvent>,
    handle: JoinHandle<Result<RebuildSummary>>,
}

impl RebuildHandle {
    /// Wait for the run to finish.
    pub fn wait(self) -> Result<RebuildSummary> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => anyhow::bail!("rebuild thread panicked"),
        }
    }
}

/// Start a rebuild on a background thread.
pub fn start(options: RebuildOptions) -> Result<RebuildHandle> {
    let (sink, events) = EventSink::channel();
    let handle = std::thread::Builder::new()
        .name("rebuild".to_string())
        .spawn(move || rebuild(&options, &sink))
        .context("failed to start rebuild thread")?;
    Ok(RebuildHandle { events, handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TreeFixture;
    use serde_json::json;

    fn options(tree: &TreeFixture) -> RebuildOptions {
        let mut opts = RebuildOptions::new(tree.root(), "11.0.0");
        opts.platform = Platform::new("linux");
        opts.arch = "x64".to_string();
        opts.gyp_home = Some(tree.path(".gyp"));
        opts.backends = Some(BackendPaths {
            gyp: Some(PathBuf::from("/nonexistent/node-gyp")),
            pre_gyp: None,
        });
        opts
    }

    #[test]
    fn test_relative_build_path_fails_before_start() {
        let (sink, rx) = EventSink::channel();
        let opts = RebuildOptions::new("relative/app", "11.0.0");

        let err = rebuild(&opts, &sink).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RebuildError>(),
            Some(RebuildError::Configuration { .. })
        ));
        drop(sink);
        assert!(rx.iter().next().is_none());
    }

    #[test]
    fn test_invalid_header_url() {
        let tree = TreeFixture::new();
        let mut opts = options(&tree);
        opts.header_url = "not a url".to_string();

        let err = rebuild(&opts, &EventSink::disconnected()).unwrap_err();
        assert!(err.to_string().contains("invalid header url"));
    }

    #[test]
    fn test_missing_root_manifest_is_fatal() {
        let tree = TreeFixture::new();
        let err = rebuild(&options(&tree), &EventSink::disconnected()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RebuildError>(),
            Some(RebuildError::Manifest { .. })
        ));
    }

    #[test]
    fn test_no_native_modules() {
        let tree = TreeFixture::new();
        tree.package("", "app", json!({ "dependencies": { "a": "1" } }));
        tree.package("node_modules/a", "a", json!({}));

        let (sink, rx) = EventSink::channel();
        let summary = rebuild(&options(&tree), &sink).unwrap();
        drop(sink);

        assert_eq!(summary.production_deps, 1);
        assert_eq!(summary.modules.len(), 2);
        assert_eq!(summary.modules[1].0, tree.path(""));
        assert_eq!(summary.native(), 0);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![LifecycleEvent::Start]);
    }

    #[test]
    fn test_start_reports_through_handle() {
        let tree = TreeFixture::new();
        tree.package("", "app", json!({}));

        let handle = start(options(&tree)).unwrap();
        let events: Vec<_> = handle.events.iter().collect();
        assert_eq!(events, vec![LifecycleEvent::Start]);

        let summary = handle.wait().unwrap();
        assert_eq!(summary.target.abi, "85");
        assert_eq!(summary.mode, ExecutionMode::Parallel);
    }
}
