//! Rebuild scheduling.
//!
//! Runs the collected rebuild tasks either all at once or strictly in order.
//! The root project's own task is always last in the list.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::core::platform::Platform;

/// A deferred rebuild of one package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildTask {
    /// Canonical package directory
    pub path: PathBuf,
    /// Whether this is the project itself rather than a dependency
    pub is_root: bool,
}

impl RebuildTask {
    /// A task for an installed dependency.
    pub fn module(path: PathBuf) -> Self {
        RebuildTask {
            path,
            is_root: false,
        }
    }

    /// The task for the project root.
    pub fn root(path: PathBuf) -> Self {
        RebuildTask {
            path,
            is_root: true,
        }
    }
}

/// How tasks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// One task at a time, in list order.
    Sequential,
    /// Every task at once.
    Parallel,
}

impl ExecutionMode {
    /// Default mode for a platform.
    ///
    /// The Windows native toolchain does not tolerate concurrent builds.
    pub fn default_for(platform: &Platform) -> Self {
        if platform.is_windows() {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel
        }
    }

    /// Get the mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            _ => Err(format!(
                "invalid mode '{}'; expected 'sequential' or 'parallel'",
                s
            )),
        }
    }
}

/// Executes rebuild tasks under an execution mode.
#[derive(Debug, Clone)]
pub struct BuildScheduler {
    mode: ExecutionMode,
    jobs: Option<usize>,
}

impl BuildScheduler {
    /// Create a scheduler.
    pub fn new(mode: ExecutionMode) -> Self {
        BuildScheduler { mode, jobs: None }
    }

    /// Bound the number of tasks running at once in parallel mode.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Get the execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Run every task, returning results in task order.
    ///
    /// Sequential mode stops at the first failure. Parallel mode lets every
    /// started task finish before reporting the first failure.
    pub fn run<T, F>(&self, tasks: &[RebuildTask], run_task: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&RebuildTask) -> Result<T> + Sync,
    {
        match self.mode {
            ExecutionMode::Sequential => tasks.iter().map(run_task).collect(),
            ExecutionMode::Parallel => {
                // One thread per task unless bounded: tasks spend their time
                // waiting on backend processes, not on CPU.
                let threads = self.jobs.unwrap_or(tasks.len()).max(1);
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("rebuild-{}", i))
                    .build()
                    .context("failed to start rebuild workers")?;

                tracing::debug!("running {} task(s) on {} thread(s)", tasks.len(), threads);

                let results: Vec<Result<T>> =
                    pool.install(|| tasks.par_iter().with_max_len(1).map(&run_task).collect());

                results.into_iter().collect()
            }
        }
    }
}
