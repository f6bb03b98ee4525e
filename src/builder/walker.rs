//! Dependency tree traversal.
//!
//! Walks `node_modules` directories and turns every production dependency
//! it finds into a rebuild task. Each physical directory is handled at most
//! once no matter how many symlinks or nested trees lead to it, which keeps
//! symlinked installs from looping and keeps hoisted packages from being
//! rebuilt twice.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::scheduler::RebuildTask;
use crate::resolver::production::{ProductionDeps, NODE_MODULES};
use crate::util::fs::{list_dir_names, real_path};

/// Prefix marking a scope directory (`@scope/pkg`).
pub const SCOPE_MARKER: char = '@';

/// Single-pass walker over installed dependency trees.
///
/// The walker is sequential, so its visited sets need no locking.
pub struct ModuleWalker<'a> {
    deps: &'a ProductionDeps,
    scanned_containers: HashSet<PathBuf>,
    visited_modules: HashSet<PathBuf>,
    tasks: Vec<RebuildTask>,
}

impl<'a> ModuleWalker<'a> {
    /// Create a walker guided by a production dependency set.
    pub fn new(deps: &'a ProductionDeps) -> Self {
        ModuleWalker {
            deps,
            scanned_containers: HashSet::new(),
            visited_modules: HashSet::new(),
            tasks: Vec::new(),
        }
    }

    /// Walk a `node_modules` directory, qualifying entry names with `prefix`.
    pub fn walk(&mut self, container: &Path, prefix: &str) -> Result<()> {
        let Some(real_container) = real_path(container) else {
            tracing::debug!("{} is not present", container.display());
            return Ok(());
        };
        if !self.scanned_containers.insert(real_container.clone()) {
            return Ok(());
        }

        for name in list_dir_names(&real_container)? {
            let entry = real_container.join(&name);
            let Some(real_entry) = real_path(&entry) else {
                // Dangling symlink
                continue;
            };
            if !self.visited_modules.insert(real_entry.clone()) {
                continue;
            }

            let is_scope = name.starts_with(SCOPE_MARKER);
            let qualified = format!("{}{}", prefix, name);
            if !is_scope && self.deps.contains(&qualified) {
                tracing::debug!("queueing {} ({})", qualified, real_entry.display());
                self.tasks.push(RebuildTask::module(real_entry.clone()));
            }

            if is_scope {
                self.walk(&real_entry, &format!("{}/", name))?;
            }

            let nested = real_entry.join(NODE_MODULES);
            if nested.is_dir() {
                self.walk(&nested, "")?;
            }
        }

        Ok(())
    }

    /// Finish walking and return the collected tasks in traversal order.
    pub fn into_tasks(self) -> Vec<RebuildTask> {
        self.tasks
    }
}

/// Collect rebuild tasks for every production dependency under `root`.
pub fn collect_tasks(root: &Path, deps: &ProductionDeps) -> Result<Vec<RebuildTask>> {
    let mut walker = ModuleWalker::new(deps);
    walker.walk(&root.join(NODE_MODULES), "")?;
    Ok(walker.into_tasks())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TreeFixture;
    use serde_json::json;

    fn deps(names: &[&str]) -> ProductionDeps {
        let deps = ProductionDeps::new();
        for name in names {
            deps.insert(name);
        }
        deps
    }

    fn task_paths(tasks: &[RebuildTask]) -> Vec<PathBuf> {
        tasks.iter().map(|t| t.path.clone()).collect()
    }

    #[test]
    fn test_only_production_packages_become_tasks() {
        let tree = TreeFixture::new();
        tree.package("node_modules/a", "a", json!({}));
        tree.package("node_modules/devonly", "devonly", json!({}));

        let tasks = collect_tasks(tree.root(), &deps(&["a"])).unwrap();
        assert_eq!(task_paths(&tasks), vec![tree.path("node_modules/a")]);
        assert!(!tasks[0].is_root);
    }

    #[test]
    fn test_missing_node_modules() {
        let tree = TreeFixture::new();
        let tasks = collect_tasks(tree.root(), &deps(&["a"])).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_scoped_packages_match_full_name() {
        let tree = TreeFixture::new();
        tree.package("node_modules/@scope/pkg", "@scope/pkg", json!({}));
        tree.package("node_modules/pkg", "pkg", json!({}));

        let tasks = collect_tasks(tree.root(), &deps(&["@scope/pkg"])).unwrap();
        assert_eq!(task_paths(&tasks), vec![tree.path("node_modules/@scope/pkg")]);

        // Bare name does not match the scoped package.
        let tasks = collect_tasks(tree.root(), &deps(&["pkg"])).unwrap();
        assert_eq!(task_paths(&tasks), vec![tree.path("node_modules/pkg")]);
    }

    #[test]
    fn test_scope_directory_is_never_a_task() {
        let tree = TreeFixture::new();
        tree.package("node_modules/@scope/pkg", "@scope/pkg", json!({}));

        let tasks = collect_tasks(tree.root(), &deps(&["@scope"])).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_nested_trees_restart_prefix() {
        let tree = TreeFixture::new();
        tree.package("node_modules/@scope/pkg", "@scope/pkg", json!({}));
        tree.package("node_modules/@scope/pkg/node_modules/inner", "inner", json!({}));

        let tasks = collect_tasks(tree.root(), &deps(&["inner"])).unwrap();
        assert_eq!(
            task_paths(&tasks),
            vec![tree.path("node_modules/@scope/pkg/node_modules/inner")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_two_symlinks_to_one_package_yield_one_task() {
        let tree = TreeFixture::new();
        tree.package("store/native", "native", json!({}));
        tree.link("store/native", "node_modules/native");
        tree.package("node_modules/a", "a", json!({}));
        tree.link("store/native", "node_modules/a/node_modules/native");

        let tasks = collect_tasks(tree.root(), &deps(&["a", "native"])).unwrap();
        let paths = task_paths(&tasks);
        assert_eq!(paths.len(), 2);
        assert_eq!(
            paths.iter().filter(|p| **p == tree.path("store/native")).count(),
            1
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let tree = TreeFixture::new();
        tree.package("node_modules/a", "a", json!({}));
        // a/node_modules/again points back at a itself
        tree.link("node_modules/a", "node_modules/a/node_modules/again");

        let tasks = collect_tasks(tree.root(), &deps(&["a", "again"])).unwrap();
        assert_eq!(task_paths(&tasks), vec![tree.path("node_modules/a")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_skipped() {
        let tree = TreeFixture::new();
        tree.package("node_modules/a", "a", json!({}));
        tree.link("nowhere", "node_modules/broken");

        let tasks = collect_tasks(tree.root(), &deps(&["a", "broken"])).unwrap();
        assert_eq!(task_paths(&tasks), vec![tree.path("node_modules/a")]);
    }
}
