//! Production dependency classification.
//!
//! Decides which installed package names count as production dependencies:
//! everything reachable from the root manifest's selected dependency
//! sections through `dependencies` and `optionalDependencies` edges, to any
//! depth.
//!
//! Nested installs are found the way the runtime resolves them: starting at
//! the declaring package and walking up toward the project root, checking
//! each level's `node_modules` for the name. A name can be installed at
//! several levels at once; every copy is explored.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::core::manifest::{DependencyKind, PackageManifest};

/// Name of the installed-dependency directory.
pub const NODE_MODULES: &str = "node_modules";

/// The set of production package names.
///
/// Names are only ever added. Insertion is an atomic check-and-insert so
/// parallel explorers never explore the same name twice.
#[derive(Debug, Default)]
pub struct ProductionDeps {
    names: Mutex<BTreeSet<String>>,
}

impl ProductionDeps {
    /// Create an empty set.
    pub fn new() -> Self {
        ProductionDeps::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        // Insertions cannot leave the set half-updated, so a poisoned lock
        // still guards valid data.
        self.names.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a name, returning whether it was new.
    pub fn insert(&self, name: &str) -> bool {
        let mut names = self.lock();
        if names.contains(name) {
            false
        } else {
            names.insert(name.to_string())
        }
    }

    /// Whether a fully qualified package name is a production dependency.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    /// Number of names in the set.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }
}

/// Computes production dependencies for a project.
pub struct DependencyClassifier<'a> {
    root: &'a Path,
    deps: ProductionDeps,
}

impl<'a> DependencyClassifier<'a> {
    /// Create a classifier for the project at `root`.
    pub fn new(root: &'a Path) -> Self {
        DependencyClassifier {
            root,
            deps: ProductionDeps::new(),
        }
    }

    /// Classify starting from the root manifest's selected sections.
    ///
    /// `extra` names are added to the set without being explored.
    pub fn classify(
        self,
        manifest: &PackageManifest,
        kinds: &BTreeSet<DependencyKind>,
        extra: &[String],
    ) -> ProductionDeps {
        let this = &self;
        rayon::scope(|s| {
            for &kind in kinds {
                for name in manifest.dependency_names(kind) {
                    if !this.deps.insert(name) {
                        continue;
                    }
                    let dir = this.root.join(NODE_MODULES).join(name);
                    s.spawn(move |s| this.explore(s, dir));
                }
            }
        });

        for name in extra {
            self.deps.insert(name);
        }

        tracing::debug!("{} production dependencies", self.deps.len());
        self.deps
    }

    /// Mark the dependencies of the package at `module_dir`, fanning out
    /// into every installed copy of each newly seen name.
    fn explore<'s>(&'s self, scope: &rayon::Scope<'s>, module_dir: PathBuf) {
        let Some(manifest) = PackageManifest::load_if_installed(&module_dir) else {
            return;
        };
        tracing::debug!("exploring {}", module_dir.display());

        for name in manifest.runtime_dependency_names() {
            if !self.deps.insert(name) {
                continue;
            }
            for found in self.find_module(name, &module_dir) {
                scope.spawn(move |s| self.explore(s, found));
            }
        }
    }

    /// Every installed directory for `name` visible from `from_dir`.
    fn find_module(&self, name: &str, from_dir: &Path) -> Vec<PathBuf> {
        from_dir
            .ancestors()
            .take_while(|dir| dir.starts_with(self.root))
            .map(|dir| dir.join(NODE_MODULES).join(name))
            .filter(|candidate| candidate.is_dir())
            .collect()
    }
}

/// Compute the production dependency set for the project at `root`.
pub fn classify(
    root: &Path,
    manifest: &PackageManifest,
    kinds: &BTreeSet<DependencyKind>,
    extra: &[String],
) -> ProductionDeps {
    DependencyClassifier::new(root).classify(manifest, kinds, extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::default_dependency_kinds;
    use crate::test_support::TreeFixture;
    use serde_json::json;

    fn run(tree: &TreeFixture, kinds: &BTreeSet<DependencyKind>) -> ProductionDeps {
        let manifest = PackageManifest::load(tree.root()).unwrap();
        classify(tree.root(), &manifest, kinds, &[])
    }

    #[test]
    fn test_insert_reports_new_names() {
        let deps = ProductionDeps::new();
        assert!(deps.insert("a"));
        assert!(!deps.insert("a"));
        assert!(deps.contains("a"));
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn test_optional_of_dependency_is_production() {
        let tree = TreeFixture::new();
        tree.package("", "app", json!({ "dependencies": { "a": "1" } }));
        tree.package("node_modules/a", "a", json!({ "optionalDependencies": { "b": "1" } }));
        tree.package("node_modules/b", "b", json!({}));

        let deps = run(&tree, &default_dependency_kinds());
        assert_eq!(deps.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_dev_dependencies_excluded_by_default() {
        let tree = TreeFixture::new();
        tree.package(
            "",
            "app",
            json!({ "dependencies": { "a": "1" }, "devDependencies": { "d": "1" } }),
        );
        tree.package("node_modules/a", "a", json!({ "devDependencies": { "x": "1" } }));
        tree.package("node_modules/d", "d", json!({ "dependencies": { "e": "1" } }));
        tree.package("node_modules/e", "e", json!({}));

        let deps = run(&tree, &default_dependency_kinds());
        assert_eq!(deps.names(), vec!["a"]);

        let all: BTreeSet<_> = [DependencyKind::Prod, DependencyKind::Dev].into_iter().collect();
        let deps = run(&tree, &all);
        assert_eq!(deps.names(), vec!["a", "d", "e"]);
    }

    #[test]
    fn test_nested_install_found_by_walking_up() {
        let tree = TreeFixture::new();
        tree.package("", "app", json!({ "dependencies": { "a": "1" } }));
        tree.package("node_modules/a", "a", json!({ "dependencies": { "b": "1" } }));
        tree.package("node_modules/a/node_modules/b", "b", json!({ "dependencies": { "c": "1" } }));
        // c is hoisted to the root
        tree.package("node_modules/c", "c", json!({ "dependencies": { "d": "1" } }));
        tree.package("node_modules/d", "d", json!({}));

        let deps = run(&tree, &default_dependency_kinds());
        assert_eq!(deps.names(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_every_installed_copy_is_explored() {
        let tree = TreeFixture::new();
        tree.package("", "app", json!({ "dependencies": { "a": "1" } }));
        tree.package("node_modules/a", "a", json!({ "dependencies": { "b": "2" } }));
        tree.package("node_modules/a/node_modules/b", "b", json!({ "dependencies": { "x": "1" } }));
        tree.package("node_modules/b", "b", json!({ "dependencies": { "y": "1" } }));
        tree.package("node_modules/x", "x", json!({}));
        tree.package("node_modules/y", "y", json!({}));

        let deps = run(&tree, &default_dependency_kinds());
        assert_eq!(deps.names(), vec!["a", "b", "x", "y"]);
    }

    #[test]
    fn test_missing_dependency_is_not_an_error() {
        let tree = TreeFixture::new();
        tree.package(
            "",
            "app",
            json!({ "dependencies": { "a": "1" }, "optionalDependencies": { "fsevents": "2" } }),
        );
        tree.package("node_modules/a", "a", json!({ "dependencies": { "gone": "1" } }));

        let deps = run(&tree, &default_dependency_kinds());
        assert_eq!(deps.names(), vec!["a", "fsevents", "gone"]);
    }

    #[test]
    fn test_cycles_terminate() {
        let tree = TreeFixture::new();
        tree.package("", "app", json!({ "dependencies": { "a": "1" } }));
        tree.package("node_modules/a", "a", json!({ "dependencies": { "b": "1" } }));
        tree.package("node_modules/b", "b", json!({ "dependencies": { "a": "1" } }));

        let deps = run(&tree, &default_dependency_kinds());
        assert_eq!(deps.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_scoped_names_and_extra_modules() {
        let tree = TreeFixture::new();
        tree.package("", "app", json!({ "dependencies": { "@scope/pkg": "1" } }));
        tree.package("node_modules/@scope/pkg", "@scope/pkg", json!({ "dependencies": { "c": "1" } }));
        tree.package("node_modules/c", "c", json!({}));

        let manifest = PackageManifest::load(tree.root()).unwrap();
        let deps = classify(
            tree.root(),
            &manifest,
            &default_dependency_kinds(),
            &["extra".to_string()],
        );
        assert!(deps.contains("@scope/pkg"));
        assert!(!deps.contains("pkg"));
        assert!(deps.contains("c"));
        assert!(deps.contains("extra"));
    }
}
