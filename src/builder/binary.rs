//! Binary-path templating.
//!
//! Packages that ship prebuilt binaries describe where those binaries live
//! in the `binary` section of their manifest, using `{placeholder}` tokens:
//!
//! ```json
//! "binary": {
//!   "module_name": "foo",
//!   "module_path": "./lib/binding/{configuration}/{node_abi}-{platform}-{arch}",
//!   "host": "https://example.com/releases/v{version}"
//! }
//! ```
//!
//! Each string field is forwarded to the backend as `--<key>=<value>` after
//! substitution. Substitution runs left to right over each field: the fixed
//! placeholders first, then `{<key>}` references to the section's own raw
//! fields.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::builder::BuildConfiguration;

/// Field whose resolved value is the module's binary output directory.
pub const MODULE_PATH_KEY: &str = "module_path";

/// Values for the fixed placeholders.
#[derive(Debug, Clone)]
pub struct TemplateValues {
    /// `{configuration}`
    pub configuration: BuildConfiguration,
    /// `{node_abi}`, e.g. "electron-v10.1"
    pub node_abi: String,
    /// `{platform}`
    pub platform: String,
    /// `{arch}`
    pub arch: String,
    /// `{version}`, the module's version
    pub version: String,
    /// `{name}`, the module's name
    pub name: String,
}

impl TemplateValues {
    fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("{configuration}", self.configuration.as_str()),
            ("{node_abi}", &self.node_abi),
            ("{platform}", &self.platform),
            ("{arch}", &self.arch),
            ("{version}", &self.version),
            ("{name}", &self.name),
        ]
    }
}

/// The `binary` section after substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBinary {
    /// `--<key>=<value>` backend arguments, in key order
    pub args: Vec<String>,
    /// Resolved `module_path`, joined onto the module directory
    pub module_path: Option<PathBuf>,
}

/// Substitute placeholders in a single field value.
pub fn substitute(value: &str, values: &TemplateValues, fields: &BTreeMap<String, String>) -> String {
    let mut out = value.to_string();
    for (token, replacement) in values.pairs() {
        out = out.replace(token, replacement);
    }
    for (key, raw) in fields {
        out = out.replace(&format!("{{{}}}", key), raw);
    }
    out
}

/// Resolve every string field of a `binary` section.
///
/// Non-string fields (such as `napi_versions` arrays) are not forwarded.
pub fn resolve_binary(
    binary: &BTreeMap<String, serde_json::Value>,
    values: &TemplateValues,
    module_dir: &Path,
) -> ResolvedBinary {
    let fields: BTreeMap<String, String> = binary
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|s| (key.clone(), s.to_string())))
        .collect();

    let mut resolved = ResolvedBinary::default();
    for (key, raw) in &fields {
        let mut value = substitute(raw, values, &fields);
        if key == MODULE_PATH_KEY {
            let path = join_relative(module_dir, Path::new(&value));
            value = path.display().to_string();
            resolved.module_path = Some(path);
        }
        resolved.args.push(format!("--{}={}", key, value));
    }

    for key in binary.keys().filter(|k| !fields.contains_key(*k)) {
        tracing::debug!("ignoring non-string binary field `{}`", key);
    }

    resolved
}

/// Join `rel` onto `base`, dropping `.` components.
fn join_relative(base: &Path, rel: &Path) -> PathBuf {
    let rel: PathBuf = rel
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    base.join(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values() -> TemplateValues {
        TemplateValues {
            configuration: BuildConfiguration::Release,
            node_abi: "electron-v10.1".to_string(),
            platform: "linux".to_string(),
            arch: "x64".to_string(),
            version: "2.3.4".to_string(),
            name: "foo".to_string(),
        }
    }

    fn section(value: serde_json::Value) -> BTreeMap<String, serde_json::Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_module_path_resolves_under_module_root() {
        let binary = section(json!({ "module_path": "./bin/{platform}-{arch}/{name}.node" }));
        let module_dir = Path::new("/proj/node_modules/foo");

        let resolved = resolve_binary(&binary, &values(), module_dir);

        let expected = module_dir.join("bin/linux-x64/foo.node");
        assert_eq!(resolved.module_path.as_deref(), Some(expected.as_path()));
        assert_eq!(
            resolved.args,
            vec![format!("--module_path={}", expected.display())]
        );
        assert!(!resolved.args[0].contains('{'));
    }

    #[test]
    fn test_raw_substitution() {
        let fields = BTreeMap::new();
        let out = substitute("./bin/{platform}-{arch}/{name}.node", &values(), &fields);
        assert_eq!(out, "./bin/linux-x64/foo.node");
    }

    #[test]
    fn test_all_fixed_placeholders() {
        let fields = BTreeMap::new();
        let out = substitute(
            "{configuration}/{node_abi}/{platform}/{arch}/{version}/{name}",
            &values(),
            &fields,
        );
        assert_eq!(out, "Release/electron-v10.1/linux/x64/2.3.4/foo");
    }

    #[test]
    fn test_repeated_placeholder_replaced_everywhere() {
        let fields = BTreeMap::new();
        assert_eq!(substitute("{arch}-{arch}", &values(), &fields), "x64-x64");
    }

    #[test]
    fn test_cross_references_between_fields() {
        let binary = section(json!({
            "module_name": "foo_binding",
            "module_path": "./lib/{module_name}/{node_abi}",
            "host": "https://example.com/v{version}"
        }));

        let resolved = resolve_binary(&binary, &values(), Path::new("/m"));

        assert_eq!(
            resolved.args,
            vec![
                "--host=https://example.com/v2.3.4".to_string(),
                "--module_name=foo_binding".to_string(),
                "--module_path=/m/lib/foo_binding/electron-v10.1".to_string(),
            ]
        );
    }

    #[test]
    fn test_debug_configuration() {
        let mut values = values();
        values.configuration = BuildConfiguration::Debug;
        let fields = BTreeMap::new();
        assert_eq!(substitute("build/{configuration}", &values, &fields), "build/Debug");
    }

    #[test]
    fn test_non_string_fields_skipped() {
        let binary = section(json!({ "module_name": "foo", "napi_versions": [3, 6] }));
        let resolved = resolve_binary(&binary, &values(), Path::new("/m"));
        assert_eq!(resolved.args, vec!["--module_name=foo".to_string()]);
        assert!(resolved.module_path.is_none());
    }
}
