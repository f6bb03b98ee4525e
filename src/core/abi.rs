//! Runtime ABI identity.
//!
//! A compiled addon only loads in a runtime whose module ABI matches the one
//! it was built against. The ABI is a small integer (`NODE_MODULE_VERSION`)
//! that changes with runtime releases; this module maps a runtime version to
//! that integer and renders the `node_abi` identifier used in binary-path
//! templates.

use anyhow::Result;
use semver::Version;

use crate::core::error::RebuildError;

/// Known ABI transitions: (runtime, major, minor, abi).
///
/// Entries for one runtime are sorted ascending; a version uses the last
/// entry at or below it.
const ABI_TABLE: &[(&str, u64, u64, &str)] = &[
    ("node", 4, 0, "46"),
    ("node", 5, 0, "47"),
    ("node", 6, 0, "48"),
    ("node", 7, 0, "51"),
    ("node", 8, 0, "57"),
    ("node", 9, 0, "59"),
    ("node", 10, 0, "64"),
    ("node", 11, 0, "67"),
    ("node", 12, 0, "72"),
    ("node", 13, 0, "79"),
    ("node", 14, 0, "83"),
    ("node", 15, 0, "88"),
    ("node", 16, 0, "93"),
    ("node", 17, 0, "102"),
    ("node", 18, 0, "108"),
    ("node", 19, 0, "111"),
    ("node", 20, 0, "115"),
    ("node", 21, 0, "120"),
    ("node", 22, 0, "127"),
    ("node", 23, 0, "131"),
    ("node", 24, 0, "137"),
    ("electron", 1, 0, "48"),
    ("electron", 1, 3, "49"),
    ("electron", 1, 4, "50"),
    ("electron", 1, 5, "51"),
    ("electron", 1, 6, "53"),
    ("electron", 1, 7, "54"),
    ("electron", 1, 8, "57"),
    ("electron", 2, 0, "57"),
    ("electron", 3, 0, "64"),
    ("electron", 4, 0, "69"),
    ("electron", 5, 0, "70"),
    ("electron", 6, 0, "73"),
    ("electron", 7, 0, "75"),
    ("electron", 8, 0, "76"),
    ("electron", 9, 0, "80"),
    ("electron", 10, 0, "82"),
    ("electron", 11, 0, "85"),
    ("electron", 12, 0, "87"),
    ("electron", 13, 0, "89"),
    ("electron", 14, 0, "97"),
    ("electron", 15, 0, "98"),
    ("electron", 16, 0, "99"),
    ("electron", 17, 0, "101"),
    ("electron", 18, 0, "103"),
    ("electron", 19, 0, "106"),
    ("electron", 20, 0, "107"),
    ("electron", 21, 0, "109"),
    ("electron", 22, 0, "110"),
    ("electron", 23, 0, "113"),
    ("electron", 24, 0, "114"),
    ("electron", 25, 0, "116"),
    ("electron", 27, 0, "118"),
    ("electron", 28, 0, "119"),
    ("electron", 29, 0, "121"),
    ("electron", 30, 0, "123"),
    ("electron", 31, 0, "125"),
    ("electron", 32, 0, "128"),
    ("electron", 33, 0, "130"),
    ("electron", 34, 0, "132"),
    ("electron", 35, 0, "133"),
];

/// Parse a runtime version, tolerating a leading `v` and missing components.
///
/// `"10"` and `"10.1"` are padded to `10.0.0` and `10.1.0`.
pub fn parse_runtime_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    let (core, rest) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    let padded = format!("{}{}", parts.join("."), rest);

    Version::parse(&padded).map_err(|e| {
        RebuildError::configuration(format!("invalid runtime version `{}`: {}", raw, e)).into()
    })
}

/// Look up the module ABI for a runtime version.
pub fn lookup_abi(runtime: &str, version: &Version) -> Result<String> {
    ABI_TABLE
        .iter()
        .filter(|(rt, major, minor, _)| {
            *rt == runtime && (*major, *minor) <= (version.major, version.minor)
        })
        .next_back()
        .map(|(_, _, _, abi)| abi.to_string())
        .ok_or_else(|| {
            RebuildError::UnknownAbi {
                runtime: runtime.to_string(),
                version: version.to_string(),
            }
            .into()
        })
}

/// The `{node_abi}` template value: `<runtime>-v<major>.<minor>`.
pub fn node_abi(runtime: &str, version: &Version) -> String {
    format!("{}-v{}.{}", runtime, version.major, version.minor)
}
