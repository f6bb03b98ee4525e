//! High-level operations.
//!
//! This module contains the entry points that drive a rebuild run.

pub mod rebuild;

pub use rebuild::{rebuild, start, RebuildHandle, RebuildOptions, RebuildSummary, DEFAULT_HEADER_URL};
