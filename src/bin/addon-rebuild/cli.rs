//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Rebuild native Node addons against a target runtime ABI
#[derive(Parser)]
#[command(name = "addon-rebuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Project directory to rebuild (defaults to the current directory)
    #[arg(short = 'm', long, value_name = "DIR")]
    pub module_dir: Option<PathBuf>,

    /// Runtime version to build for (e.g., 11.0.0)
    #[arg(short = 't', long, value_name = "VERSION")]
    pub target: Option<String>,

    /// Architecture to build for (defaults to the host)
    #[arg(short = 'a', long)]
    pub arch: Option<String>,

    /// Module ABI to build for, skipping the version lookup
    #[arg(long)]
    pub abi: Option<String>,

    /// Runtime name (defaults to electron)
    #[arg(long)]
    pub runtime: Option<String>,

    /// Also rebuild this package (can be repeated)
    #[arg(short = 'e', long = "extra-module", value_name = "NAME")]
    pub extra_modules: Vec<String>,

    /// Only rebuild these modules (comma-separated)
    #[arg(short = 'o', long, value_delimiter = ',', value_name = "NAMES")]
    pub only: Vec<String>,

    /// Rebuild even if already built for the target
    #[arg(short, long)]
    pub force: bool,

    /// URL to download runtime headers from
    #[arg(short = 'd', long, value_name = "URL")]
    pub dist_url: Option<String>,

    /// Dependency kinds to rebuild: prod, optional, dev (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "TYPES")]
    pub types: Vec<String>,

    /// Rebuild all modules at once
    #[arg(short = 'p', long, conflicts_with = "sequential")]
    pub parallel: bool,

    /// Rebuild modules one at a time
    #[arg(short = 's', long)]
    pub sequential: bool,

    /// Build the Debug configuration
    #[arg(long)]
    pub debug: bool,

    /// Maximum number of modules built at once in parallel mode
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Home directory for the build backends' header cache
    #[arg(long, value_name = "DIR", env = "ADDON_REBUILD_GYP_HOME")]
    pub gyp_home: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,
}

/// How progress is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    /// Progress spinner and a summary line
    Human,
    /// One JSON lifecycle event per line on stdout
    Json,
}
