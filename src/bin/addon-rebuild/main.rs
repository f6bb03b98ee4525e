//! addon-rebuild CLI - rebuild native Node addons for another runtime

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

mod cli;

use addon_rebuild::builder::{ExecutionMode, LifecycleEvent};
use addon_rebuild::core::manifest::default_dependency_kinds;
use addon_rebuild::core::{host_arch, DependencyKind, RebuildError, DEFAULT_RUNTIME};
use addon_rebuild::ops::{start, RebuildOptions, RebuildSummary, DEFAULT_HEADER_URL};
use addon_rebuild::util::config::{global_config_path, load_config, project_config_path};
use cli::{Cli, MessageFormat};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("addon_rebuild=debug")
    } else {
        EnvFilter::new("addon_rebuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let format = cli.message_format;
    let verbose = cli.verbose;
    let options = build_options(cli)?;

    let summary = match format {
        MessageFormat::Json => run_json(options)?,
        MessageFormat::Human => run_human(options, verbose)?,
    };

    if format == MessageFormat::Human {
        eprintln!(
            "Rebuild complete: {} rebuilt, {} up to date, {} prebuilt ({} {}, abi {})",
            summary.rebuilt(),
            summary.up_to_date(),
            summary.prebuilt(),
            summary.target.runtime,
            summary.target.version,
            summary.target.abi
        );
    }

    Ok(())
}

/// Combine CLI flags with configuration files (CLI > project > global).
fn build_options(cli: Cli) -> Result<RebuildOptions> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let module_dir = match cli.module_dir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let config = load_config(
        global_config_path().as_deref(),
        &project_config_path(&module_dir),
    );

    let target = cli.target.or(config.rebuild.target.clone()).ok_or_else(|| {
        RebuildError::configuration(
            "no runtime version given; pass --target or set `rebuild.target` in config",
        )
    })?;

    let mut options = RebuildOptions::new(module_dir, target);
    options.arch = cli
        .arch
        .or(config.rebuild.arch.clone())
        .unwrap_or_else(host_arch);
    options.abi = cli.abi.or(config.rebuild.abi.clone());
    options.runtime = cli
        .runtime
        .or(config.rebuild.runtime.clone())
        .unwrap_or_else(|| DEFAULT_RUNTIME.to_string());
    options.header_url = cli
        .dist_url
        .or(config.rebuild.dist_url.clone())
        .unwrap_or_else(|| DEFAULT_HEADER_URL.to_string());

    options.extra_modules = config.rebuild.extra_modules.clone();
    options.extra_modules.extend(cli.extra_modules);
    options.only_modules = if cli.only.is_empty() {
        config.rebuild.only.clone()
    } else {
        cli.only
    };

    options.types = if cli.types.is_empty() {
        config.types()?.unwrap_or_else(default_dependency_kinds)
    } else {
        cli.types
            .iter()
            .map(|s| s.parse::<DependencyKind>().map_err(anyhow::Error::msg))
            .collect::<Result<_>>()?
    };

    options.mode = if cli.parallel {
        Some(ExecutionMode::Parallel)
    } else if cli.sequential {
        Some(ExecutionMode::Sequential)
    } else {
        config.mode()?
    };

    options.force = cli.force || config.rebuild.force;
    options.debug = cli.debug || config.rebuild.debug;
    options.jobs = cli.jobs.or(config.rebuild.jobs);
    options.gyp_home = cli.gyp_home.or(config.rebuild.gyp_home.clone());

    tracing::debug!("options: {:?}", options);
    Ok(options)
}

/// Print each lifecycle event as a JSON line.
fn run_json(options: RebuildOptions) -> Result<RebuildSummary> {
    let handle = start(options)?;
    for event in handle.events.iter() {
        println!("{}", event.to_json());
    }
    handle.wait()
}

/// Show a spinner tracking module progress.
fn run_human(options: RebuildOptions, verbose: bool) -> Result<RebuildSummary> {
    let pb = if verbose {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let handle = start(options)?;
    let mut found = 0usize;
    let mut done = 0usize;
    let mut last: Option<String> = None;

    for event in handle.events.iter() {
        match event {
            LifecycleEvent::Start => pb.set_message("Searching dependency tree"),
            LifecycleEvent::ModuleFound { name } => {
                found += 1;
                last = Some(name);
            }
            LifecycleEvent::ModuleDone => done += 1,
            LifecycleEvent::ModuleSkip => {}
        }
        if let Some(ref name) = last {
            pb.set_message(format!("Building module {} ({}/{} done)", name, done, found));
        }
    }

    let result = handle.wait();
    pb.finish_and_clear();
    result
}
