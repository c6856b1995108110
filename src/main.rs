//! Fixture rules CLI entry point.
//!
//! Applies a rule configuration to a tree of recorded HTTP fixtures.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use fixture_rules::{FixtureConfig, FixtureModifier, Mode, ProcessScriptRunner, TracingReporter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fixture-rules")]
#[command(
    author,
    version,
    about = "Rewrite recorded HTTP fixtures and their index files"
)]
#[command(group(ArgGroup::new("mode").required(true).multiple(true)))]
struct Args {
    /// Modify matching index lines
    #[arg(short, long, group = "mode")]
    index: bool,

    /// Modify matching fixture bodies
    #[arg(short, long, group = "mode")]
    stubs: bool,

    /// Configuration file path (YAML or JSON)
    config: PathBuf,

    /// Root of the fixture tree
    fixtures: PathBuf,

    /// Validate configuration and exit.
    #[arg(long)]
    validate: bool,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Selected modes, stubs first.
    fn modes(&self) -> Vec<Mode> {
        let mut modes = Vec::new();
        if self.stubs {
            modes.push(Mode::Stubs);
        }
        if self.index {
            modes.push(Mode::Index);
        }
        modes
    }
}

/// Resolve a path next to the executable first, then as given.
fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_relative() {
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(path)));
        if let Some(candidate) = beside_exe {
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    if path.exists() {
        Ok(path.to_path_buf())
    } else {
        bail!("Path does not exist: {}", path.display())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    let config_path = resolve_input_path(&args.config).context("Invalid configuration path")?;
    let fixtures_root = resolve_input_path(&args.fixtures).context("Invalid fixtures path")?;

    let config = FixtureConfig::from_path(&config_path)
        .with_context(|| format!("Failed to load config file: {}", config_path.display()))?;

    let runner = ProcessScriptRunner::for_config(&config);
    let reporter = TracingReporter;
    let modifier = FixtureModifier::new(&config, &runner, &reporter)?;

    let modes = args.modes();
    if args.validate {
        for mode in &modes {
            modifier.supports(*mode)?;
        }
        info!(config = %config_path.display(), "Configuration is valid");
        return Ok(());
    }

    info!(
        config = %config_path.display(),
        fixtures = %fixtures_root.display(),
        modes = ?modes,
        "Starting fixture modification"
    );

    let summary = modifier.run(&fixtures_root, &modes)?;

    info!(
        examined = summary.examined,
        modified = summary.modified,
        failed = summary.failed,
        "Fixture modification finished"
    );

    Ok(())
}
