//! multitrack: rollout tracking from the command line.
//!
//! # Usage
//!
//! ```text
//! multitrack validate rollout.toml
//! multitrack replay rollout.toml --report-interval 2s
//! ```
//!
//! `validate` loads a rollout file and prints the normalized specs as
//! JSON. `replay` runs the rollout against the scripts embedded in the
//! file and exits non-zero if the rollout fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use multitrack::config::parse_duration;
use multitrack::{ReplayClient, ReplayTracker, RolloutConfig, Trackers};

#[derive(Parser)]
#[command(name = "multitrack", about = "Track a rollout across pods, deployments, stateful sets, daemon sets and jobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a rollout file and print its normalized specs.
    Validate {
        /// Rollout file (TOML).
        file: PathBuf,
    },
    /// Replay the scripted events of a rollout file.
    Replay {
        /// Rollout file (TOML).
        file: PathBuf,

        /// Override the status report interval, e.g. "500ms" or "5s".
        #[arg(long)]
        report_interval: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,multitrack=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { file } => validate(&file),
        Command::Replay {
            file,
            report_interval,
        } => replay(&file, report_interval.as_deref()).await,
    }
}

fn validate(file: &Path) -> anyhow::Result<()> {
    let config = RolloutConfig::from_file(file)?;
    config.options()?;

    let mut specs = config.specs();
    specs.normalize();
    info!(path = ?file, resources = specs.len(), "rollout file valid");

    println!("{}", serde_json::to_string_pretty(&specs)?);
    Ok(())
}

async fn replay(file: &Path, report_interval: Option<&str>) -> anyhow::Result<()> {
    let config = RolloutConfig::from_file(file)?;

    let mut opts = config.options()?;
    if let Some(interval) = report_interval {
        opts.status_report_interval = parse_duration(interval)?;
    }

    let specs = config.specs();
    info!(path = ?file, resources = specs.len(), "replaying rollout");

    let trackers: Trackers<ReplayClient> = Trackers::uniform(Arc::new(ReplayTracker));
    multitrack::multitrack(Arc::new(config.replay_client()), &trackers, specs, opts).await?;

    info!("rollout complete");
    Ok(())
}
