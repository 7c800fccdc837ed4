//! qdispatch CLI - Learned task dispatch simulator
//!
//! Submits simulated tasks to a Q-learning scheduler that routes each one to
//! a worker, then prints queue status, learning progress, the task log and a
//! snapshot of the learned value table.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod report;
mod simulation;

use commands::{config as config_cmd, run};

#[derive(Parser)]
#[command(name = "qdispatch")]
#[command(version, about = "qdispatch - learned task dispatch simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $QDISPATCH_CONFIG, ./qdispatch.toml, ~/.config/qdispatch/qdispatch.toml)
    #[arg(short, long, global = true, env = "QDISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a dispatch simulation
    Run(run::RunArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("qdispatch_cli={log_level},qdispatch_rl={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run(args) => run::run(args, config_path).await,
        Commands::Config(cmd) => config_cmd::run(cmd, config_path).await,
    }
}
