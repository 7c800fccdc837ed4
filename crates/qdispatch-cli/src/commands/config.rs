//! Configuration management commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (file + environment)
    Show,
    /// Validate the effective configuration
    Validate,
    /// Initialize configuration file
    Init {
        /// Where to write the file
        #[arg(short, long, default_value = "qdispatch.toml")]
        path: PathBuf,

        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn run(cmd: ConfigCommands, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config_path).await,
        ConfigCommands::Validate => validate(config_path).await,
        ConfigCommands::Init { path, force } => init(&path, force).await,
    }
}

async fn show(config_path: Option<&Path>) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    match config_path
        .map(Path::to_path_buf)
        .or_else(Config::find_config_file)
    {
        Some(path) => println!("Config file: {}\n", path.display()),
        None => println!("No configuration file found. Using defaults.\n"),
    }

    let config = Config::load(config_path)?;
    println!("{}", config.to_toml()?);

    Ok(())
}

async fn validate(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    config.validate()?;

    println!("Configuration is valid");
    println!(
        "  State space bound: {} rows ({} buckets ^ {} workers)",
        config.scheduler.state_space_bound(),
        config.scheduler.state_buckets,
        config.scheduler.num_workers
    );

    Ok(())
}

async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    let contents = format!(
        "# qdispatch configuration\n\
         # Environment overrides use QDISPATCH__<SECTION>__<KEY>, e.g. QDISPATCH__SCHEDULER__ALPHA=0.5\n\n{}",
        Config::default().to_toml()?
    );

    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Configuration file created: {}", path.display());

    Ok(())
}
