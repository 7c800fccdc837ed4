//! Simulation run command

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::Config;
use crate::report;
use crate::simulation::Simulator;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Number of tasks to submit
    #[arg(short = 'n', long)]
    pub tasks: Option<usize>,

    /// Task complexity in seconds (0.1 - 3.0)
    #[arg(long)]
    pub complexity: Option<f64>,

    /// Number of workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Maximum tasks in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Multiplier applied to every simulated delay
    #[arg(long)]
    pub time_scale: Option<f64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(tasks) = self.tasks {
            config.simulation.tasks = tasks;
        }
        if let Some(complexity) = self.complexity {
            config.simulation.complexity = complexity;
        }
        if let Some(workers) = self.workers {
            config.scheduler.num_workers = workers;
        }
        if let Some(concurrency) = self.concurrency {
            config.simulation.concurrency = concurrency;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if let Some(time_scale) = self.time_scale {
            config.simulation.time_scale = time_scale;
        }
    }
}

pub async fn run(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    args.apply(&mut config);
    config.validate()?;

    let simulator = Simulator::new(config.scheduler, config.simulation)?;
    let report = simulator.run().await?;

    let stats = simulator.scheduler().stats().await;
    tracing::debug!(
        "Scheduler stats: {} decisions ({:.1}% explored), {} updates, average reward {:.3}",
        stats.decisions,
        stats.exploration_ratio() * 100.0,
        stats.updates,
        stats.average_reward
    );

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        print!(
            "{}",
            report::render(&report).context("Failed to render report")?
        );
    }

    Ok(())
}
