//! Configuration loading for the qdispatch CLI

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use qdispatch_rl::SchedulerConfig;

/// Prefix for environment overrides, e.g. `QDISPATCH__SCHEDULER__ALPHA=0.5`
pub const ENV_PREFIX: &str = "QDISPATCH";

/// Complexity range accepted for simulated tasks, in seconds
pub const COMPLEXITY_RANGE: (f64, f64) = (0.1, 3.0);

/// Largest accepted multiplier on simulated delays
pub const MAX_TIME_SCALE: f64 = 1000.0;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub simulation: SimulationConfig,
}

/// Parameters of the simulated task stream and worker substrate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of tasks to submit
    pub tasks: usize,
    /// Nominal processing time of each task in seconds
    pub complexity: f64,
    /// Relative jitter applied to processing time (0.2 = +/-20%)
    pub jitter: f64,
    /// Maximum number of tasks in flight at once
    pub concurrency: usize,
    /// Seed for scheduler and jitter; entropy when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Multiplier applied to every simulated delay
    pub time_scale: f64,
    /// Value-table rows shown in the report
    pub snapshot_rows: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tasks: 20,
            complexity: 1.0,
            jitter: 0.2,
            concurrency: 1,
            seed: None,
            time_scale: 1.0,
            snapshot_rows: 8,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        let (min, max) = COMPLEXITY_RANGE;
        if !(min..=max).contains(&self.complexity) {
            bail!(
                "simulation.complexity must be in [{min}, {max}], got {}",
                self.complexity
            );
        }
        if !(0.0..1.0).contains(&self.jitter) {
            bail!("simulation.jitter must be in [0, 1), got {}", self.jitter);
        }
        if self.concurrency < 1 {
            bail!("simulation.concurrency must be at least 1");
        }
        if !(self.time_scale > 0.0 && self.time_scale <= MAX_TIME_SCALE) {
            bail!(
                "simulation.time_scale must be in (0, {MAX_TIME_SCALE}], got {}",
                self.time_scale
            );
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };
        Self::load_from(path.as_deref(), ENV_PREFIX)
    }

    /// Build configuration from an optional file plus environment overrides
    pub fn load_from(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = path {
            tracing::info!("Loading config from: {:?}", path);
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        } else {
            tracing::info!("No config file found, using defaults");
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate both sections
    pub fn validate(&self) -> Result<()> {
        self.scheduler
            .validate()
            .context("Invalid scheduler configuration")?;
        self.simulation
            .validate()
            .context("Invalid simulation configuration")
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Find the configuration file
    pub fn find_config_file() -> Option<PathBuf> {
        // Check in order: QDISPATCH_CONFIG env, ./qdispatch.toml, ~/.config/qdispatch/qdispatch.toml
        if let Ok(path) = std::env::var("QDISPATCH_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("qdispatch.toml");
        if local.exists() {
            return Some(local);
        }

        Self::user_config_path().filter(|path| path.exists())
    }

    /// Per-user configuration path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("qdispatch").join("qdispatch.toml"))
    }
}
