//! Scheduler configuration and validation

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SchedulerError};

/// Number of distinct states above which construction logs a warning.
///
/// The value table never evicts rows, so its worst-case size is
/// `state_buckets ^ num_workers`.
pub const LARGE_STATE_SPACE: u64 = 1_000_000;

/// Parameters recognized at scheduler construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of parallel workers (actions)
    pub num_workers: usize,

    /// Buckets per worker used to discretize queue length
    pub state_buckets: usize,

    /// Learning rate, in (0, 1]
    pub alpha: f64,

    /// Discount factor, in [0, 1)
    pub gamma: f64,

    /// Initial exploration rate, in [0, 1]
    pub eps_start: f64,

    /// Exploration floor, in [0, eps_start]
    pub eps_min: f64,

    /// Multiplicative decay applied after every selection, in (0, 1]
    pub eps_decay: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: 3,
            state_buckets: 5,
            alpha: 0.6,
            gamma: 0.9,
            eps_start: 0.3,
            eps_min: 0.02,
            eps_decay: 0.999,
        }
    }
}

impl SchedulerConfig {
    /// Create a default configuration for the given number of workers
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Self::default()
        }
    }

    /// Disable exploration entirely (epsilon pinned at zero)
    pub fn greedy(mut self) -> Self {
        self.eps_start = 0.0;
        self.eps_min = 0.0;
        self
    }

    /// Check every parameter against its declared range.
    ///
    /// Out-of-range values are rejected, never clamped. NaN fails every
    /// range check.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers < 1 {
            return Err(SchedulerError::Config(
                "num_workers must be at least 1".to_string(),
            ));
        }
        if self.state_buckets < 2 {
            return Err(SchedulerError::Config(format!(
                "state_buckets must be at least 2, got {}",
                self.state_buckets
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(SchedulerError::Config(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(SchedulerError::Config(format!(
                "gamma must be in [0, 1), got {}",
                self.gamma
            )));
        }
        if !(0.0..=1.0).contains(&self.eps_start) {
            return Err(SchedulerError::Config(format!(
                "eps_start must be in [0, 1], got {}",
                self.eps_start
            )));
        }
        if !(0.0..=self.eps_start).contains(&self.eps_min) {
            return Err(SchedulerError::Config(format!(
                "eps_min must be in [0, eps_start={}], got {}",
                self.eps_start, self.eps_min
            )));
        }
        if !(self.eps_decay > 0.0 && self.eps_decay <= 1.0) {
            return Err(SchedulerError::Config(format!(
                "eps_decay must be in (0, 1], got {}",
                self.eps_decay
            )));
        }

        let bound = self.state_space_bound();
        if bound > LARGE_STATE_SPACE {
            warn!(
                "State space bound {} exceeds {} rows ({} buckets ^ {} workers); \
                 the value table is never pruned",
                bound, LARGE_STATE_SPACE, self.state_buckets, self.num_workers
            );
        }

        Ok(())
    }

    /// Upper bound on the number of value-table rows: `state_buckets ^ num_workers`.
    ///
    /// Saturates at `u64::MAX`.
    pub fn state_space_bound(&self) -> u64 {
        let Ok(exp) = u32::try_from(self.num_workers) else {
            return u64::MAX;
        };
        (self.state_buckets as u64).saturating_pow(exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.state_buckets, 5);
        assert_eq!(config.alpha, 0.6);
        assert_eq!(config.gamma, 0.9);
        assert_eq!(config.eps_start, 0.3);
        assert_eq!(config.eps_min, 0.02);
        assert_eq!(config.eps_decay, 0.999);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = SchedulerConfig::with_workers(0);
        assert!(matches!(config.validate(), Err(SchedulerError::Config(_))));
    }

    #[test]
    fn test_single_bucket_rejected() {
        let config = SchedulerConfig {
            state_buckets: 1,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rate_ranges() {
        let bad = [
            SchedulerConfig { alpha: 0.0, ..SchedulerConfig::default() },
            SchedulerConfig { alpha: 1.5, ..SchedulerConfig::default() },
            SchedulerConfig { alpha: f64::NAN, ..SchedulerConfig::default() },
            SchedulerConfig { gamma: 1.0, ..SchedulerConfig::default() },
            SchedulerConfig { gamma: -0.1, ..SchedulerConfig::default() },
            SchedulerConfig { eps_start: 1.1, ..SchedulerConfig::default() },
            SchedulerConfig { eps_min: 0.5, ..SchedulerConfig::default() },
            SchedulerConfig { eps_min: -0.01, ..SchedulerConfig::default() },
            SchedulerConfig { eps_decay: 0.0, ..SchedulerConfig::default() },
            SchedulerConfig { eps_decay: 1.01, ..SchedulerConfig::default() },
        ];

        for config in bad {
            assert!(config.validate().is_err(), "accepted {config:?}");
        }
    }

    #[test]
    fn test_boundary_values_accepted() {
        let config = SchedulerConfig {
            num_workers: 1,
            state_buckets: 2,
            alpha: 1.0,
            gamma: 0.0,
            eps_start: 1.0,
            eps_min: 1.0,
            eps_decay: 1.0,
        };
        assert!(config.validate().is_ok());
        assert!(SchedulerConfig::default().greedy().validate().is_ok());
    }

    #[test]
    fn test_state_space_bound() {
        assert_eq!(SchedulerConfig::default().state_space_bound(), 125);
        let huge = SchedulerConfig {
            num_workers: 64,
            state_buckets: 10,
            ..SchedulerConfig::default()
        };
        assert_eq!(huge.state_space_bound(), u64::MAX);
        assert!(huge.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = SchedulerConfig::with_workers(4);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SchedulerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let partial: SchedulerConfig = serde_json::from_str(r#"{"alpha": 0.25}"#).unwrap();
        assert_eq!(partial.alpha, 0.25);
        assert_eq!(partial.num_workers, 3);
    }
}
