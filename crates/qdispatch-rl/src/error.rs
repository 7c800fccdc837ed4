//! Error types for the scheduler core

use thiserror::Error;

/// Errors raised by the scheduler core.
///
/// Every variant is produced by validation that runs before the value table
/// or the exploration rate is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input shape error: expected {expected} entries, got {actual}")]
    InputShape { expected: usize, actual: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid action: worker {action} out of range for {num_workers} workers")]
    InvalidAction { action: usize, num_workers: usize },

    #[error("Invalid reward: {0} is not finite")]
    InvalidReward(f64),
}

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
