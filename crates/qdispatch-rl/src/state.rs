//! State representation and queue-length discretization

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Queue lengths at or above this value land in the top bucket
pub const QUEUE_CEILING: usize = 20;

/// Discretized system load: one bucket index per worker.
///
/// Two load vectors that bucket identically are the same state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State(Vec<usize>);

impl State {
    /// Build a state directly from bucket indices
    pub fn from_buckets(buckets: Vec<usize>) -> Self {
        Self(buckets)
    }

    /// Bucket indices in worker order
    pub fn buckets(&self) -> &[usize] {
        &self.0
    }

    /// Number of workers this state describes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, bucket) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{bucket}")?;
        }
        write!(f, ")")
    }
}

/// Maps raw per-worker queue lengths onto a bounded [`State`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEncoder {
    num_workers: usize,
    state_buckets: usize,
}

impl StateEncoder {
    pub fn new(num_workers: usize, state_buckets: usize) -> Self {
        Self {
            num_workers,
            state_buckets,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn state_buckets(&self) -> usize {
        self.state_buckets
    }

    /// Bucket a single queue length.
    ///
    /// The length is clamped to [`QUEUE_CEILING`], normalized into [0, 1] and
    /// floored onto `0..state_buckets`.
    pub fn bucket(&self, queue_length: usize) -> usize {
        let normalized = queue_length.min(QUEUE_CEILING) as f64 / QUEUE_CEILING as f64;
        (normalized * (self.state_buckets - 1) as f64).floor() as usize
    }

    /// Encode a full load vector into a state
    pub fn encode(&self, queue_lengths: &[usize]) -> Result<State> {
        if queue_lengths.len() != self.num_workers {
            return Err(SchedulerError::InputShape {
                expected: self.num_workers,
                actual: queue_lengths.len(),
            });
        }

        Ok(State(
            queue_lengths.iter().map(|&l| self.bucket(l)).collect(),
        ))
    }

    /// Check that a state could have been produced by this encoder
    pub fn check(&self, state: &State) -> Result<()> {
        if state.len() != self.num_workers {
            return Err(SchedulerError::InputShape {
                expected: self.num_workers,
                actual: state.len(),
            });
        }
        if let Some(bucket) = state.buckets().iter().find(|&&b| b >= self.state_buckets) {
            return Err(SchedulerError::InvalidState(format!(
                "bucket {} out of range for {} buckets in {}",
                bucket, self.state_buckets, state
            )));
        }
        Ok(())
    }
}
