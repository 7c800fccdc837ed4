//! One-step tabular Q-learning update

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::state::State;
use crate::table::ValueTable;

/// A single transition tuple (s, a, r, s').
///
/// Consumed by [`QLearner::update`] and not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: State,
    pub action: usize,
    pub reward: f64,
    pub next_state: State,
}

impl Transition {
    pub fn new(state: State, action: usize, reward: f64, next_state: State) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
        }
    }
}

/// Temporal-difference learner for a continuing (non-episodic) task
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QLearner {
    alpha: f64,
    gamma: f64,
}

impl QLearner {
    pub fn new(alpha: f64, gamma: f64) -> Self {
        Self { alpha, gamma }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Apply one Q-learning update and return the TD error.
    ///
    /// ```text
    /// Q(s, a) <- Q(s, a) + alpha * (r + gamma * max_a' Q(s', a') - Q(s, a))
    /// ```
    ///
    /// An out-of-range action is rejected before any row is inserted.
    pub fn update(&self, table: &mut ValueTable, transition: &Transition) -> Result<f64> {
        if transition.action >= table.num_workers() {
            return Err(SchedulerError::InvalidAction {
                action: transition.action,
                num_workers: table.num_workers(),
            });
        }

        let q_next_max = table.max_value(&transition.next_state);
        let row = table.row_mut(&transition.state);
        let q_current = row[transition.action];

        let td_error = transition.reward + self.gamma * q_next_max - q_current;
        row[transition.action] = q_current + self.alpha * td_error;

        Ok(td_error)
    }
}
