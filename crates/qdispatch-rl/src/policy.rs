//! Epsilon-greedy action selection with decaying exploration

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::State;
use crate::table::ValueTable;

/// Outcome of one action selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Chosen worker index
    pub action: usize,
    /// True when the worker was picked at random rather than by value
    pub explored: bool,
}

/// Epsilon-greedy selector.
///
/// Exploration rate decays geometrically after every selection and never
/// drops below its floor.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f64,
    eps_min: f64,
    eps_decay: f64,
    num_workers: usize,
}

impl EpsilonGreedy {
    pub fn new(num_workers: usize, eps_start: f64, eps_min: f64, eps_decay: f64) -> Self {
        Self {
            epsilon: eps_start,
            eps_min,
            eps_decay,
            num_workers,
        }
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn eps_min(&self) -> f64 {
        self.eps_min
    }

    /// Pick a worker for `state`, then decay epsilon once.
    ///
    /// Exploitation materializes the state's row and breaks ties between
    /// equally valued workers uniformly at random.
    pub fn select_action<R: Rng + ?Sized>(
        &mut self,
        table: &mut ValueTable,
        state: &State,
        rng: &mut R,
    ) -> Selection {
        let selection = if rng.gen::<f64>() < self.epsilon {
            Selection {
                action: rng.gen_range(0..self.num_workers),
                explored: true,
            }
        } else {
            Selection {
                action: self.greedy(table.row_mut(state), rng),
                explored: false,
            }
        };

        self.decay();
        selection
    }

    fn greedy<R: Rng + ?Sized>(&self, row: &[f64], rng: &mut R) -> usize {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ties: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == max)
            .map(|(i, _)| i)
            .collect();

        // Only empty if every value is NaN
        if ties.is_empty() {
            return rng.gen_range(0..self.num_workers);
        }
        ties[rng.gen_range(0..ties.len())]
    }

    fn decay(&mut self) {
        self.epsilon = (self.epsilon * self.eps_decay).max(self.eps_min);
    }
}
