//! Scheduler facade - composes encoder, policy, table and learner

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::learner::{QLearner, Transition};
use crate::policy::EpsilonGreedy;
use crate::state::{State, StateEncoder};
use crate::table::ValueTable;

/// Result of a `decide` call.
///
/// `state` must be handed back to [`Scheduler::learn`] together with the
/// chosen `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub state: State,
    pub action: usize,
    pub explored: bool,
    /// Exploration rate after this decision's decay
    pub epsilon: f64,
}

/// Learning scheduler session.
///
/// Owns the value table, the exploration rate and the random source for its
/// whole lifetime. Single-threaded; wrap in [`crate::SharedScheduler`] for
/// concurrent dispatch.
pub struct Scheduler<R = StdRng> {
    config: SchedulerConfig,
    encoder: StateEncoder,
    policy: EpsilonGreedy,
    learner: QLearner,
    table: ValueTable,
    rng: R,
    stats: SchedulerStats,
}

impl Scheduler<StdRng> {
    /// Create a scheduler seeded from OS entropy
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a scheduler with a fixed seed for reproducible runs
    pub fn seeded(config: SchedulerConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Scheduler<R> {
    /// Create a scheduler with an injected random source
    pub fn with_rng(config: SchedulerConfig, rng: R) -> Result<Self> {
        config.validate()?;

        info!(
            "Scheduler initialized: {} workers, {} buckets, alpha={}, gamma={}, epsilon={}",
            config.num_workers, config.state_buckets, config.alpha, config.gamma, config.eps_start
        );

        Ok(Self {
            encoder: StateEncoder::new(config.num_workers, config.state_buckets),
            policy: EpsilonGreedy::new(
                config.num_workers,
                config.eps_start,
                config.eps_min,
                config.eps_decay,
            ),
            learner: QLearner::new(config.alpha, config.gamma),
            table: ValueTable::new(config.num_workers),
            rng,
            stats: SchedulerStats {
                epsilon: config.eps_start,
                ..SchedulerStats::default()
            },
            config,
        })
    }

    /// Choose a worker for the current per-worker queue lengths
    pub fn decide(&mut self, current_load: &[usize]) -> Result<Decision> {
        let state = self.encoder.encode(current_load)?;
        let selection = self
            .policy
            .select_action(&mut self.table, &state, &mut self.rng);

        self.stats.decisions += 1;
        if selection.explored {
            self.stats.explorations += 1;
        }
        self.stats.epsilon = self.policy.epsilon();
        self.stats.table_size = self.table.len();

        debug!(
            "Decided worker {} for state {} (explored: {}, epsilon: {:.4})",
            selection.action,
            state,
            selection.explored,
            self.policy.epsilon()
        );

        Ok(Decision {
            state,
            action: selection.action,
            explored: selection.explored,
            epsilon: self.policy.epsilon(),
        })
    }

    /// Feed back the outcome of a decided task and return the TD error.
    ///
    /// All arguments are validated before the table is modified, so a
    /// rejected call leaves every row untouched.
    pub fn learn(
        &mut self,
        state: &State,
        action: usize,
        reward: f64,
        next_load: &[usize],
    ) -> Result<f64> {
        self.encoder.check(state)?;
        if action >= self.config.num_workers {
            return Err(SchedulerError::InvalidAction {
                action,
                num_workers: self.config.num_workers,
            });
        }
        if !reward.is_finite() {
            return Err(SchedulerError::InvalidReward(reward));
        }
        let next_state = self.encoder.encode(next_load)?;

        let transition = Transition::new(state.clone(), action, reward, next_state);
        let td_error = self.learner.update(&mut self.table, &transition)?;

        self.stats.updates += 1;
        self.stats.total_reward += reward;
        self.stats.average_reward = self.stats.total_reward / self.stats.updates as f64;
        self.stats.table_size = self.table.len();

        debug!(
            "Learned state {} worker {} reward {:.4} -> {} (td error: {:.4})",
            transition.state, action, reward, transition.next_state, td_error
        );

        Ok(td_error)
    }

    /// Encode a load vector without making a decision
    pub fn encode(&self, load: &[usize]) -> Result<State> {
        self.encoder.encode(load)
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.policy.epsilon()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    /// Values for a state without materializing its row
    pub fn q_values(&self, state: &State) -> Vec<f64> {
        self.table.q_values(state)
    }

    /// Highest-valued worker for a state, lowest index on ties.
    ///
    /// Deterministic and side-effect free; `decide` is the call that
    /// actually routes work.
    pub fn greedy_action(&self, state: &State) -> usize {
        let values = self.table.q_values(state);
        let mut best = 0;
        for (i, &v) in values.iter().enumerate() {
            if v > values[best] {
                best = i;
            }
        }
        best
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Serializable view of the `limit` most recently created rows
    pub fn snapshot(&self, limit: usize) -> TableSnapshot {
        TableSnapshot {
            epsilon: self.policy.epsilon(),
            total_states: self.table.len(),
            rows: self
                .table
                .recent(limit)
                .map(|(state, values)| SnapshotRow {
                    state: state.clone(),
                    values: values.to_vec(),
                })
                .collect(),
            stats: self.stats.clone(),
        }
    }
}

/// Running counters kept by the scheduler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub decisions: u64,
    pub explorations: u64,
    pub updates: u64,
    pub total_reward: f64,
    pub average_reward: f64,
    pub epsilon: f64,
    pub table_size: usize,
}

impl SchedulerStats {
    /// Fraction of decisions that explored
    pub fn exploration_ratio(&self) -> f64 {
        if self.decisions == 0 {
            0.0
        } else {
            self.explorations as f64 / self.decisions as f64
        }
    }
}

/// One value-table row in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub state: State,
    pub values: Vec<f64>,
}

/// Point-in-time view of the learned table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub epsilon: f64,
    pub total_states: usize,
    pub rows: Vec<SnapshotRow>,
    pub stats: SchedulerStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greedy_scheduler(workers: usize, seed: u64) -> Scheduler {
        Scheduler::seeded(SchedulerConfig::with_workers(workers).greedy(), seed).unwrap()
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let config = SchedulerConfig {
            state_buckets: 1,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            Scheduler::new(config),
            Err(SchedulerError::Config(_))
        ));
    }

    #[test]
    fn test_decide_returns_state_and_action() {
        let mut scheduler = greedy_scheduler(3, 42);
        let decision = scheduler.decide(&[0, 10, 20]).unwrap();

        assert_eq!(decision.state.buckets(), &[0, 2, 4]);
        assert!(decision.action < 3);
        assert!(!decision.explored);
        assert_eq!(scheduler.stats().decisions, 1);
    }

    #[test]
    fn test_decide_wrong_length() {
        let mut scheduler = greedy_scheduler(3, 42);
        assert_eq!(
            scheduler.decide(&[0, 0]),
            Err(SchedulerError::InputShape {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(scheduler.stats().decisions, 0);
    }

    #[test]
    fn test_learn_validates_before_mutation() {
        let mut scheduler = greedy_scheduler(2, 1);
        let decision = scheduler.decide(&[0, 0]).unwrap();
        let before = scheduler.q_values(&decision.state);

        assert!(matches!(
            scheduler.learn(&decision.state, 2, -1.0, &[0, 0]),
            Err(SchedulerError::InvalidAction { .. })
        ));
        assert!(matches!(
            scheduler.learn(&decision.state, 0, -1.0, &[0]),
            Err(SchedulerError::InputShape { .. })
        ));
        assert!(matches!(
            scheduler.learn(&decision.state, 0, f64::NAN, &[0, 0]),
            Err(SchedulerError::InvalidReward(_))
        ));
        assert!(matches!(
            scheduler.learn(&State::from_buckets(vec![9, 0]), 0, -1.0, &[0, 0]),
            Err(SchedulerError::InvalidState(_))
        ));

        assert_eq!(scheduler.q_values(&decision.state), before);
        assert_eq!(scheduler.table().len(), 1);
        assert_eq!(scheduler.stats().updates, 0);
    }

    #[test]
    fn test_learn_updates_stats() {
        let mut scheduler = greedy_scheduler(2, 1);
        for reward in [-1.0, -3.0] {
            let decision = scheduler.decide(&[0, 0]).unwrap();
            scheduler
                .learn(&decision.state, decision.action, reward, &[0, 0])
                .unwrap();
        }

        let stats = scheduler.stats();
        assert_eq!(stats.updates, 2);
        assert_eq!(stats.total_reward, -4.0);
        assert_eq!(stats.average_reward, -2.0);
        assert_eq!(stats.explorations, 0);
        assert_eq!(stats.exploration_ratio(), 0.0);
    }

    #[test]
    fn test_greedy_action_lowest_index_on_tie() {
        let mut scheduler = greedy_scheduler(3, 5);
        let state = scheduler.encode(&[0, 0, 0]).unwrap();
        assert_eq!(scheduler.greedy_action(&state), 0);

        scheduler.learn(&state, 0, -1.0, &[0, 0, 0]).unwrap();
        assert_eq!(scheduler.greedy_action(&state), 1);
    }

    #[test]
    fn test_snapshot_lists_recent_rows() {
        let mut scheduler = greedy_scheduler(2, 8);
        for load in [[0, 0], [10, 0], [20, 20]] {
            let decision = scheduler.decide(&load).unwrap();
            scheduler
                .learn(&decision.state, decision.action, -1.0, &load)
                .unwrap();
        }

        let snapshot = scheduler.snapshot(2);
        assert_eq!(snapshot.total_states, 3);
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].state.buckets(), &[2, 0]);
        assert_eq!(snapshot.rows[1].state.buckets(), &[4, 4]);
        assert_eq!(snapshot.stats.updates, 3);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["rows"][1]["state"], serde_json::json!([4, 4]));
    }
}
