//! Shared scheduler for concurrent dispatch
//!
//! One async mutex guards the value table, exploration rate, random source
//! and statistics together. It is held for a single `decide` or `learn` call
//! and never across task execution.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::Mutex;

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::scheduler::{Decision, Scheduler, SchedulerStats, TableSnapshot};
use crate::state::State;

/// Cloneable handle to a scheduler shared between in-flight tasks
pub struct SharedScheduler<R = StdRng> {
    inner: Arc<Mutex<Scheduler<R>>>,
}

impl<R> Clone for SharedScheduler<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedScheduler<StdRng> {
    /// Create a shared scheduler seeded from OS entropy
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Ok(Self::from_scheduler(Scheduler::new(config)?))
    }

    /// Create a shared scheduler with a fixed seed
    pub fn seeded(config: SchedulerConfig, seed: u64) -> Result<Self> {
        Ok(Self::from_scheduler(Scheduler::seeded(config, seed)?))
    }
}

impl<R: Rng + Send> SharedScheduler<R> {
    pub fn from_scheduler(scheduler: Scheduler<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
        }
    }

    /// Choose a worker for the current load
    pub async fn decide(&self, current_load: &[usize]) -> Result<Decision> {
        self.inner.lock().await.decide(current_load)
    }

    /// Feed back the outcome of a decided task
    pub async fn learn(
        &self,
        state: &State,
        action: usize,
        reward: f64,
        next_load: &[usize],
    ) -> Result<f64> {
        self.inner
            .lock()
            .await
            .learn(state, action, reward, next_load)
    }

    pub async fn epsilon(&self) -> f64 {
        self.inner.lock().await.epsilon()
    }

    pub async fn stats(&self) -> SchedulerStats {
        self.inner.lock().await.stats().clone()
    }

    pub async fn snapshot(&self, limit: usize) -> TableSnapshot {
        self.inner.lock().await.snapshot(limit)
    }

    pub async fn q_values(&self, state: &State) -> Vec<f64> {
        self.inner.lock().await.q_values(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_decide_and_learn() {
        let shared = SharedScheduler::seeded(SchedulerConfig::with_workers(4), 17).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    let decision = shared.decide(&[1, 2, 3, 4]).await.unwrap();
                    shared
                        .learn(&decision.state, decision.action, -0.5, &[1, 2, 3, 4])
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = shared.stats().await;
        assert_eq!(stats.decisions, 200);
        assert_eq!(stats.updates, 200);
        assert_eq!(stats.total_reward, -100.0);
    }

    #[tokio::test]
    async fn test_abandoned_decision_skips_update() {
        let shared = SharedScheduler::seeded(SchedulerConfig::with_workers(2).greedy(), 3).unwrap();

        let decision = shared.decide(&[0, 0]).await.unwrap();
        let stats = shared.stats().await;
        assert_eq!(stats.decisions, 1);
        assert_eq!(stats.updates, 0);
        assert_eq!(shared.q_values(&decision.state).await, vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_epsilon_only_decays_under_concurrent_decide() {
        let shared = SharedScheduler::seeded(SchedulerConfig::default(), 9).unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                let mut previous = 1.0;
                for _ in 0..2000 {
                    let decision = shared.decide(&[0, 5, 10]).await.unwrap();
                    assert!(decision.epsilon <= previous);
                    previous = decision.epsilon;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(shared.epsilon().await, 0.02);
    }
}
