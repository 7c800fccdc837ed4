//! Simulated task stream driving the learning scheduler
//!
//! Each task is decided, "executed" on its worker as a timed delay, and
//! learned from. Up to `concurrency` tasks are in flight at once; with the
//! default of one, every task completes before the next is decided.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use qdispatch_rl::{Decision, SchedulerConfig, SharedScheduler, TableSnapshot};

use crate::config::SimulationConfig;

/// One completed task, as shown in the task log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub sequence: usize,
    pub submitted_at: DateTime<Utc>,
    pub worker: usize,
    pub explored: bool,
    pub complexity: f64,
    /// Observed latency in seconds
    pub elapsed: f64,
    pub reward: f64,
    /// Exploration rate after this task's decision
    pub epsilon: f64,
}

/// A decided task waiting on its worker
struct Dispatched {
    sequence: usize,
    submitted_at: DateTime<Utc>,
    decision: Decision,
    started: Instant,
}

/// Per-worker aggregate over a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker: usize,
    pub tasks: usize,
    pub mean_latency: f64,
}

/// Everything produced by a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub records: Vec<TaskRecord>,
    pub queues: Vec<usize>,
    pub workers: Vec<WorkerSummary>,
    pub snapshot: TableSnapshot,
}

impl SimulationReport {
    /// Exploration rate after each task, in submission order
    pub fn epsilon_history(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.epsilon).collect()
    }

    /// Latency of each task, in submission order
    pub fn latency_history(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.elapsed).collect()
    }

    pub fn mean_latency(&self) -> f64 {
        mean(&self.latency_history())
    }
}

/// Task dispatcher simulation around a shared scheduler
#[derive(Clone)]
pub struct Simulator {
    scheduler: SharedScheduler,
    queues: Arc<Mutex<Vec<usize>>>,
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(scheduler_config: SchedulerConfig, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let num_workers = scheduler_config.num_workers;
        let scheduler = match config.seed {
            Some(seed) => SharedScheduler::seeded(scheduler_config, seed),
            None => SharedScheduler::new(scheduler_config),
        }
        .context("Failed to create scheduler")?;

        Ok(Self {
            scheduler,
            queues: Arc::new(Mutex::new(vec![0; num_workers])),
            config,
        })
    }

    pub fn scheduler(&self) -> &SharedScheduler {
        &self.scheduler
    }

    /// Current per-worker queue lengths
    pub async fn queues(&self) -> Vec<usize> {
        self.queues.lock().await.clone()
    }

    /// Submit every configured task and collect the report
    pub async fn run(&self) -> Result<SimulationReport> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut in_flight = JoinSet::new();

        info!(
            "Submitting {} tasks (complexity {:.2}s, concurrency {})",
            self.config.tasks, self.config.complexity, self.config.concurrency
        );

        for sequence in 0..self.config.tasks {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .context("Task permit semaphore closed")?;
            let processing = self.processing_time(&mut rng)?;
            // Decisions are taken here so they follow submission order
            let dispatched = self.dispatch(sequence).await?;
            let simulator = self.clone();

            in_flight.spawn(async move {
                let record = simulator.complete(dispatched, processing).await;
                drop(permit);
                record
            });
        }

        let mut records = Vec::with_capacity(self.config.tasks);
        while let Some(joined) = in_flight.join_next().await {
            records.push(joined.context("Task panicked")??);
        }
        records.sort_by_key(|r| r.sequence);

        let report = SimulationReport {
            workers: self.summarize(&records).await,
            queues: self.queues().await,
            snapshot: self.scheduler.snapshot(self.config.snapshot_rows).await,
            records,
        };

        info!(
            "Run complete: {} tasks, mean latency {:.3}s, epsilon {:.4}",
            report.records.len(),
            report.mean_latency(),
            report.snapshot.epsilon
        );

        Ok(report)
    }

    /// Dispatch one task and learn from its outcome
    pub async fn submit(&self, sequence: usize, processing: Duration) -> Result<TaskRecord> {
        let dispatched = self.dispatch(sequence).await?;
        self.complete(dispatched, processing).await
    }

    /// Decide a worker for the task and enqueue it there
    async fn dispatch(&self, sequence: usize) -> Result<Dispatched> {
        let submitted_at = Utc::now();
        let load = self.queues().await;
        let decision = self.scheduler.decide(&load).await?;

        let started = Instant::now();
        self.queues.lock().await[decision.action] += 1;

        Ok(Dispatched {
            sequence,
            submitted_at,
            decision,
            started,
        })
    }

    /// Run the task on its worker, dequeue it and learn from the latency
    async fn complete(&self, dispatched: Dispatched, processing: Duration) -> Result<TaskRecord> {
        let Dispatched {
            sequence,
            submitted_at,
            decision,
            started,
        } = dispatched;
        let worker = decision.action;

        tokio::time::sleep(processing).await;

        let next_load = {
            let mut queues = self.queues.lock().await;
            queues[worker] -= 1;
            queues.clone()
        };
        let elapsed = started.elapsed().as_secs_f64();
        let reward = -elapsed;

        self.scheduler
            .learn(&decision.state, worker, reward, &next_load)
            .await?;

        debug!(
            "Task {} on worker {} took {:.3}s (state {})",
            sequence, worker, elapsed, decision.state
        );

        Ok(TaskRecord {
            id: Uuid::new_v4(),
            sequence,
            submitted_at,
            worker,
            explored: decision.explored,
            complexity: self.config.complexity,
            elapsed,
            reward,
            epsilon: decision.epsilon,
        })
    }

    /// Nominal complexity with uniform jitter, scaled
    fn processing_time(&self, rng: &mut StdRng) -> Result<Duration> {
        let jitter = self.config.jitter;
        let factor = if jitter > 0.0 {
            rng.gen_range((1.0 - jitter)..(1.0 + jitter))
        } else {
            1.0
        };
        let seconds = self.config.complexity * factor * self.config.time_scale;
        Duration::try_from_secs_f64(seconds)
            .with_context(|| format!("Invalid processing time: {seconds}s"))
    }

    async fn summarize(&self, records: &[TaskRecord]) -> Vec<WorkerSummary> {
        let num_workers = self.queues.lock().await.len();
        (0..num_workers)
            .map(|worker| {
                let latencies: Vec<f64> = records
                    .iter()
                    .filter(|r| r.worker == worker)
                    .map(|r| r.elapsed)
                    .collect();
                WorkerSummary {
                    worker,
                    tasks: latencies.len(),
                    mean_latency: mean(&latencies),
                }
            })
            .collect()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(tasks: usize, concurrency: usize) -> SimulationConfig {
        SimulationConfig {
            tasks,
            complexity: 1.0,
            jitter: 0.2,
            concurrency,
            seed: Some(42),
            time_scale: 1.0,
            snapshot_rows: 8,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_run() {
        let simulator = Simulator::new(SchedulerConfig::default(), fast_config(30, 1)).unwrap();
        let report = simulator.run().await.unwrap();

        assert_eq!(report.records.len(), 30);
        assert_eq!(report.queues, vec![0, 0, 0]);
        for (i, record) in report.records.iter().enumerate() {
            assert_eq!(record.sequence, i);
            assert!(record.worker < 3);
            assert!(record.elapsed >= 0.8 - 1e-3 && record.elapsed <= 1.2 + 1e-3);
            assert_eq!(record.reward, -record.elapsed);
        }

        // One task at a time: every decision sees empty queues
        assert_eq!(report.snapshot.total_states, 1);
        assert_eq!(report.snapshot.stats.updates, 30);
        assert_eq!(report.workers.iter().map(|w| w.tasks).sum::<usize>(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_epsilon_history_non_increasing() {
        let simulator = Simulator::new(SchedulerConfig::default(), fast_config(25, 1)).unwrap();
        let report = simulator.run().await.unwrap();

        let history = report.epsilon_history();
        assert_eq!(history.len(), 25);
        assert!(history.windows(2).all(|w| w[1] <= w[0]));
        assert!(history[0] < 0.3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_epsilon_history_non_increasing() {
        let simulator = Simulator::new(SchedulerConfig::default(), fast_config(40, 8)).unwrap();
        let report = simulator.run().await.unwrap();

        let history = report.epsilon_history();
        assert_eq!(history.len(), 40);
        assert!(history.windows(2).all(|w| w[1] <= w[0]), "{history:?}");
        assert_eq!(*history.last().unwrap(), report.snapshot.epsilon);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_run_sees_loaded_states() {
        let simulator = Simulator::new(SchedulerConfig::default(), fast_config(40, 8)).unwrap();
        let report = simulator.run().await.unwrap();

        assert_eq!(report.records.len(), 40);
        assert_eq!(report.queues, vec![0, 0, 0]);
        assert_eq!(report.snapshot.stats.decisions, 40);
        assert_eq!(report.snapshot.stats.updates, 40);
        assert_eq!(simulator.scheduler().stats().await.updates, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_single_task() {
        let simulator = Simulator::new(SchedulerConfig::default(), fast_config(1, 1)).unwrap();
        let record = simulator
            .submit(0, Duration::from_millis(500))
            .await
            .unwrap();

        assert!((record.elapsed - 0.5).abs() < 1e-3);
        assert_eq!(simulator.queues().await, vec![0, 0, 0]);
        let stats = simulator.scheduler().stats().await;
        assert_eq!(stats.updates, 1);
    }

    #[test]
    fn test_invalid_simulation_config() {
        let config = SimulationConfig {
            complexity: 10.0,
            ..SimulationConfig::default()
        };
        assert!(Simulator::new(SchedulerConfig::default(), config).is_err());
    }

    #[test]
    fn test_invalid_scheduler_config() {
        let scheduler = SchedulerConfig {
            state_buckets: 1,
            ..SchedulerConfig::default()
        };
        assert!(Simulator::new(scheduler, SimulationConfig::default()).is_err());
    }

    #[test]
    fn test_processing_time_within_jitter() {
        let simulator = Simulator::new(SchedulerConfig::default(), fast_config(1, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let t = simulator.processing_time(&mut rng).unwrap().as_secs_f64();
            assert!((0.8 - 1e-6..=1.2 + 1e-6).contains(&t));
        }
    }
}
