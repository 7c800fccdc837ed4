//! qdispatch RL - Tabular Q-learning scheduler core
//!
//! This crate learns to route tasks to one of several parallel workers so as
//! to minimize completion latency. Callers interact with it through two
//! operations on [`Scheduler`]: `decide` picks a worker for the current load,
//! `learn` feeds back the observed reward and the post-execution load.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::float_cmp)]

pub mod config;
pub mod error;
pub mod learner;
pub mod policy;
pub mod scheduler;
pub mod shared;
pub mod state;
pub mod table;

pub use config::SchedulerConfig;
pub use error::{Result, SchedulerError};
pub use learner::{QLearner, Transition};
pub use policy::{EpsilonGreedy, Selection};
pub use scheduler::{Decision, Scheduler, SchedulerStats, SnapshotRow, TableSnapshot};
pub use shared::SharedScheduler;
pub use state::{State, StateEncoder};
pub use table::ValueTable;
