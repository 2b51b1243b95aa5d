//! Bot runner and work item traits
//!
//! Work items run on blocking worker threads. An item is admitted only
//! when its `concurrent_with` predicate agrees, in both directions, with
//! every running item, so two mirrors of the same target never overlap.

mod config;
mod item;
mod runner;

pub use config::RunnerConfig;
pub use item::{Bot, WorkItem, may_run_together};
pub use runner::{BotRunner, RunnerStats};
