//! MirrorBot - incremental, resumable branch mirror
//!
//! A mirror replays the commits of one branch of a source repository into a
//! local target repository. Each translated commit is recorded as a mark in
//! a [`markstore`] so the next run only converts what is new.
//!
//! # Architecture
//!
//! ```text
//! BotRunner (tokio, periodic)
//!   └── MirrorBot::sync_once(scratch) # blocking worker thread
//!         ├── Repository::clone / pull   # cached source under storage/
//!         ├── MarkStorage::materialize   # file or git backed
//!         ├── Converter::convert | pull  # replay into the target
//!         └── MarkHandle::put            # always, also after a failure
//! ```
//!
//! Two mirrors sharing a source or a target never run at the same time.

pub mod cli;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod encode;
pub mod mirror;
pub mod repository;
pub mod scheduler;
pub mod sync;

pub use config::Config;
pub use convert::{ConvertError, Converter, ConverterFactory, ReplayConverter, ReplayConverterFactory};
pub use mirror::{MirrorBot, MirrorError, MirrorOutcome, MirrorPath};
pub use repository::{RepoError, Repository, VcsKind};
pub use scheduler::{Bot, BotRunner, RunnerConfig, WorkItem};
pub use sync::{SyncError, SyncOptions, SyncReport};
