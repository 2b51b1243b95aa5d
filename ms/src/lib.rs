//! MarkStore - durable commit mark storage
//!
//! A mark pairs a commit in a source history with the commit it was
//! translated into in a target history. Marks carry a dense, monotonic key
//! so that a mirror can resume where the previous run stopped.
//!
//! # Architecture
//!
//! ```text
//! MarkStorage::materialize(work_dir)
//!   ├── FileMarkStorage   # plain marks.txt guarded by an fs2 lock
//!   └── GitMarkStorage    # <namespace>/marks.txt in a remote git repository
//!         │
//!         ▼
//!   Box<dyn MarkHandle>
//!     ├── current() -> &[Mark]   # ascending by key
//!     └── put(&[Mark])           # validated append, optimistic retry
//! ```
//!
//! # File format
//!
//! ```text
//! 1 <target-hex> <source-hex>
//! 2 <target-hex> <source-hex>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use markstore::{FileMarkStorage, MarkStorage};
//!
//! let storage = FileMarkStorage::new("/var/lib/mirror/marks.txt");
//! let mut handle = storage.materialize(scratch)?;
//! let last = handle.current().last().cloned();
//! handle.put(&new_marks)?;
//! ```

pub mod cli;
mod error;
mod file;
mod git;
mod mark;
mod set;
mod storage;

pub use error::StoreError;
pub use file::FileMarkStorage;
pub use git::{Author, GitMarkStorage};
pub use mark::{Hash, HashError, Mark};
pub use set::{MarkSet, PutReport};
pub use storage::{MarkHandle, MarkStorage};

/// Key of the first mark in every mark set
pub const MARK_ORIGIN: u32 = 1;

/// Name of the marks file, both on disk and inside a backing repository
pub const MARKS_FILE: &str = "marks.txt";

/// Default branch of a git-backed mark store
pub const DEFAULT_MARKS_BRANCH: &str = "marks";

/// Default number of push attempts before giving up on a contended store
pub const DEFAULT_MAX_RETRIES: usize = 5;
