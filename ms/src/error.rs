//! Error types for mark storage

use std::path::PathBuf;

/// Errors raised while reading or writing a mark store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("malformed marks at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("mark {key} conflicts with stored mark: {reason}")]
    Conflict { key: u32, reason: String },

    #[error("mark key {found} breaks the sequence, expected {expected}")]
    Gap { expected: u32, found: u32 },

    #[error("{which} hash {hash} is already mapped by mark {existing}")]
    DuplicateHash {
        which: &'static str,
        hash: String,
        existing: u32,
    },

    #[error("gave up publishing marks after {0} attempts")]
    TooManyRetries(usize),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
