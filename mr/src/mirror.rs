//! Mirror coordinator
//!
//! One `MirrorBot` keeps a target repository in step with one branch of a
//! source repository. Every run brings the cached source clone up to date,
//! loads the marks, lets a converter translate whatever is new, and then
//! persists the produced marks whether or not the translation succeeded.

use std::any::Any;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use markstore::{MarkStorage, PutReport, StoreError};
use tracing::{debug, info, info_span, warn};

use crate::convert::{ConvertError, Converter, ConverterFactory, ReplayConverterFactory};
use crate::encode::{mirror_key, url_encode};
use crate::repository::{RepoError, Repository, VcsKind};
use crate::scheduler::{Bot, WorkItem};

/// Error types for a mirror run
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error(transparent)]
    Repository(#[from] RepoError),

    #[error("Failed to create {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load marks: {0}")]
    Store(#[source] StoreError),

    #[error("Conversion failed after {persisted} new marks were saved: {source}")]
    Conversion { source: ConvertError, persisted: usize },

    #[error("Failed to save {count} marks: {source}")]
    Persist { source: StoreError, count: usize },

    #[error("Conversion failed ({conversion}) and {count} marks could not be saved ({persist})")]
    ConversionAndPersist {
        conversion: ConvertError,
        persist: StoreError,
        count: usize,
    },
}

/// Which conversion a run performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorPath {
    /// Target was created and the whole branch converted
    Initial,
    /// Only commits missing from the marks were converted
    Incremental,
}

/// Result of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorOutcome {
    pub path: MirrorPath,
    pub persisted: PutReport,
}

/// Mirrors `branch` of `from` into the local repository `to`
#[derive(Clone)]
pub struct MirrorBot {
    from: String,
    branch: String,
    to: PathBuf,
    storage: PathBuf,
    marks: Arc<dyn MarkStorage>,
    converter: Arc<dyn ConverterFactory>,
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

impl MirrorBot {
    pub fn new(
        from: impl Into<String>,
        branch: impl Into<String>,
        to: impl Into<PathBuf>,
        storage: impl Into<PathBuf>,
        marks: Arc<dyn MarkStorage>,
    ) -> Self {
        let bot = Self {
            from: from.into(),
            branch: branch.into(),
            to: absolute(to.into()),
            storage: absolute(storage.into()),
            marks,
            converter: Arc::new(ReplayConverterFactory),
        };
        debug!(%bot, "MirrorBot::new: called");
        bot
    }

    /// Replace the converter used for every run
    pub fn with_converter(mut self, converter: Arc<dyn ConverterFactory>) -> Self {
        self.converter = converter;
        self
    }

    pub fn source_uri(&self) -> &str {
        &self.from
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn target_dir(&self) -> &Path {
        &self.to
    }

    /// Local cache of the source repository
    pub fn source_dir(&self) -> PathBuf {
        self.storage.join(url_encode(&self.from))
    }

    /// Run one mirror pass
    pub fn sync_once(&self, scratch: &Path) -> Result<MirrorOutcome, MirrorError> {
        let span = info_span!("mirror", from = %self.from, branch = %self.branch);
        let _enter = span.enter();
        debug!(?scratch, "MirrorBot::sync_once: called");

        let source = self.update_source()?;
        let target = self.open_target()?;

        let marks_dir = scratch.join("marks").join(mirror_key(&self.from, &self.branch));
        let mut handle = self.marks.materialize(&marks_dir).map_err(MirrorError::Store)?;
        debug!(existing = handle.current().len(), "Loaded marks");

        let mut converter = self.converter.create(&self.branch);
        let (path, conversion) = match target {
            Some(target) => {
                let result = converter.pull(&source, &self.from, &target, handle.current());
                (MirrorPath::Incremental, result)
            }
            None => (MirrorPath::Initial, self.convert_initial(&source, converter.as_mut())),
        };

        let produced = converter.marks().to_vec();
        let count = produced.len();
        let persisted = handle.put(&produced);

        match (conversion, persisted) {
            (Ok(()), Ok(report)) => {
                info!(
                    appended = report.appended,
                    skipped = report.skipped,
                    "Mirrored {} to {}",
                    self.branch,
                    self.to.display()
                );
                Ok(MirrorOutcome { path, persisted: report })
            }
            (Err(conversion), Ok(report)) => {
                warn!(persisted = report.appended, "Conversion failed: {}", conversion);
                Err(MirrorError::Conversion {
                    source: conversion,
                    persisted: report.appended,
                })
            }
            (Ok(()), Err(persist)) => Err(MirrorError::Persist { source: persist, count }),
            (Err(conversion), Err(persist)) => Err(MirrorError::ConversionAndPersist {
                conversion,
                persist,
                count,
            }),
        }
    }

    /// Clone or refresh the cached source and bring `branch` up to date
    fn update_source(&self) -> Result<Repository, MirrorError> {
        let dir = self.source_dir();
        let repo = if dir.exists() {
            Repository::open(&dir)?.ok_or_else(|| {
                MirrorError::IllegalState(format!("{} is not a repository", dir.display()))
            })?
        } else {
            fs::create_dir_all(&self.storage).map_err(|source| MirrorError::Io {
                path: self.storage.clone(),
                source,
            })?;
            Repository::clone(&self.from, &dir)?
        };

        repo.checkout(&self.branch)?;
        repo.pull("origin", &self.branch)?;
        Ok(repo)
    }

    /// `None` when the target does not exist yet
    fn open_target(&self) -> Result<Option<Repository>, MirrorError> {
        if !self.to.exists() {
            return Ok(None);
        }
        match Repository::open(&self.to)? {
            Some(repo) => Ok(Some(repo)),
            None => Err(MirrorError::IllegalState(format!(
                "{} exists but is not a repository",
                self.to.display()
            ))),
        }
    }

    fn convert_initial(&self, source: &Repository, converter: &mut dyn Converter) -> Result<(), ConvertError> {
        info!("Creating {}", self.to.display());
        let target = Repository::init(&self.to, VcsKind::Git)?;
        target.set_head_branch(&self.branch)?;
        converter.convert(source, &target)
    }
}

impl fmt::Display for MirrorBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MirrorBot({}:{}, {})", self.from, self.branch, self.to.display())
    }
}

impl fmt::Debug for MirrorBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorBot")
            .field("from", &self.from)
            .field("branch", &self.branch)
            .field("to", &self.to)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl WorkItem for MirrorBot {
    fn concurrent_with(&self, other: &dyn WorkItem) -> bool {
        match other.as_any().downcast_ref::<MirrorBot>() {
            Some(other) => self.to != other.to && self.from != other.from,
            None => true,
        }
    }

    fn run(&self, scratch: &Path) -> eyre::Result<Vec<Arc<dyn WorkItem>>> {
        self.sync_once(scratch)?;
        Ok(Vec::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Bot for MirrorBot {
    fn periodic_items(&self) -> Vec<Arc<dyn WorkItem>> {
        vec![Arc::new(self.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markstore::FileMarkStorage;
    use proptest::prelude::*;
    use std::fmt;
    use tempfile::tempdir;

    fn bot(from: &str, to: &str) -> MirrorBot {
        MirrorBot::new(
            from,
            "master",
            format!("/srv/{}", to),
            "/var/cache/mirrors",
            Arc::new(FileMarkStorage::new("marks.txt")),
        )
    }

    struct Other;

    impl fmt::Display for Other {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Other")
        }
    }

    impl WorkItem for Other {
        fn concurrent_with(&self, _other: &dyn WorkItem) -> bool {
            true
        }

        fn run(&self, _scratch: &Path) -> eyre::Result<Vec<Arc<dyn WorkItem>>> {
            Ok(Vec::new())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_display() {
        let bot = bot("https://git.openjdk.org/jdk.git", "jdk");
        assert_eq!(bot.to_string(), "MirrorBot(https://git.openjdk.org/jdk.git:master, /srv/jdk)");
    }

    #[test]
    fn test_same_target_excluded() {
        let a = bot("https://host/a.git", "mirror");
        let b = bot("https://host/b.git", "mirror");
        assert!(!a.concurrent_with(&b));
        assert!(!b.concurrent_with(&a));
    }

    #[test]
    fn test_same_source_excluded() {
        let a = bot("https://host/a.git", "one");
        let b = bot("https://host/a.git", "two");
        assert!(!a.concurrent_with(&b));
    }

    #[test]
    fn test_unrelated_bots_run_together() {
        let a = bot("https://host/a.git", "one");
        let b = bot("https://host/b.git", "two");
        assert!(a.concurrent_with(&b));
        assert!(b.concurrent_with(&a));
    }

    #[test]
    fn test_other_item_kinds_run_together() {
        let a = bot("https://host/a.git", "one");
        assert!(a.concurrent_with(&Other));
        assert!(Other.concurrent_with(&a));
    }

    #[test]
    fn test_periodic_items_is_self() {
        let a = bot("https://host/a.git", "one");
        let items = a.periodic_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].to_string(), a.to_string());
    }

    #[test]
    fn test_relative_paths_made_absolute() {
        let bot = MirrorBot::new(
            "src",
            "master",
            "target",
            "storage",
            Arc::new(FileMarkStorage::new("marks.txt")),
        );
        assert!(bot.target_dir().is_absolute());
        assert!(bot.source_dir().is_absolute());
        assert!(bot.source_dir().ends_with("storage/src"));
    }

    #[test]
    fn test_source_cache_not_a_repository() {
        let dir = tempdir().unwrap();
        let bot = MirrorBot::new(
            "https://host/a.git",
            "master",
            dir.path().join("target"),
            dir.path().join("storage"),
            Arc::new(FileMarkStorage::new("marks.txt")),
        );
        fs::create_dir_all(bot.source_dir()).unwrap();

        let err = bot.sync_once(&dir.path().join("scratch")).unwrap_err();
        assert!(matches!(err, MirrorError::IllegalState(_)), "{:?}", err);
    }

    fn arb_bot() -> impl Strategy<Value = MirrorBot> {
        (0..3usize, 0..3usize).prop_map(|(f, t)| bot(&format!("https://host/{}.git", f), &format!("t{}", t)))
    }

    proptest! {
        #[test]
        fn prop_exclusion_is_symmetric(a in arb_bot(), b in arb_bot()) {
            prop_assert_eq!(a.concurrent_with(&b), b.concurrent_with(&a));
            prop_assert!(!a.concurrent_with(&a));
        }
    }
}
