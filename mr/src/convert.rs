//! Conversion of a source branch into a target repository
//!
//! A converter turns source commits into target commits and records one mark
//! per translated commit. It never rewrites existing target history: before
//! an incremental pull it checks that the target branch still sits on the
//! commit the newest mark points at, and refuses to continue otherwise.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use markstore::{Hash, MARK_ORIGIN, Mark};
use tracing::{debug, info, warn};

use crate::repository::{RepoError, Repository};

/// Temporary ref in the target that keeps fetched source objects reachable
const SOURCE_REF: &str = "refs/mirror/source";

/// Error types for conversion
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Target {target:?} is corrupted: branch head is {actual}, newest mark expects {expected}")]
    Corrupted {
        target: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Source {uri} was rewritten: converted commit {last} is no longer an ancestor of {branch}")]
    Diverged { uri: String, branch: String, last: Hash },

    #[error("Source has no branch {0}")]
    MissingBranch(String),

    #[error("Parent {parent} of {commit} has not been converted")]
    UnmappedParent { commit: Hash, parent: Hash },

    #[error(transparent)]
    Repository(#[from] RepoError),
}

/// Translates a source history into a target history
pub trait Converter {
    /// Translate the whole branch into a target without commits
    fn convert(&mut self, source: &Repository, target: &Repository) -> Result<(), ConvertError>;

    /// Translate the commits not yet covered by `existing` (ascending by key)
    fn pull(
        &mut self,
        source: &Repository,
        source_uri: &str,
        target: &Repository,
        existing: &[Mark],
    ) -> Result<(), ConvertError>;

    /// Marks produced by this converter so far, also after a failure
    fn marks(&self) -> &[Mark];
}

/// Creates a fresh converter for every run
pub trait ConverterFactory: Send + Sync {
    fn create(&self, branch: &str) -> Box<dyn Converter>;
}

/// Factory for `ReplayConverter`
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayConverterFactory;

impl ConverterFactory for ReplayConverterFactory {
    fn create(&self, branch: &str) -> Box<dyn Converter> {
        Box::new(ReplayConverter::new(branch))
    }
}

/// Replays source commits into the target as raw commit objects.
///
/// Tree, identities, dates, encoding and message bytes are carried over
/// unchanged and parents are mapped through the marks, so a given source
/// commit always produces the same target commit. Signatures are dropped.
#[derive(Debug)]
pub struct ReplayConverter {
    branch: String,
    produced: Vec<Mark>,
}

impl ReplayConverter {
    pub fn new(branch: impl Into<String>) -> Self {
        let branch = branch.into();
        debug!(%branch, "ReplayConverter::new: called");
        Self {
            branch,
            produced: Vec::new(),
        }
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    fn corrupted(target: &Repository, expected: Option<&Hash>, actual: Option<&Hash>) -> ConvertError {
        let show = |h: Option<&Hash>| h.map(|h| h.to_string()).unwrap_or_else(|| "<none>".to_string());
        ConvertError::Corrupted {
            target: target.root().to_path_buf(),
            expected: show(expected),
            actual: show(actual),
        }
    }

    fn translate(
        &mut self,
        source: &Repository,
        target: &Repository,
        commits: Vec<Hash>,
        mut mapping: HashMap<Hash, Hash>,
        mut head: Option<Hash>,
        mut next_key: u32,
    ) -> Result<(), ConvertError> {
        if commits.is_empty() {
            info!(branch = %self.branch, "Target is up to date");
            return Ok(());
        }
        info!(branch = %self.branch, count = commits.len(), "Converting commits");

        let refspec = format!("+{}:{}", self.branch_ref(), SOURCE_REF);
        target.fetch(&source.root().to_string_lossy(), &refspec)?;

        let mut result = Ok(());
        for commit in commits {
            match self.translate_one(source, target, &commit, &mapping, head.as_ref()) {
                Ok(converted) => {
                    debug!(%commit, %converted, key = next_key, "ReplayConverter::translate: converted");
                    mapping.insert(commit.clone(), converted.clone());
                    self.produced.push(Mark::new(next_key, commit, converted.clone()));
                    head = Some(converted);
                    next_key += 1;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        if let Err(e) = target.delete_ref(SOURCE_REF) {
            warn!("Failed to drop {} in {:?}: {}", SOURCE_REF, target.root(), e);
        }
        let checked_out = target.current_branch().is_ok_and(|b| b == self.branch);
        if !self.produced.is_empty() && checked_out && target.root().join(".git").exists() {
            if let Err(e) = target.reset_hard("HEAD") {
                warn!("Failed to refresh work tree of {:?}: {}", target.root(), e);
            }
        }

        info!(branch = %self.branch, produced = self.produced.len(), "Conversion finished");
        result
    }

    fn translate_one(
        &self,
        source: &Repository,
        target: &Repository,
        commit: &Hash,
        mapping: &HashMap<Hash, Hash>,
        head: Option<&Hash>,
    ) -> Result<Hash, ConvertError> {
        let info = source.commit_info(commit)?;
        let parents = info
            .parents
            .iter()
            .map(|parent| {
                mapping.get(parent).cloned().ok_or_else(|| ConvertError::UnmappedParent {
                    commit: commit.clone(),
                    parent: parent.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let converted = target.write_commit(&info.replay(&parents))?;
        target.update_ref(&self.branch_ref(), &converted, head)?;
        Ok(converted)
    }
}

impl Converter for ReplayConverter {
    fn convert(&mut self, source: &Repository, target: &Repository) -> Result<(), ConvertError> {
        debug!(source = ?source.root(), target = ?target.root(), "ReplayConverter::convert: called");
        let head = target.resolve(&self.branch_ref())?;
        if head.is_some() {
            return Err(Self::corrupted(target, None, head.as_ref()));
        }

        if source.resolve(&self.branch_ref())?.is_none() {
            return Err(ConvertError::MissingBranch(self.branch.clone()));
        }
        let commits = source.rev_list(&self.branch_ref())?;
        self.translate(source, target, commits, HashMap::new(), None, MARK_ORIGIN)
    }

    fn pull(
        &mut self,
        source: &Repository,
        source_uri: &str,
        target: &Repository,
        existing: &[Mark],
    ) -> Result<(), ConvertError> {
        debug!(%source_uri, existing = existing.len(), "ReplayConverter::pull: called");
        let newest = existing.iter().max_by_key(|m| m.key);

        let head = target.resolve(&self.branch_ref())?;
        let expected = newest.map(|m| &m.target);
        if head.as_ref() != expected {
            return Err(Self::corrupted(target, expected, head.as_ref()));
        }

        let tip = source
            .resolve(&self.branch_ref())?
            .ok_or_else(|| ConvertError::MissingBranch(self.branch.clone()))?;
        if let Some(newest) = newest
            && !source.is_ancestor(&newest.source, &tip)?
        {
            return Err(ConvertError::Diverged {
                uri: source_uri.to_string(),
                branch: self.branch.clone(),
                last: newest.source.clone(),
            });
        }

        let known: HashSet<&Hash> = existing.iter().map(|m| &m.source).collect();
        let commits: Vec<Hash> = source
            .rev_list(&self.branch_ref())?
            .into_iter()
            .filter(|c| !known.contains(c))
            .collect();
        debug!(%source_uri, delta = commits.len(), "ReplayConverter::pull: computed delta");

        let mapping = existing.iter().map(|m| (m.source.clone(), m.target.clone())).collect();
        let next_key = newest.map(|m| m.key + 1).unwrap_or(MARK_ORIGIN);
        self.translate(source, target, commits, mapping, head, next_key)
    }

    fn marks(&self) -> &[Mark] {
        &self.produced
    }
}
