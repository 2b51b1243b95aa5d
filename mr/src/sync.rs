//! git-sync: copy every branch of one remote to another
//!
//! Remote resolution, in order of precedence:
//!
//! ```text
//! from: --from > git config sync.from (single, known remote) > upstream > origin (when fork exists)
//! to:   --to   > git config sync.to (must be a known remote)  > fork     > origin
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info};

use crate::repository::{RepoError, Repository};

/// Error types for git-sync
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no repository found at {0}")]
    NoRepository(PathBuf),

    #[error("Could not find repository to sync from, please specify one with --from")]
    NoSource,

    #[error("The given remote to push to, {0}, does not exist")]
    UnknownRemote(String),

    #[error(transparent)]
    Repository(#[from] RepoError),

    #[error("git pull exited with status {0}")]
    PullFailed(i32),
}

impl SyncError {
    /// Process exit status; a failed `git pull` hands on its own
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PullFailed(code) => *code,
            _ => 1,
        }
    }
}

/// Command line choices; `None` falls back to git config and defaults
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Comma separated branch names
    pub branches: Option<String>,
    pub pull: bool,
}

/// Resolved remotes and branch filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub from: String,
    pub from_uri: String,
    pub to: String,
    pub to_uri: String,
    /// Empty means every branch
    pub branches: BTreeSet<String>,
    pub pull: bool,
}

/// What a sync did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub from: String,
    pub to: String,
    pub synced: Vec<String>,
    pub skipped: Vec<String>,
    pub pulled: bool,
}

fn single(values: Vec<String>) -> Option<String> {
    match values.as_slice() {
        [value] => Some(value.clone()),
        _ => None,
    }
}

fn split_branches(csv: &str) -> BTreeSet<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

impl SyncPlan {
    /// Resolve `options` against the remotes and config of `repo`
    pub fn resolve(repo: &Repository, options: &SyncOptions) -> Result<Self, SyncError> {
        debug!(?options, "SyncPlan::resolve: called");
        let remotes = repo.remotes()?;
        let known = |name: &str| remotes.iter().any(|r| r == name);

        let from = match &options.from {
            Some(from) => from.clone(),
            None => match single(repo.config("sync.from")?).filter(|f| known(f)) {
                Some(from) => from,
                None if known("upstream") => "upstream".to_string(),
                None if known("origin") && known("fork") => "origin".to_string(),
                None => return Err(SyncError::NoSource),
            },
        };

        let to = match &options.to {
            Some(to) => to.clone(),
            None => match single(repo.config("sync.to")?) {
                Some(to) if known(&to) => to,
                Some(to) => return Err(SyncError::UnknownRemote(to)),
                None if known("fork") => "fork".to_string(),
                None => "origin".to_string(),
            },
        };

        let from_uri = if known(&from) { repo.pull_path(&from)? } else { from.clone() };
        let to_uri = if known(&to) { repo.pull_path(&to)? } else { to.clone() };

        let branches = match &options.branches {
            Some(csv) => split_branches(csv),
            None => single(repo.config("sync.branches")?)
                .map(|csv| split_branches(&csv))
                .unwrap_or_default(),
        };

        let pull = options.pull
            || single(repo.config("sync.pull")?).is_some_and(|p| p.eq_ignore_ascii_case("always"));

        Ok(Self {
            from,
            from_uri,
            to,
            to_uri,
            branches,
            pull,
        })
    }

    fn wants(&self, branch: &str) -> bool {
        self.branches.is_empty() || self.branches.contains(branch)
    }
}

/// Fetch every selected branch of the source remote and push it to the target remote
pub fn sync(repo: &Repository, options: &SyncOptions) -> Result<SyncReport, SyncError> {
    let plan = SyncPlan::resolve(repo, options)?;
    info!(from = %plan.from, to = %plan.to, "Syncing branches");

    let mut report = SyncReport {
        from: plan.from.clone(),
        to: plan.to.clone(),
        ..Default::default()
    };
    for branch in repo.remote_branches(&plan.from_uri)? {
        if !plan.wants(&branch.name) {
            debug!(branch = %branch.name, "sync: skipping branch");
            report.skipped.push(branch.name);
            continue;
        }
        info!("Syncing {}/{} to {}/{}", plan.from, branch.name, plan.to, branch.name);
        repo.fetch(&plan.from_uri, branch.hash.hex())?;
        repo.push(&branch.hash, &plan.to_uri, &branch.name, false)?;
        report.synced.push(branch.name);
    }

    if plan.pull {
        pull(repo)?;
        report.pulled = true;
    }
    Ok(report)
}

/// `git pull` with the terminal attached
fn pull(repo: &Repository) -> Result<(), SyncError> {
    debug!(root = ?repo.root(), "pull: called");
    let status = Command::new("git")
        .arg("pull")
        .current_dir(repo.root())
        .status()
        .map_err(|source| RepoError::Spawn {
            dir: repo.root().to_path_buf(),
            source,
        })?;
    if !status.success() {
        return Err(SyncError::PullFailed(status.code().unwrap_or(1)));
    }
    Ok(())
}
