//! Git-backed mark storage
//!
//! Marks live in `<namespace>/marks.txt` on a dedicated branch of a remote
//! repository. Materializing fetches that branch into a local working copy;
//! `put` commits the grown file and pushes without force. A rejected push
//! means another writer got there first: refetch, re-validate the append
//! against the new remote state and try again.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::file::{read_set, write_atomically};
use crate::mark::{Mark, format_marks};
use crate::set::{MarkSet, PutReport};
use crate::storage::{MarkHandle, MarkStorage};
use crate::{DEFAULT_MARKS_BRANCH, DEFAULT_MAX_RETRIES, MARKS_FILE};

/// Identity recorded on mark commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Marks stored in a remote git repository
#[derive(Debug, Clone)]
pub struct GitMarkStorage {
    url: String,
    author: Author,
    namespace: String,
    branch: String,
    max_retries: usize,
}

impl GitMarkStorage {
    pub fn new(url: impl Into<String>, author: Author, namespace: &str) -> Self {
        let url = url.into();
        debug!(%url, %namespace, "GitMarkStorage::new: called");
        Self {
            url,
            author,
            namespace: sanitize_namespace(namespace),
            branch: DEFAULT_MARKS_BRANCH.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn marks_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.namespace).join(MARKS_FILE)
    }

    fn remote_ref(&self) -> String {
        format!("refs/remotes/origin/{}", self.branch)
    }

    /// Make `work_dir` a checkout of the remote branch, discarding local state
    fn refresh(&self, work_dir: &Path) -> Result<(), StoreError> {
        debug!(?work_dir, "GitMarkStorage::refresh: called");
        if !work_dir.join(".git").exists() {
            fs::create_dir_all(work_dir).map_err(|e| StoreError::io(work_dir, e))?;
            git(work_dir, &["init", "--quiet"])?;
            git(work_dir, &["remote", "add", "origin", &self.url])?;
            info!(url = %self.url, ?work_dir, "Initialized mark store working copy");
        } else {
            git(work_dir, &["remote", "set-url", "origin", &self.url])?;
        }

        let refspec = format!("+refs/heads/{}:{}", self.branch, self.remote_ref());
        let fetch = run(work_dir, &["fetch", "--quiet", "origin", &refspec])?;
        let remote_exists = if fetch.status.success() {
            true
        } else {
            let stderr = String::from_utf8_lossy(&fetch.stderr);
            if !stderr.contains("couldn't find remote ref") {
                return Err(StoreError::Git {
                    command: "fetch".to_string(),
                    stderr: stderr.trim().to_string(),
                });
            }
            debug!("GitMarkStorage::refresh: remote branch does not exist yet");
            false
        };

        let head = format!("refs/heads/{}", self.branch);
        git(work_dir, &["symbolic-ref", "HEAD", &head])?;
        if remote_exists {
            git(work_dir, &["reset", "--quiet", "--hard", &self.remote_ref()])?;
        } else {
            let _ = run(work_dir, &["update-ref", "-d", &head])?;
            git(work_dir, &["read-tree", "--empty"])?;
            let dir = work_dir.join(&self.namespace);
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
            }
        }
        Ok(())
    }

    /// Commit the marks file and push it. `Ok(false)` means the push lost a race.
    fn publish(&self, work_dir: &Path, appended: usize) -> Result<bool, StoreError> {
        let relative = format!("{}/{}", self.namespace, MARKS_FILE);
        git(work_dir, &["add", &relative])?;

        let message = format!("Add {} marks for {}", appended, self.namespace);
        let output = Command::new("git")
            .args(["-c", "commit.gpgsign=false", "commit", "--quiet", "-m", &message])
            .env("GIT_AUTHOR_NAME", &self.author.name)
            .env("GIT_AUTHOR_EMAIL", &self.author.email)
            .env("GIT_COMMITTER_NAME", &self.author.name)
            .env("GIT_COMMITTER_EMAIL", &self.author.email)
            .current_dir(work_dir)
            .output()
            .map_err(|e| StoreError::io(work_dir, e))?;
        check("commit", output)?;

        let target = format!("HEAD:refs/heads/{}", self.branch);
        let output = run(work_dir, &["push", "origin", &target])?;
        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("non-fast-forward") || stderr.contains("fetch first") || stderr.contains("rejected") {
            debug!("GitMarkStorage::publish: push rejected as non-fast-forward");
            return Ok(false);
        }
        Err(StoreError::Git {
            command: "push".to_string(),
            stderr: stderr.trim().to_string(),
        })
    }
}

impl MarkStorage for GitMarkStorage {
    fn materialize(&self, work_dir: &Path) -> Result<Box<dyn MarkHandle>, StoreError> {
        debug!(?work_dir, url = %self.url, "GitMarkStorage::materialize: called");
        self.refresh(work_dir)?;
        let set = read_set(&self.marks_path(work_dir))?;
        debug!(count = set.len(), "GitMarkStorage::materialize: loaded marks");

        Ok(Box::new(GitMarkHandle {
            storage: self.clone(),
            work_dir: work_dir.to_path_buf(),
            set,
        }))
    }
}

/// Handle over a local working copy of the marks repository
pub struct GitMarkHandle {
    storage: GitMarkStorage,
    work_dir: PathBuf,
    set: MarkSet,
}

impl MarkHandle for GitMarkHandle {
    fn current(&self) -> &[Mark] {
        self.set.marks()
    }

    fn put(&mut self, marks: &[Mark]) -> Result<PutReport, StoreError> {
        debug!(count = marks.len(), "GitMarkHandle::put: called");
        if marks.is_empty() {
            return Ok(PutReport::default());
        }

        let path = self.storage.marks_path(&self.work_dir);
        for attempt in 1..=self.storage.max_retries {
            let mut latest = read_set(&path)?;
            let report = latest.append(marks)?;
            if report.appended == 0 {
                debug!("GitMarkHandle::put: every mark already stored");
                self.set = latest;
                return Ok(report);
            }

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            write_atomically(&path, &format_marks(latest.marks()))?;

            if self.storage.publish(&self.work_dir, report.appended)? {
                info!(
                    appended = report.appended,
                    namespace = %self.storage.namespace,
                    attempt,
                    "Published marks"
                );
                self.set = latest;
                return Ok(report);
            }

            warn!(
                attempt,
                namespace = %self.storage.namespace,
                "Mark store moved underneath us, refetching"
            );
            self.storage.refresh(&self.work_dir)?;
        }

        Err(StoreError::TooManyRetries(self.storage.max_retries))
    }
}

fn sanitize_namespace(namespace: &str) -> String {
    let cleaned: String = namespace
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '_' } else { c })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "default".to_string(),
        _ => cleaned,
    }
}

fn run(dir: &Path, args: &[&str]) -> Result<Output, StoreError> {
    debug!(?dir, ?args, "git");
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| StoreError::io(dir, e))
}

fn git(dir: &Path, args: &[&str]) -> Result<(), StoreError> {
    let output = run(dir, args)?;
    check(args.first().copied().unwrap_or("git"), output)
}

fn check(command: &str, output: Output) -> Result<(), StoreError> {
    if output.status.success() {
        return Ok(());
    }
    Err(StoreError::Git {
        command: command.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
