//! Repository access through the git command line
//!
//! Every operation shells out to `git` and blocks until it finishes. Runs of
//! the mirror are synchronous, so there is no async variant.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use markstore::Hash;
use tracing::{debug, info};

/// Error types for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Failed to run git in {dir}: {source}")]
    Spawn {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed in {dir}: {stderr}")]
    Command {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    #[error("Unexpected git output: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of repository created by `Repository::init`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsKind {
    /// Repository with a work tree
    Git,
    /// Repository without a work tree, suitable as a push target
    Bare,
}

/// Name, email and raw date of an author or committer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    /// Git internal date format: `<unix-seconds> <tz-offset>`
    pub date: String,
}

impl Identity {
    fn parse(raw: &str) -> Result<Self, RepoError> {
        let open = raw.rfind('<').ok_or_else(|| RepoError::Parse(format!("identity: {}", raw)))?;
        let close = raw.rfind('>').ok_or_else(|| RepoError::Parse(format!("identity: {}", raw)))?;
        if close < open {
            return Err(RepoError::Parse(format!("identity: {}", raw)));
        }
        Ok(Self {
            name: raw[..open].trim().to_string(),
            email: raw[open + 1..close].to_string(),
            date: raw[close + 1..].trim().to_string(),
        })
    }
}

/// Headers that sign or embed other objects and are void once parents change
const SIGNATURE_HEADERS: &[&[u8]] = &[b"gpgsig", b"gpgsig-sha256", b"mergetag"];

/// Summary of a single commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMetadata {
    pub hash: Hash,
    pub tree: Hash,
    pub parents: Vec<Hash>,
    pub author: Identity,
    pub committer: Identity,
    /// Value of the `encoding` header, `None` means UTF-8
    pub encoding: Option<String>,
    /// Raw message bytes after the header block, in `encoding`
    pub message: Vec<u8>,
    headers: Vec<u8>,
}

impl CommitMetadata {
    /// First line of the message
    pub fn subject(&self) -> String {
        let end = self.message.iter().position(|&b| b == b'\n').unwrap_or(self.message.len());
        String::from_utf8_lossy(&self.message[..end]).into_owned()
    }

    /// The same commit object on top of `parents`.
    ///
    /// Every other header and the message are kept byte for byte; signatures
    /// are dropped since they no longer verify.
    pub fn replay(&self, parents: &[Hash]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.headers.len() + self.message.len() + 2);
        let mut skipping = false;
        for line in self.headers.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            // continuation lines of multi-line headers
            if line[0] == b' ' {
                if !skipping {
                    out.extend_from_slice(line);
                    out.push(b'\n');
                }
                continue;
            }
            let name = line.split(|&b| b == b' ').next().unwrap_or(line);
            skipping = SIGNATURE_HEADERS.contains(&name);
            if skipping || name == b"parent" {
                continue;
            }
            out.extend_from_slice(line);
            out.push(b'\n');
            if name == b"tree" {
                for parent in parents {
                    out.extend_from_slice(format!("parent {}\n", parent).as_bytes());
                }
            }
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// Parse the output of `git cat-file commit`
    fn parse(hash: Hash, raw: &[u8]) -> Result<Self, RepoError> {
        let (headers, message) = match raw.windows(2).position(|w| w == b"\n\n") {
            Some(pos) => (&raw[..pos], &raw[pos + 2..]),
            None => (raw.strip_suffix(b"\n").unwrap_or(raw), &b""[..]),
        };

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        let mut encoding = None;
        for line in String::from_utf8_lossy(headers).lines() {
            if line.starts_with(' ') {
                continue;
            }
            let (name, value) = line.split_once(' ').unwrap_or((line, ""));
            match name {
                "tree" => tree = Some(parse_hash(value)?),
                "parent" => parents.push(parse_hash(value)?),
                "author" => author = Some(Identity::parse(value)?),
                "committer" => committer = Some(Identity::parse(value)?),
                "encoding" => encoding = Some(value.to_string()),
                _ => {}
            }
        }

        let missing = |field: &str| RepoError::Parse(format!("commit {} has no {}", hash, field));
        Ok(Self {
            tree: tree.ok_or_else(|| missing("tree"))?,
            author: author.ok_or_else(|| missing("author"))?,
            committer: committer.ok_or_else(|| missing("committer"))?,
            hash,
            parents,
            encoding,
            message: message.to_vec(),
            headers: headers.to_vec(),
        })
    }
}

/// A branch as advertised by a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranch {
    pub name: String,
    pub hash: Hash,
}

/// A local git repository
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Clone `uri` into `dir`
    pub fn clone(uri: &str, dir: &Path) -> Result<Self, RepoError> {
        debug!(%uri, ?dir, "Repository::clone: called");
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }
        let output = Command::new("git")
            .args(["clone", "--quiet", uri])
            .arg(dir)
            .output()
            .map_err(|source| RepoError::Spawn {
                dir: dir.to_path_buf(),
                source,
            })?;
        check(dir, "clone", output)?;
        info!("Cloned {} to {:?}", uri, dir);
        Ok(Self { root: dir.to_path_buf() })
    }

    /// Open the repository rooted exactly at `dir`, if there is one
    pub fn open(dir: &Path) -> Result<Option<Self>, RepoError> {
        debug!(?dir, "Repository::open: called");
        if !dir.is_dir() {
            debug!("Repository::open: directory missing");
            return Ok(None);
        }
        let wanted = dir.canonicalize()?;

        let output = git_output(dir, &["rev-parse", "--is-bare-repository", "--absolute-git-dir"])?;
        if !output.status.success() {
            debug!("Repository::open: not inside a repository");
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();
        let bare = lines.next() == Some("true");
        let git_dir = lines.next().map(PathBuf::from);

        let root = if bare {
            git_dir
        } else {
            let top = git_output(dir, &["rev-parse", "--show-toplevel"])?;
            top.status
                .success()
                .then(|| PathBuf::from(String::from_utf8_lossy(&top.stdout).trim()))
        };

        // a directory nested inside some other repository is not a repository
        match root.and_then(|r| r.canonicalize().ok()) {
            Some(root) if root == wanted => Ok(Some(Self { root: dir.to_path_buf() })),
            _ => {
                debug!("Repository::open: directory is not a repository root");
                Ok(None)
            }
        }
    }

    /// The repository containing `dir`, searching upwards
    pub fn find(dir: &Path) -> Result<Option<Self>, RepoError> {
        debug!(?dir, "Repository::find: called");
        if !dir.is_dir() {
            return Ok(None);
        }
        let output = git_output(dir, &["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let top = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        Ok(Some(Self { root: top }))
    }

    /// Create an empty repository at `dir`
    pub fn init(dir: &Path, kind: VcsKind) -> Result<Self, RepoError> {
        debug!(?dir, ?kind, "Repository::init: called");
        fs::create_dir_all(dir)?;
        let args: &[&str] = match kind {
            VcsKind::Git => &["init", "--quiet"],
            VcsKind::Bare => &["init", "--quiet", "--bare"],
        };
        let repo = Self { root: dir.to_path_buf() };
        repo.git(args)?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn checkout(&self, branch: &str) -> Result<(), RepoError> {
        debug!(%branch, "Repository::checkout: called");
        self.git(&["checkout", "--quiet", branch])?;
        Ok(())
    }

    /// Fast-forward the current branch from `remote`
    pub fn pull(&self, remote: &str, branch: &str) -> Result<(), RepoError> {
        debug!(%remote, %branch, "Repository::pull: called");
        self.git(&["pull", "--quiet", "--ff-only", remote, branch])?;
        Ok(())
    }

    pub fn fetch(&self, uri: &str, refspec: &str) -> Result<(), RepoError> {
        debug!(%uri, %refspec, "Repository::fetch: called");
        self.git(&["fetch", "--quiet", uri, refspec])?;
        Ok(())
    }

    /// Push `hash` to `branch` of `uri`
    pub fn push(&self, hash: &Hash, uri: &str, branch: &str, force: bool) -> Result<(), RepoError> {
        debug!(%hash, %uri, %branch, force, "Repository::push: called");
        let refspec = format!("{}:refs/heads/{}", hash, branch);
        let mut args = vec!["push", "--quiet"];
        if force {
            args.push("--force");
        }
        args.push(uri);
        args.push(&refspec);
        self.git(&args)?;
        Ok(())
    }

    pub fn add(&self, path: &Path) -> Result<(), RepoError> {
        self.git(&["add", &path.to_string_lossy()])?;
        Ok(())
    }

    /// Commit the index with the given identity as author and committer
    pub fn commit(&self, message: &str, name: &str, email: &str) -> Result<Hash, RepoError> {
        debug!(%message, "Repository::commit: called");
        let output = Command::new("git")
            .args(["-c", "commit.gpgsign=false", "commit", "--quiet", "-m", message])
            .env("GIT_AUTHOR_NAME", name)
            .env("GIT_AUTHOR_EMAIL", email)
            .env("GIT_COMMITTER_NAME", name)
            .env("GIT_COMMITTER_EMAIL", email)
            .current_dir(&self.root)
            .output()
            .map_err(|e| self.spawn_err(e))?;
        check(&self.root, "commit", output)?;
        self.head()?
            .ok_or_else(|| RepoError::Parse("HEAD missing after commit".to_string()))
    }

    pub fn head(&self) -> Result<Option<Hash>, RepoError> {
        self.resolve("HEAD")
    }

    /// Resolve a revision to a commit, `None` if it does not exist
    pub fn resolve(&self, rev: &str) -> Result<Option<Hash>, RepoError> {
        let spec = format!("{}^{{commit}}", rev);
        let output = self.git_raw(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        parse_hash(String::from_utf8_lossy(&output.stdout).trim()).map(Some)
    }

    /// Name of the branch HEAD points to, born or not
    pub fn current_branch(&self) -> Result<String, RepoError> {
        Ok(self.git(&["symbolic-ref", "--short", "HEAD"])?.trim().to_string())
    }

    /// Point HEAD at `branch` without touching the work tree
    pub fn set_head_branch(&self, branch: &str) -> Result<(), RepoError> {
        self.git(&["symbolic-ref", "HEAD", &format!("refs/heads/{}", branch)])?;
        Ok(())
    }

    pub fn reset_hard(&self, rev: &str) -> Result<(), RepoError> {
        self.git(&["reset", "--quiet", "--hard", rev])?;
        Ok(())
    }

    pub fn commit_info(&self, hash: &Hash) -> Result<CommitMetadata, RepoError> {
        let output = self.git_raw(&["cat-file", "commit", hash.hex()])?;
        if !output.status.success() {
            return Err(command_err(&self.root, "cat-file", &output));
        }
        CommitMetadata::parse(hash.clone(), &output.stdout)
    }

    /// Commits reachable from `rev`, newest first
    pub fn commit_metadata(&self, rev: &str) -> Result<Vec<CommitMetadata>, RepoError> {
        if self.resolve(rev)?.is_none() {
            return Ok(Vec::new());
        }
        let stdout = self.git(&["rev-list", rev])?;
        stdout
            .lines()
            .map(|line| self.commit_info(&parse_hash(line)?))
            .collect()
    }

    /// Commits reachable from `rev`, every commit after all of its parents
    pub fn rev_list(&self, rev: &str) -> Result<Vec<Hash>, RepoError> {
        let stdout = self.git(&["rev-list", "--topo-order", "--reverse", rev])?;
        stdout.lines().map(parse_hash).collect()
    }

    pub fn is_ancestor(&self, ancestor: &Hash, descendant: &Hash) -> Result<bool, RepoError> {
        let output = self.git_raw(&["merge-base", "--is-ancestor", ancestor.hex(), descendant.hex()])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(command_err(&self.root, "merge-base", &output)),
        }
    }

    /// Store a raw commit object; identical bytes always yield the same hash
    pub fn write_commit(&self, object: &[u8]) -> Result<Hash, RepoError> {
        let mut child = Command::new("git")
            .args(["hash-object", "-t", "commit", "-w", "--stdin"])
            .current_dir(&self.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_err(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(object)?;
        }
        let output = child.wait_with_output()?;
        let stdout = check(&self.root, "hash-object", output)?;
        parse_hash(stdout.trim())
    }

    /// Move `name` to `new`, but only if it still points at `old` (`None`: must not exist)
    pub fn update_ref(&self, name: &str, new: &Hash, old: Option<&Hash>) -> Result<(), RepoError> {
        let old = old.map(|h| h.to_string()).unwrap_or_default();
        self.git(&["update-ref", name, new.hex(), &old])?;
        Ok(())
    }

    pub fn delete_ref(&self, name: &str) -> Result<(), RepoError> {
        self.git(&["update-ref", "-d", name])?;
        Ok(())
    }

    pub fn remotes(&self) -> Result<Vec<String>, RepoError> {
        Ok(self.git(&["remote"])?.lines().map(str::to_string).collect())
    }

    pub fn add_remote(&self, name: &str, uri: &str) -> Result<(), RepoError> {
        debug!(%name, %uri, "Repository::add_remote: called");
        self.git(&["remote", "add", name, uri])?;
        Ok(())
    }

    /// Branches advertised by `remote` (a remote name or a URI)
    pub fn remote_branches(&self, remote: &str) -> Result<Vec<RemoteBranch>, RepoError> {
        let stdout = self.git(&["ls-remote", "--heads", remote])?;
        stdout
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .map(|(hash, name)| {
                Ok(RemoteBranch {
                    name: name.trim_start_matches("refs/heads/").to_string(),
                    hash: parse_hash(hash)?,
                })
            })
            .collect()
    }

    /// URL a remote is fetched from
    pub fn pull_path(&self, remote: &str) -> Result<String, RepoError> {
        Ok(self.git(&["remote", "get-url", remote])?.trim().to_string())
    }

    /// All values of a config key; empty when unset
    pub fn config(&self, key: &str) -> Result<Vec<String>, RepoError> {
        let output = self.git_raw(&["config", "--get-all", key])?;
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).lines().map(str::to_string).collect()),
            Some(1) => Ok(Vec::new()),
            _ => Err(command_err(&self.root, "config", &output)),
        }
    }

    fn git_raw(&self, args: &[&str]) -> Result<Output, RepoError> {
        git_output(&self.root, args)
    }

    fn git(&self, args: &[&str]) -> Result<String, RepoError> {
        let output = self.git_raw(args)?;
        check(&self.root, args.first().copied().unwrap_or("git"), output)
    }

    #[cfg(test)]
    pub(crate) fn git_for_tests(&self, args: &[&str]) -> String {
        self.git(args).expect("git command failed")
    }

    fn spawn_err(&self, source: std::io::Error) -> RepoError {
        RepoError::Spawn {
            dir: self.root.clone(),
            source,
        }
    }
}

fn git_output(dir: &Path, args: &[&str]) -> Result<Output, RepoError> {
    debug!(?dir, ?args, "git");
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|source| RepoError::Spawn {
            dir: dir.to_path_buf(),
            source,
        })
}

fn check(dir: &Path, command: &str, output: Output) -> Result<String, RepoError> {
    if !output.status.success() {
        return Err(command_err(dir, command, &output));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn command_err(dir: &Path, command: &str, output: &Output) -> RepoError {
    RepoError::Command {
        command: command.to_string(),
        dir: dir.to_path_buf(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn parse_hash(hex: &str) -> Result<Hash, RepoError> {
    Hash::parse(hex).map_err(|e| RepoError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Hash {
        let path = repo.root().join(name);
        fs::write(&path, content).unwrap();
        repo.add(&path).unwrap();
        repo.commit(message, "duke", "duke@openjdk.org").unwrap()
    }

    #[test]
    fn test_identity_parse() {
        let id = Identity::parse("Duke Java <duke@openjdk.org> 1700000000 +0100").unwrap();
        assert_eq!(id.name, "Duke Java");
        assert_eq!(id.email, "duke@openjdk.org");
        assert_eq!(id.date, "1700000000 +0100");
        assert!(Identity::parse("no email here").is_err());
    }

    #[test]
    fn test_commit_metadata_parse_skips_signature() {
        let raw = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                   parent 1111111111111111111111111111111111111111\n\
                   author A <a@x> 1 +0000\n\
                   committer C <c@x> 2 +0000\n\
                   gpgsig -----BEGIN PGP SIGNATURE-----\n \n -----END PGP SIGNATURE-----\n\
                   \n\
                   Subject line\n\nBody\n";
        let hash = Hash::parse("2222222222222222222222222222222222222222").unwrap();
        let meta = CommitMetadata::parse(hash, raw).unwrap();
        assert_eq!(meta.parents.len(), 1);
        assert_eq!(meta.subject(), "Subject line");
        assert_eq!(meta.message, b"Subject line\n\nBody\n");
        assert_eq!(meta.committer.date, "2 +0000");
        assert_eq!(meta.encoding, None);
    }

    #[test]
    fn test_replay_drops_signature_and_maps_parents() {
        let raw = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                    parent 1111111111111111111111111111111111111111\n\
                    author A <a@x> 1 +0000\n\
                    committer C <c@x> 2 +0000\n\
                    encoding ISO-8859-1\n\
                    gpgsig -----BEGIN PGP SIGNATURE-----\n \n -----END PGP SIGNATURE-----\n\
                    \n\
                    Caf\xe9\n";
        let hash = Hash::parse("2222222222222222222222222222222222222222").unwrap();
        let meta = CommitMetadata::parse(hash, raw).unwrap();
        assert_eq!(meta.encoding.as_deref(), Some("ISO-8859-1"));
        assert_eq!(meta.message, b"Caf\xe9\n");

        let parent = Hash::parse("3333333333333333333333333333333333333333").unwrap();
        let replayed = meta.replay(&[parent]);
        let expected: &[u8] = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                                parent 3333333333333333333333333333333333333333\n\
                                author A <a@x> 1 +0000\n\
                                committer C <c@x> 2 +0000\n\
                                encoding ISO-8859-1\n\
                                \n\
                                Caf\xe9\n";
        assert_eq!(replayed, expected);
    }

    #[test]
    fn test_init_commit_and_metadata() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo"), VcsKind::Git).unwrap();
        assert_eq!(repo.head().unwrap(), None);
        assert!(repo.commit_metadata("HEAD").unwrap().is_empty());

        let first = commit_file(&repo, "README", "Hello\n", "Add README");
        let second = commit_file(&repo, "README", "Hello\nWorld\n", "Modify README");

        let history = repo.commit_metadata("HEAD").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].hash, second);
        assert_eq!(history[0].parents, vec![first.clone()]);
        assert_eq!(history[1].subject(), "Add README");

        assert_eq!(repo.rev_list("HEAD").unwrap(), vec![first.clone(), second.clone()]);
        assert!(repo.is_ancestor(&first, &second).unwrap());
        assert!(!repo.is_ancestor(&second, &first).unwrap());
    }

    #[test]
    fn test_open_distinguishes_nested_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("repo");
        Repository::init(&root, VcsKind::Git).unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();

        assert!(Repository::open(&root).unwrap().is_some());
        assert!(Repository::open(&root.join("sub")).unwrap().is_none());
        assert!(Repository::open(&dir.path().join("missing")).unwrap().is_none());

        let bare = dir.path().join("bare.git");
        Repository::init(&bare, VcsKind::Bare).unwrap();
        assert!(Repository::open(&bare).unwrap().is_some());
    }

    #[test]
    fn test_write_commit_is_deterministic() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo"), VcsKind::Git).unwrap();
        commit_file(&repo, "README", "Hello\n", "Add README");
        let head = commit_file(&repo, "README", "Hello\nWorld\n", "Modify README");
        let info = repo.commit_info(&head).unwrap();

        let replayed = repo.write_commit(&info.replay(&info.parents)).unwrap();
        assert_eq!(replayed, head);
    }

    #[test]
    fn test_latin1_message_survives_replay() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo"), VcsKind::Git).unwrap();
        let message = dir.path().join("message");
        fs::write(&message, b"Caf\xe9 fix\n").unwrap();
        let path = repo.root().join("cafe");
        fs::write(&path, "cafe\n").unwrap();
        repo.add(&path).unwrap();
        repo.git_for_tests(&[
            "-c",
            "user.name=duke",
            "-c",
            "user.email=duke@openjdk.org",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "i18n.commitEncoding=ISO-8859-1",
            "commit",
            "--quiet",
            "-F",
            &message.to_string_lossy(),
        ]);
        let head = repo.head().unwrap().unwrap();

        let info = repo.commit_info(&head).unwrap();
        assert_eq!(info.encoding.as_deref(), Some("ISO-8859-1"));
        assert_eq!(info.message, b"Caf\xe9 fix\n");
        assert_eq!(repo.write_commit(&info.replay(&[])).unwrap(), head);
    }

    #[test]
    fn test_update_ref_compare_and_swap() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo"), VcsKind::Git).unwrap();
        let first = commit_file(&repo, "a", "1", "one");
        let second = commit_file(&repo, "a", "2", "two");

        repo.update_ref("refs/heads/copy", &first, None).unwrap();
        // creating again must fail, the ref exists
        assert!(repo.update_ref("refs/heads/copy", &second, None).is_err());
        // wrong expected value must fail
        assert!(repo.update_ref("refs/heads/copy", &second, Some(&second)).is_err());
        repo.update_ref("refs/heads/copy", &second, Some(&first)).unwrap();
        assert_eq!(repo.resolve("refs/heads/copy").unwrap(), Some(second));
    }

    #[test]
    fn test_config_and_remotes() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo"), VcsKind::Git).unwrap();
        assert!(repo.config("sync.from").unwrap().is_empty());
        assert!(repo.remotes().unwrap().is_empty());

        repo.git(&["remote", "add", "upstream", "https://example.org/x.git"]).unwrap();
        repo.git(&["config", "sync.from", "upstream"]).unwrap();
        assert_eq!(repo.remotes().unwrap(), vec!["upstream".to_string()]);
        assert_eq!(repo.config("sync.from").unwrap(), vec!["upstream".to_string()]);
        assert_eq!(repo.pull_path("upstream").unwrap(), "https://example.org/x.git");
    }
}
