//! Plain-file mark storage
//!
//! The legacy on-disk format: one `marks.txt` per mirror. Writers serialize
//! through an exclusive `fs2` lock on a sibling `.lock` file, re-read the file
//! under the lock and replace it atomically, so concurrent processes on the
//! same host cannot interleave or lose appends.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::mark::{Mark, format_marks, parse_marks};
use crate::set::{MarkSet, PutReport};
use crate::storage::{MarkHandle, MarkStorage};

/// Marks kept in a single local file
#[derive(Debug, Clone)]
pub struct FileMarkStorage {
    path: PathBuf,
}

impl FileMarkStorage {
    /// A relative `path` is resolved against the work dir given to `materialize`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read an existing marks file without creating anything.
    ///
    /// Unlike `materialize`, a missing file is an error here.
    pub fn read(&self) -> Result<MarkSet, StoreError> {
        debug!(path = ?self.path, "FileMarkStorage::read: called");
        let content = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        MarkSet::from_marks(parse_marks(&content)?)
    }
}

impl MarkStorage for FileMarkStorage {
    fn materialize(&self, work_dir: &Path) -> Result<Box<dyn MarkHandle>, StoreError> {
        let path = if self.path.is_relative() {
            work_dir.join(&self.path)
        } else {
            self.path.clone()
        };
        debug!(?path, "FileMarkStorage::materialize: called");

        let handle = FileMarkHandle::open(path)?;
        Ok(Box::new(handle))
    }
}

/// Handle over a marks file
pub struct FileMarkHandle {
    path: PathBuf,
    lock_path: PathBuf,
    set: MarkSet,
}

impl FileMarkHandle {
    fn open(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let lock_path = lock_path_for(&path);

        let lock = open_lock(&lock_path)?;
        lock.lock_shared().map_err(|e| StoreError::io(&lock_path, e))?;
        let set = read_set(&path);
        let _ = lock.unlock();
        let set = set?;

        debug!(count = set.len(), "FileMarkHandle::open: loaded marks");
        Ok(Self { path, lock_path, set })
    }
}

impl MarkHandle for FileMarkHandle {
    fn current(&self) -> &[Mark] {
        self.set.marks()
    }

    fn put(&mut self, marks: &[Mark]) -> Result<PutReport, StoreError> {
        debug!(count = marks.len(), path = ?self.path, "FileMarkHandle::put: called");
        if marks.is_empty() {
            return Ok(PutReport::default());
        }

        let lock = open_lock(&self.lock_path)?;
        lock.lock_exclusive().map_err(|e| StoreError::io(&self.lock_path, e))?;
        let result = self.append_locked(marks);
        let _ = lock.unlock();
        result
    }
}

impl FileMarkHandle {
    fn append_locked(&mut self, marks: &[Mark]) -> Result<PutReport, StoreError> {
        let mut latest = read_set(&self.path)?;
        if latest != self.set {
            debug!(
                snapshot = self.set.len(),
                on_disk = latest.len(),
                "FileMarkHandle::put: marks file changed since materialize"
            );
        }

        let report = latest.append(marks)?;
        if report.appended > 0 {
            write_atomically(&self.path, &format_marks(latest.marks()))?;
            info!(appended = report.appended, path = ?self.path, "Persisted marks");
        }
        self.set = latest;
        Ok(report)
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn open_lock(lock_path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| StoreError::io(lock_path, e))
}

pub(crate) fn read_set(path: &Path) -> Result<MarkSet, StoreError> {
    if !path.exists() {
        return Ok(MarkSet::new());
    }
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    MarkSet::from_marks(parse_marks(&content)?)
}

pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(content.as_bytes()).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}
