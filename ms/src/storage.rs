//! The mark storage interface shared by every backend

use std::path::Path;

use crate::error::StoreError;
use crate::mark::Mark;
use crate::set::PutReport;

/// Durable home of the marks of one mirror
pub trait MarkStorage: Send + Sync {
    /// Bring up a process-local view of the durable state rooted at `work_dir`.
    ///
    /// May perform network I/O. Calling it again on a later run refreshes the
    /// view instead of failing.
    fn materialize(&self, work_dir: &Path) -> Result<Box<dyn MarkHandle>, StoreError>;
}

/// Process-local view of a mark store, owned by one run
pub trait MarkHandle: Send {
    /// Marks ascending by key, as of materialisation or the last successful `put`
    fn current(&self) -> &[Mark];

    /// Durably append `marks`.
    ///
    /// Returns only once the marks are committed to the backing store. An
    /// error means none of the offered marks were made durable.
    fn put(&mut self, marks: &[Mark]) -> Result<PutReport, StoreError>;
}
