//! Work item and bot traits

use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A unit of work the runner executes on a blocking worker thread
pub trait WorkItem: Send + Sync + fmt::Display {
    /// Whether this item may run at the same time as `other`.
    ///
    /// Must be symmetric, and must return `true` for items of a kind the
    /// implementation does not know about.
    fn concurrent_with(&self, other: &dyn WorkItem) -> bool;

    /// Do the work. Returned items are submitted to the runner afterwards.
    fn run(&self, scratch: &Path) -> eyre::Result<Vec<Arc<dyn WorkItem>>>;

    /// Access to the concrete type, for `concurrent_with` implementations
    fn as_any(&self) -> &dyn Any;
}

/// Source of work items that must be run periodically
pub trait Bot: Send + Sync {
    fn periodic_items(&self) -> Vec<Arc<dyn WorkItem>>;
}

/// True when neither item objects to running alongside the other
pub fn may_run_together(a: &dyn WorkItem, b: &dyn WorkItem) -> bool {
    a.concurrent_with(b) && b.concurrent_with(a)
}
