//! Validated, ascending collection of marks

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::MARK_ORIGIN;
use crate::error::StoreError;
use crate::mark::{Hash, Mark};

/// Outcome of appending a batch of marks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutReport {
    /// Marks newly made durable
    pub appended: usize,
    /// Marks already present with identical content
    pub skipped: usize,
}

/// Dense, strictly ascending mark sequence with unique hashes on both sides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSet {
    marks: Vec<Mark>,
    sources: HashMap<Hash, u32>,
    targets: HashMap<Hash, u32>,
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from marks in any order, enforcing every invariant
    pub fn from_marks(mut marks: Vec<Mark>) -> Result<Self, StoreError> {
        debug!(count = marks.len(), "MarkSet::from_marks: called");
        marks.sort_by_key(|m| m.key);

        let mut set = Self::new();
        for mark in marks {
            if let Some(last) = set.marks.last()
                && last.key == mark.key
            {
                return Err(StoreError::Conflict {
                    key: mark.key,
                    reason: "duplicate key".to_string(),
                });
            }
            set.check_next(&mark, set.next_key(), &HashSet::new(), &HashSet::new())?;
            set.push(mark);
        }
        Ok(set)
    }

    /// Marks in ascending key order
    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Mark with the highest key
    pub fn last(&self) -> Option<&Mark> {
        self.marks.last()
    }

    /// Key the next appended mark must carry
    pub fn next_key(&self) -> u32 {
        self.marks.last().map(|m| m.key + 1).unwrap_or(MARK_ORIGIN)
    }

    pub fn get(&self, key: u32) -> Option<&Mark> {
        let idx = key.checked_sub(MARK_ORIGIN)? as usize;
        self.marks.get(idx)
    }

    /// Target commit a source commit was translated into
    pub fn target_for(&self, source: &Hash) -> Option<&Hash> {
        self.sources.get(source).and_then(|key| self.get(*key)).map(|m| &m.target)
    }

    pub fn contains_source(&self, source: &Hash) -> bool {
        self.sources.contains_key(source)
    }

    /// Append a batch, all or nothing.
    ///
    /// Marks identical to stored ones are skipped. Any other mark must extend
    /// the sequence at `next_key()` without reusing a hash.
    pub fn append(&mut self, batch: &[Mark]) -> Result<PutReport, StoreError> {
        debug!(count = batch.len(), next = self.next_key(), "MarkSet::append: called");
        let mut ordered: Vec<&Mark> = batch.iter().collect();
        ordered.sort_by_key(|m| m.key);

        let mut report = PutReport::default();
        let mut staged: Vec<Mark> = Vec::new();
        let mut staged_sources = HashSet::new();
        let mut staged_targets = HashSet::new();
        let mut next = self.next_key();

        for mark in ordered {
            if mark.key < self.next_key() {
                match self.get(mark.key) {
                    Some(existing) if existing == mark => {
                        report.skipped += 1;
                        continue;
                    }
                    Some(existing) => {
                        return Err(StoreError::Conflict {
                            key: mark.key,
                            reason: format!(
                                "stored {} -> {}, offered {} -> {}",
                                existing.source, existing.target, mark.source, mark.target
                            ),
                        });
                    }
                    None => {
                        return Err(StoreError::Conflict {
                            key: mark.key,
                            reason: "key precedes the first mark".to_string(),
                        });
                    }
                }
            }

            if mark.key < next {
                return Err(StoreError::Conflict {
                    key: mark.key,
                    reason: "duplicate key in batch".to_string(),
                });
            }
            self.check_next(mark, next, &staged_sources, &staged_targets)?;
            staged_sources.insert(mark.source.clone());
            staged_targets.insert(mark.target.clone());
            staged.push(mark.clone());
            next += 1;
        }

        report.appended = staged.len();
        for mark in staged {
            self.push(mark);
        }
        debug!(?report, "MarkSet::append: done");
        Ok(report)
    }

    pub fn into_vec(self) -> Vec<Mark> {
        self.marks
    }

    fn check_next(
        &self,
        mark: &Mark,
        expected: u32,
        staged_sources: &HashSet<Hash>,
        staged_targets: &HashSet<Hash>,
    ) -> Result<(), StoreError> {
        if mark.key != expected {
            return Err(StoreError::Gap {
                expected,
                found: mark.key,
            });
        }
        if let Some(existing) = self.sources.get(&mark.source) {
            return Err(StoreError::DuplicateHash {
                which: "source",
                hash: mark.source.to_string(),
                existing: *existing,
            });
        }
        if let Some(existing) = self.targets.get(&mark.target) {
            return Err(StoreError::DuplicateHash {
                which: "target",
                hash: mark.target.to_string(),
                existing: *existing,
            });
        }
        if staged_sources.contains(&mark.source) || staged_targets.contains(&mark.target) {
            return Err(StoreError::DuplicateHash {
                which: "batch",
                hash: mark.source.to_string(),
                existing: mark.key,
            });
        }
        Ok(())
    }

    fn push(&mut self, mark: Mark) {
        self.sources.insert(mark.source.clone(), mark.key);
        self.targets.insert(mark.target.clone(), mark.key);
        self.marks.push(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hash(n: u32, side: char) -> Hash {
        Hash::parse(&format!("{}{:039x}", if side == 's' { 'a' } else { 'b' }, n)).unwrap()
    }

    fn mark(key: u32) -> Mark {
        Mark::new(key, hash(key, 's'), hash(key, 't'))
    }

    fn set_of(n: u32) -> MarkSet {
        MarkSet::from_marks((1..=n).map(mark).collect()).unwrap()
    }

    #[test]
    fn test_from_marks_sorts() {
        let set = MarkSet::from_marks(vec![mark(3), mark(1), mark(2)]).unwrap();
        let keys: Vec<u32> = set.marks().iter().map(|m| m.key).collect();
        assert_eq!(keys, vec![1, 2, 3]);
        assert_eq!(set.next_key(), 4);
    }

    #[test]
    fn test_from_marks_rejects_duplicate_key() {
        let err = MarkSet::from_marks(vec![mark(1), mark(1)]).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { key: 1, .. }));
    }

    #[test]
    fn test_from_marks_rejects_gap() {
        let err = MarkSet::from_marks(vec![mark(1), mark(3)]).unwrap_err();
        assert!(matches!(err, StoreError::Gap { expected: 2, found: 3 }));
    }

    #[test]
    fn test_from_marks_rejects_wrong_origin() {
        let err = MarkSet::from_marks(vec![mark(2)]).unwrap_err();
        assert!(matches!(err, StoreError::Gap { expected: 1, found: 2 }));
    }

    #[test]
    fn test_from_marks_rejects_reused_source() {
        let reused = Mark::new(2, hash(1, 's'), hash(2, 't'));
        let err = MarkSet::from_marks(vec![mark(1), reused]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHash { which: "source", .. }));
    }

    #[test]
    fn test_append_extends_sequence() {
        let mut set = set_of(2);
        let report = set.append(&[mark(3), mark(4)]).unwrap();
        assert_eq!(report, PutReport { appended: 2, skipped: 0 });
        assert_eq!(set.len(), 4);
        assert_eq!(set.target_for(&hash(4, 's')), Some(&hash(4, 't')));
    }

    #[test]
    fn test_append_skips_identical_marks() {
        let mut set = set_of(3);
        let report = set.append(&[mark(2), mark(3), mark(4)]).unwrap();
        assert_eq!(report, PutReport { appended: 1, skipped: 2 });
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_append_rejects_rewrite_of_stored_key() {
        let mut set = set_of(3);
        let rewrite = Mark::new(3, hash(30, 's'), hash(30, 't'));
        let err = set.append(&[rewrite]).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { key: 3, .. }));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_append_rejects_gap_without_partial_write() {
        let mut set = set_of(1);
        let err = set.append(&[mark(2), mark(4)]).unwrap_err();
        assert!(matches!(err, StoreError::Gap { expected: 3, found: 4 }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_append_rejects_duplicate_within_batch() {
        let mut set = set_of(1);
        let twin = Mark::new(3, hash(2, 's'), hash(3, 't'));
        let err = set.append(&[mark(2), twin]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHash { .. }));
    }

    #[test]
    fn test_empty_append_is_noop() {
        let mut set = set_of(2);
        assert_eq!(set.append(&[]).unwrap(), PutReport::default());
        assert_eq!(set.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_shuffled_dense_marks_always_load(n in 1u32..40, seed in any::<u64>()) {
            let mut marks: Vec<Mark> = (1..=n).map(mark).collect();
            // deterministic shuffle
            let len = marks.len();
            for i in 0..len {
                let j = ((seed.wrapping_mul(i as u64 + 1)) % len as u64) as usize;
                marks.swap(i, j);
            }
            let set = MarkSet::from_marks(marks).unwrap();
            prop_assert_eq!(set.len(), n as usize);
            prop_assert!(set.marks().windows(2).all(|w| w[0].key + 1 == w[1].key));
        }
    }
}
