//! Append-only record cache.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Every record received for one dataset, in arrival order.
///
/// Records are never deduplicated or reordered; a record's identity is its
/// index. The revision increments on every change so readers can tell
/// whether derived views need recomputing.
#[derive(Debug)]
pub struct RecordCache<T> {
    records: Vec<T>,
    revision: u64,
}

impl<T> Default for RecordCache<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            revision: 0,
        }
    }
}

impl<T> RecordCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch in one update. Empty batches are ignored.
    pub fn extend(&mut self, batch: Vec<T>) {
        if batch.is_empty() {
            return;
        }
        if self.records.is_empty() {
            self.records = batch;
        } else {
            self.records.extend(batch);
        }
        self.revision += 1;
    }

    /// Discards every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.revision += 1;
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The cached records.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    /// Change counter.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}

/// A [`RecordCache`] shared between a loader and its readers.
#[derive(Debug)]
pub struct SharedCache<T>(Arc<RwLock<RecordCache<T>>>);

impl<T> Clone for SharedCache<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for SharedCache<T> {
    fn default() -> Self {
        Self(Arc::new(RwLock::new(RecordCache::new())))
    }
}

impl<T> SharedCache<T> {
    /// Creates an empty shared cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access. A poisoned lock is recovered; the cache holds no
    /// invariants a panicking writer could break halfway.
    pub fn read(&self) -> RwLockReadGuard<'_, RecordCache<T>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, RecordCache<T>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_appends_in_order() {
        let mut cache = RecordCache::new();
        cache.extend(vec![1, 2]);
        cache.extend(vec![3]);
        assert_eq!(cache.as_slice(), [1, 2, 3]);
        assert_eq!(cache.revision(), 2);
    }

    #[test]
    fn empty_batch_does_not_bump_revision() {
        let mut cache = RecordCache::<u8>::new();
        cache.extend(Vec::new());
        assert_eq!(cache.revision(), 0);
    }

    #[test]
    fn clear_empties_and_bumps_revision() {
        let mut cache = RecordCache::new();
        cache.extend(vec!["a"]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.revision(), 2);
    }

    #[test]
    fn shared_handles_see_the_same_records() {
        let cache = SharedCache::new();
        let reader = cache.clone();
        cache.write().extend(vec![10, 20]);
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.read().as_slice(), [10, 20]);
    }
}
