//! Shared item pools written into by concurrent stage workers.
//!
//! A pool wraps its backing `Vec` behind a single mutex. The lock is held
//! only for the O(batch) copy or append, never for stage work, and no
//! reference to pool contents escapes the locked scope. The lock protects
//! sibling workers racing within one stage; cross-stage ordering is the
//! state machine's join barrier, not the pool's concern.

use parking_lot::Mutex;
use std::ops::Range;

/// A collection of items behind a single lock.
#[derive(Debug)]
pub struct SharedPool<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for SharedPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SharedPool<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Replace the entire contents of the pool.
    pub fn replace(&self, items: Vec<T>) {
        *self.items.lock() = items;
    }

    /// Append a worker's output batch to the end of the pool.
    pub fn append_all(&self, mut batch: Vec<T>) {
        self.items.lock().append(&mut batch);
    }

    /// Overwrite `[start, start + batch.len())` with a worker's output.
    ///
    /// Used by in-place stages where each worker writes back over the range
    /// it extracted; sibling ranges are disjoint by construction.
    pub fn write_range(&self, start: usize, batch: Vec<T>) {
        let mut items = self.items.lock();
        for (offset, item) in batch.into_iter().enumerate() {
            items[start + offset] = item;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

impl<T: Clone> SharedPool<T> {
    /// Copy out the slice `[range.start, range.end)`.
    pub fn extract_range(&self, range: Range<usize>) -> Vec<T> {
        self.items.lock()[range].to_vec()
    }

    /// Copy out the whole pool, for background stages that consume the
    /// entire dataset at once.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_append_and_extract() {
        let pool = SharedPool::new();
        pool.append_all(vec![1, 2, 3]);
        pool.append_all(vec![4, 5]);

        assert_eq!(pool.len(), 5);
        assert_eq!(pool.extract_range(1..4), vec![2, 3, 4]);
        assert_eq!(pool.snapshot(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_write_range_overwrites_in_place() {
        let pool = SharedPool::new();
        pool.replace(vec![0; 6]);
        pool.write_range(2, vec![7, 8, 9]);

        assert_eq!(pool.snapshot(), vec![0, 0, 7, 8, 9, 0]);
    }

    #[test]
    fn test_replace_and_clear() {
        let pool = SharedPool::new();
        pool.replace(vec!["a", "b"]);
        assert_eq!(pool.len(), 2);

        pool.clear();
        assert!(pool.is_empty());
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        const WORKERS: usize = 64;
        const PER_WORKER: usize = 10_000 / WORKERS;

        let pool = Arc::new(SharedPool::new());

        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    // Disjoint batches, appended in several pieces to widen
                    // the interleaving window.
                    let start = worker * PER_WORKER;
                    for piece in (start..start + PER_WORKER).collect::<Vec<_>>().chunks(13) {
                        pool.append_all(piece.to_vec());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut contents = pool.snapshot();
        assert_eq!(contents.len(), WORKERS * PER_WORKER);

        contents.sort_unstable();
        contents.dedup();
        assert_eq!(contents.len(), WORKERS * PER_WORKER, "lost or duplicated elements");
    }
}
