//! ExpiryQueue: min-heap of entries keyed on `(expire_at, path)`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::domain::Entry;

/// Heap slot for the priority queue.
///
/// We use reverse ordering so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheduled(Entry);

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering: earlier expiry has higher priority
        other.0.cmp(&self.0)
    }
}

/// Pending deletions ordered by expiration.
///
/// Not synchronized; the scheduler keeps it behind its own lock together
/// with the per-path records.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    heap: BinaryHeap<Scheduled>,
}

impl ExpiryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// O(log n).
    pub fn push(&mut self, entry: Entry) {
        self.heap.push(Scheduled(entry));
    }

    /// O(1).
    pub fn peek_min(&self) -> Option<&Entry> {
        self.heap.peek().map(|s| &s.0)
    }

    /// O(log n).
    pub fn pop_min(&mut self) -> Option<Entry> {
        self.heap.pop().map(|s| s.0)
    }

    /// Pop the minimum only if it is due at `now`.
    pub fn pop_due(&mut self, now: chrono::DateTime<chrono::Utc>) -> Option<Entry> {
        if self.peek_min()?.is_due(now) {
            self.pop_min()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Entries in heap (array) order, not sorted.
    #[cfg(test)]
    fn as_slice(&self) -> Vec<&Entry> {
        self.heap.as_slice().iter().map(|s| &s.0).collect()
    }
}
