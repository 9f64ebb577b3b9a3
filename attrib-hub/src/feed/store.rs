//! Bounded event window
//!
//! Newest-first sequence of the most recent traces. Inserting past capacity
//! evicts from the tail. There is no deduplication and no update or delete.

use std::collections::VecDeque;

use attrib_common::CommitTrace;

/// Default number of traces retained
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

#[derive(Debug)]
pub struct EventStore {
    window: VecDeque<CommitTrace>,
    capacity: usize,
}

impl EventStore {
    /// Create an empty window; a capacity of 0 is raised to 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a trace, evicting the oldest entries beyond capacity
    ///
    /// Returns the number of evicted traces.
    pub fn push(&mut self, trace: CommitTrace) -> usize {
        self.window.push_front(trace);
        let evicted = self.window.len().saturating_sub(self.capacity);
        self.window.truncate(self.capacity);
        evicted
    }

    /// Copy of the window, newest first
    pub fn snapshot(&self) -> Vec<CommitTrace> {
        self.window.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(n: usize) -> CommitTrace {
        CommitTrace {
            id: format!("trace-{}", n),
            timestamp: String::new(),
            trace_id: String::new(),
            span_id: String::new(),
            commit_id: String::new(),
            commit_short: format!("c{}", n),
            message: String::new(),
            author: String::new(),
            email: String::new(),
            branch: String::new(),
            repo: String::new(),
            ai_stats: String::new(),
        }
    }

    #[test]
    fn keeps_newest_first() {
        let mut store = EventStore::default();
        store.push(trace(1));
        store.push(trace(2));
        store.push(trace(3));

        let ids: Vec<_> = store.snapshot().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["trace-3", "trace-2", "trace-1"]);
    }

    #[test]
    fn caps_window_at_capacity() {
        let mut store = EventStore::default();
        let mut evicted = 0;
        for n in 0..150 {
            evicted += store.push(trace(n));
        }

        assert_eq!(evicted, 50);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 100);
        assert_eq!(snapshot.first().unwrap().id, "trace-149");
        assert_eq!(snapshot.last().unwrap().id, "trace-50");
        for (i, t) in snapshot.iter().enumerate() {
            assert_eq!(t.id, format!("trace-{}", 149 - i));
        }
    }

    #[test]
    fn hundred_and_first_push_evicts_oldest() {
        let mut store = EventStore::default();
        for n in 0..100 {
            assert_eq!(store.push(trace(n)), 0);
        }
        assert_eq!(store.push(trace(100)), 1);
        assert_eq!(store.len(), 100);
        assert!(store.snapshot().iter().all(|t| t.id != "trace-0"));
    }

    #[test]
    fn repeated_commits_are_not_deduplicated() {
        let mut store = EventStore::default();
        store.push(trace(7));
        store.push(trace(7));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshot_is_detached_from_later_pushes() {
        let mut store = EventStore::new(2);
        store.push(trace(1));
        let before = store.snapshot();

        store.push(trace(2));
        store.push(trace(3));

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].id, "trace-1");
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut store = EventStore::new(0);
        store.push(trace(1));
        store.push(trace(2));
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.snapshot()[0].id, "trace-2");
    }
}
