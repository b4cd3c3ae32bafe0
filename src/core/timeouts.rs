//! Scheduled actions with key based cancellation
use std::time::{Duration, Instant};

/// A sorted queue of items due at specific instants.
///
/// The earliest due time defines the poll deadline of the main loop. Items
/// carry a key; scheduling under an existing key replaces the previous entry
/// and cancellation removes by key.
#[derive(Debug, Clone)]
pub struct TimeoutQueue<T> {
    // kept sorted by due time, earliest first
    entries: Vec<(String, Instant, T)>,
}

impl<T> Default for TimeoutQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> TimeoutQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `item` under `key`, due at `due`. Replaces any previous
    /// entry with the same key.
    pub fn schedule(&mut self, key: impl Into<String>, due: Instant, item: T) {
        let key = key.into();
        self.cancel(&key);

        let at = self
            .entries
            .iter()
            .position(|(_, d, _)| *d > due)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, (key, due, item));
    }

    /// Remove the entry scheduled under `key`, if any.
    pub fn cancel(&mut self, key: &str) -> Option<T> {
        let i = self.entries.iter().position(|(k, _, _)| k == key)?;
        Some(self.entries.remove(i).2)
    }

    /// The due time of the earliest entry.
    pub fn next_due(&self) -> Option<Instant> {
        self.entries.first().map(|(_, due, _)| *due)
    }

    /// How long until the earliest entry is due, `Duration::ZERO` if overdue.
    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due().map(|due| due.saturating_duration_since(now))
    }

    /// Remove and return every entry due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<T> {
        let mut fired = Vec::new();
        while matches!(self.entries.first(), Some((_, due, _)) if *due <= now) {
            fired.push(self.entries.remove(0).2);
        }

        fired
    }

    /// Number of scheduled entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_due_fires_in_due_order() {
        let now = Instant::now();
        let mut q = TimeoutQueue::new();
        q.schedule("b", now + Duration::from_millis(20), "b");
        q.schedule("a", now + Duration::from_millis(10), "a");
        q.schedule("c", now + Duration::from_millis(30), "c");

        assert_eq!(q.pop_due(now + Duration::from_millis(25)), vec!["a", "b"]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(now + Duration::from_millis(35)), vec!["c"]);
    }

    #[test]
    fn schedule_same_key_replaces() {
        let now = Instant::now();
        let mut q = TimeoutQueue::new();
        q.schedule("k", now + Duration::from_millis(10), 1);
        q.schedule("k", now + Duration::from_millis(50), 2);

        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(now + Duration::from_millis(20)), Vec::<i32>::new());
        assert_eq!(q.pop_due(now + Duration::from_millis(60)), vec![2]);
    }

    #[test]
    fn cancel_removes_by_key() {
        let now = Instant::now();
        let mut q = TimeoutQueue::new();
        q.schedule("keep", now, 1);
        q.schedule("drop", now, 2);

        assert_eq!(q.cancel("drop"), Some(2));
        assert_eq!(q.cancel("drop"), None);
        assert_eq!(q.pop_due(now), vec![1]);
    }

    #[test]
    fn until_next_saturates_when_overdue() {
        let now = Instant::now();
        let mut q = TimeoutQueue::new();

        assert_eq!(q.until_next(now), None);

        q.schedule("k", now, ());
        assert_eq!(q.until_next(now + Duration::from_millis(5)), Some(Duration::ZERO));
    }
}
