//! Deterministic timer queue for the synthetic generator.
//!
//! Entries are ordered by (deadline, sequence) so equal deadlines fire in the
//! order they were scheduled. Each entry gets a handle that can cancel it.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TimerKey {
    at: Duration,
    seq: u64,
}

/// Cancel handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
pub struct Scheduler<T> {
    queue: BTreeMap<TimerKey, (TimerHandle, T)>,
    live: HashMap<TimerHandle, TimerKey>,
    now: Duration,
    sequence: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self { queue: BTreeMap::new(), live: HashMap::new(), now: Duration::ZERO, sequence: 0 }
    }

    /// Logical clock, advanced by `pop_due` / `advance_to`.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, item: T) -> TimerHandle {
        let key = TimerKey { at: self.now + delay, seq: self.sequence };
        let handle = TimerHandle(self.sequence);
        self.sequence += 1;
        self.queue.insert(key, (handle, item));
        self.live.insert(handle, key);
        handle
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.live.remove(&handle) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.first_key_value().map(|(k, _)| k.at)
    }

    /// Pop the earliest timer if it is due at or before `until`, moving the clock to its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<T> {
        let (&key, _) = self.queue.first_key_value()?;
        if key.at > until {
            return None;
        }
        let (handle, item) = self.queue.remove(&key)?;
        self.live.remove(&handle);
        self.now = self.now.max(key.at);
        Some(item)
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, t: Duration) {
        self.now = self.now.max(t);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_deadline_then_schedule_order() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_millis(20), "late");
        s.schedule(Duration::from_millis(10), "a");
        s.schedule(Duration::from_millis(10), "b");
        let until = Duration::from_secs(1);
        let fired: Vec<_> = std::iter::from_fn(|| s.pop_due(until)).collect();
        assert_eq!(fired, vec!["a", "b", "late"]);
        assert_eq!(s.now(), Duration::from_millis(20));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut s = Scheduler::new();
        let h = s.schedule(Duration::from_millis(5), 1);
        let fired = s.schedule(Duration::from_millis(1), 2);
        assert_eq!(s.pop_due(Duration::from_millis(1)), Some(2));
        assert!(!s.cancel(fired));
        assert_eq!(s.len(), 1);
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(s.is_empty());
        assert_eq!(s.pop_due(Duration::from_secs(10)), None);
    }

    #[test]
    fn test_not_due_yet() {
        let mut s = Scheduler::new();
        s.advance_to(Duration::from_millis(100));
        s.schedule(Duration::from_millis(50), ());
        assert_eq!(s.next_deadline(), Some(Duration::from_millis(150)));
        assert_eq!(s.pop_due(Duration::from_millis(149)), None);
        assert_eq!(s.len(), 1);
    }
}
