#![forbid(unsafe_code)]

//! Virtual-time one-shot timers.
//!
//! The page never sleeps. Deferred work (hiding the loading screen, the
//! post-open scroll, the next countdown tick) is queued here with a delay
//! and fires when the host advances virtual time past its deadline. Timers
//! due at the same instant fire in scheduling order.

use std::collections::BTreeMap;
use std::time::Duration;

/// Handle returned by [`TimerQueue::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Pending timers keyed by `(deadline, id)`.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), T>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Virtual time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fire `payload` once `delay` has elapsed.
    pub fn schedule(&mut self, delay: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((self.now.saturating_add(delay), id), payload);
        id
    }

    /// Drop a pending timer. Returns its payload if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let key = self.pending.keys().find(|(_, k)| *k == id).copied()?;
        self.pending.remove(&key)
    }

    /// Drop every pending timer whose payload matches.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, payload| !pred(payload));
        before - self.pending.len()
    }

    /// Time until the earliest deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending
            .keys()
            .next()
            .map(|(due, _)| due.saturating_sub(self.now))
    }

    /// Pop the earliest timer due at or before `limit`, moving the clock to
    /// its deadline.
    ///
    /// Callers advancing by `dt` pop repeatedly with `limit = now + dt` so
    /// that work scheduled by a firing timer is seen in the same advance.
    pub fn pop_due(&mut self, limit: Duration) -> Option<(Duration, T)> {
        let (&(due, id), _) = self.pending.iter().next()?;
        if due > limit {
            return None;
        }
        let payload = self.pending.remove(&(due, id))?;
        self.now = self.now.max(due);
        Some((due, payload))
    }

    /// Move the clock to `instant` without firing anything.
    pub fn settle(&mut self, instant: Duration) {
        self.now = self.now.max(instant);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.pending.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(queue: &mut TimerQueue<&'static str>, dt: Duration) -> Vec<&'static str> {
        let limit = queue.now() + dt;
        let mut fired = Vec::new();
        while let Some((_, p)) = queue.pop_due(limit) {
            fired.push(p);
        }
        queue.settle(limit);
        fired
    }

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(300), "c");
        q.schedule(ms(100), "a");
        q.schedule(ms(100), "b");
        assert_eq!(q.next_deadline(), Some(ms(100)));
        assert_eq!(drain(&mut q, ms(99)), Vec::<&str>::new());
        assert_eq!(drain(&mut q, ms(1)), vec!["a", "b"]);
        assert_eq!(drain(&mut q, ms(500)), vec!["c"]);
        assert!(q.is_empty());
        assert_eq!(q.now(), ms(600));
    }

    #[test]
    fn delays_are_relative_to_virtual_now() {
        let mut q = TimerQueue::new();
        drain(&mut q, ms(1_000));
        q.schedule(ms(50), "x");
        assert_eq!(q.next_deadline(), Some(ms(50)));
        assert_eq!(drain(&mut q, ms(50)), vec!["x"]);
    }

    #[test]
    fn cancel_removes_pending() {
        let mut q = TimerQueue::new();
        let id = q.schedule(ms(10), "gone");
        q.schedule(ms(20), "kept");
        assert_eq!(q.cancel(id), Some("gone"));
        assert_eq!(q.cancel(id), None);
        assert_eq!(drain(&mut q, ms(30)), vec!["kept"]);
    }

    #[test]
    fn cancel_where_filters_payloads() {
        let mut q = TimerQueue::new();
        q.schedule(ms(10), "tick");
        q.schedule(ms(20), "tick");
        q.schedule(ms(30), "hide");
        assert_eq!(q.cancel_where(|p| *p == "tick"), 2);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec!["hide"]);
    }

    proptest::proptest! {
        #[test]
        fn chunked_advances_fire_in_sorted_order(
            delays in proptest::collection::vec(0u64..500, 1..24),
            chunks in proptest::collection::vec(1u64..200, 1..12),
        ) {
            let mut q = TimerQueue::new();
            for (i, d) in delays.iter().enumerate() {
                q.schedule(ms(*d), i);
            }
            let mut fired = Vec::new();
            for chunk in chunks.iter().chain(std::iter::once(&500)) {
                let limit = q.now() + ms(*chunk);
                while let Some((_, i)) = q.pop_due(limit) {
                    fired.push(i);
                }
                q.settle(limit);
            }
            let mut expected: Vec<usize> = (0..delays.len()).collect();
            expected.sort_by_key(|&i| (delays[i], i));
            proptest::prop_assert_eq!(fired, expected);
        }
    }
}
