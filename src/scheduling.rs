//! Scheduling utilities – a `Clock` abstraction plus a tiny virtual-time
//! `Timeline` the stores use for delayed transitions (notification expiry,
//! the post-animation removal, the loading bar hide delay).
//!
//! Nothing in here owns a real timer.  Stores push events onto their
//! timeline and the caller drives them with `tick()`: the browser build does
//! that from an interval (see `lib.rs`), tests do it by advancing a
//! [`ManualClock`].  Events fire in `(due, insertion)` order and report the
//! instant they were *due*, so follow-up transitions are scheduled relative
//! to that instant rather than to whenever the tick happened to run.

use std::cell::Cell;

/// Source of "now" in milliseconds since the UNIX epoch.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall clock: `Date.now()` in the browser, chrono everywhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Hand-driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

pub type TimerId = u64;

#[derive(Debug, Clone)]
struct Scheduled<E> {
    id: TimerId,
    due_ms: u64,
    event: E,
}

/// Pending delayed events, each individually cancellable.
#[derive(Debug, Clone)]
pub struct Timeline<E> {
    next_id: TimerId,
    entries: Vec<Scheduled<E>>,
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

impl<E> Timeline<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to fire at the absolute instant `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, event: E) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Scheduled { id, due_ms, event });
        id
    }

    /// Cancel a pending event.  Returns `false` if it already fired or never
    /// existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }

    /// Earliest pending due instant, if any.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().map(|s| s.due_ms).min()
    }

    /// Remove and return the earliest event due at or before `now_ms`
    /// together with its due instant.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, E)> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_ms <= now_ms)
            .min_by_key(|(_, s)| (s.due_ms, s.id))
            .map(|(i, _)| i)?;
        let s = self.entries.remove(idx);
        Some((s.due_ms, s.event))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_due_then_insertion_order() {
        let mut t = Timeline::new();
        t.schedule(200, "b");
        t.schedule(100, "a");
        t.schedule(200, "c");

        assert_eq!(t.next_due(), Some(100));
        assert_eq!(t.pop_due(50), None);
        assert_eq!(t.pop_due(500), Some((100, "a")));
        assert_eq!(t.pop_due(500), Some((200, "b")));
        assert_eq!(t.pop_due(500), Some((200, "c")));
        assert!(t.is_empty());
    }

    #[test]
    fn cancel_removes_only_pending() {
        let mut t = Timeline::new();
        let a = t.schedule(10, 1);
        let b = t.schedule(20, 2);
        assert!(t.cancel(a));
        assert!(!t.cancel(a));
        assert_eq!(t.len(), 1);
        assert_eq!(t.pop_due(20), Some((20, 2)));
        assert!(!t.cancel(b));
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 1_250);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }
}
