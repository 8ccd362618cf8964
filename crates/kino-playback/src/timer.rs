//! Single-shot delayed callback primitive
//!
//! A [`Scheduler`] only keeps time. When a timer fires the host hands its
//! [`TimerId`] back to the normalizer, which stays the sole writer of its own
//! state.

use std::collections::BTreeMap;
use std::time::Duration;

/// Opaque handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

impl TimerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Schedules single-shot timers and cancels them
pub trait Scheduler {
    /// Arm a timer firing once after `delay`
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Disarm a timer. Unknown or already fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

/// Deterministic scheduler driven by a virtual clock
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    /// Deadline per pending timer
    pending: BTreeMap<TimerId, Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Pop the earliest timer due by `until`, moving the clock to its deadline
    pub fn fire_next(&mut self, until: Duration) -> Option<TimerId> {
        let (id, deadline) = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= until)
            .min_by_key(|(id, deadline)| (**deadline, **id))
            .map(|(id, deadline)| (*id, *deadline))?;

        self.pending.remove(&id);
        self.now = self.now.max(deadline);
        Some(id)
    }

    /// Move the clock to `until`, returning the timers that came due, earliest first
    pub fn advance_to(&mut self, until: Duration) -> Vec<TimerId> {
        let mut due = Vec::new();
        while let Some(id) = self.fire_next(until) {
            due.push(id);
        }
        self.now = self.now.max(until);
        due
    }

    /// Move the clock forward by `by`, saturating at the end of time
    pub fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        self.advance_to(self.now.saturating_add(by))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.insert(id, self.now.saturating_add(delay));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_deadline() {
        let mut scheduler = ManualScheduler::new();
        let id = scheduler.schedule(Duration::from_millis(50));

        assert!(scheduler.advance(Duration::from_millis(49)).is_empty());
        assert_eq!(scheduler.advance(Duration::from_millis(1)), vec![id]);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.now(), Duration::from_millis(50));
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut scheduler = ManualScheduler::new();
        let id = scheduler.schedule(Duration::from_millis(10));
        scheduler.cancel(id);

        assert!(!scheduler.is_pending(id));
        assert!(scheduler.advance(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_due_timers_ordered_by_deadline() {
        let mut scheduler = ManualScheduler::new();
        let late = scheduler.schedule(Duration::from_millis(30));
        let early = scheduler.schedule(Duration::from_millis(10));

        assert_eq!(scheduler.advance(Duration::from_millis(40)), vec![early, late]);
    }

    #[test]
    fn test_clock_steps_to_each_deadline() {
        let mut scheduler = ManualScheduler::new();
        let first = scheduler.schedule(Duration::from_millis(50));
        let second = scheduler.schedule(Duration::from_millis(70));
        let until = Duration::from_secs(1);

        assert_eq!(scheduler.fire_next(until), Some(first));
        assert_eq!(scheduler.now(), Duration::from_millis(50));
        assert_eq!(scheduler.fire_next(until), Some(second));
        assert_eq!(scheduler.now(), Duration::from_millis(70));
        assert_eq!(scheduler.fire_next(until), None);

        assert!(scheduler.advance_to(until).is_empty());
        assert_eq!(scheduler.now(), until);
    }

    #[test]
    fn test_clock_saturates() {
        let mut scheduler = ManualScheduler::new();
        scheduler.advance(Duration::MAX);
        scheduler.advance(Duration::MAX);
        assert_eq!(scheduler.now(), Duration::MAX);

        let id = scheduler.schedule(Duration::from_millis(10));
        assert_eq!(scheduler.advance(Duration::from_millis(10)), vec![id]);
    }
}
