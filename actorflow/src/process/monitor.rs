//! Blocked-thread accounting for deadlock detection.
//!
//! Actor threads register when they start and finish. Mailboxes report
//! threads that block without a timeout; the thread that wakes them releases
//! the count while still holding the mailbox lock, so the monitor never sees
//! a woken thread as blocked.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Counts at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    /// Threads started and not yet finished
    pub active: usize,
    pub blocked_readers: usize,
    pub blocked_writers: usize,
}

impl ActivitySnapshot {
    pub fn blocked(&self) -> usize {
        self.blocked_readers + self.blocked_writers
    }

    /// Every live thread is waiting on a mailbox
    pub fn is_deadlocked(&self) -> bool {
        self.active > 0 && self.blocked() >= self.active
    }

    pub fn all_finished(&self) -> bool {
        self.active == 0
    }
}

#[derive(Debug, Default)]
pub struct ActivityMonitor {
    state: Mutex<ActivitySnapshot>,
    changed: Condvar,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ActivitySnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut ActivitySnapshot)) {
        let mut state = self.lock();
        f(&mut state);
        self.changed.notify_all();
    }

    /// Start a new run with `active` threads about to be spawned
    pub fn reset(&self, active: usize) {
        self.update(|s| *s = ActivitySnapshot { active, ..Default::default() });
    }

    pub fn thread_finished(&self) {
        self.update(|s| s.active = s.active.saturating_sub(1));
    }

    pub fn reader_blocked(&self) {
        self.update(|s| s.blocked_readers += 1);
    }

    pub fn readers_unblocked(&self, count: usize) {
        self.update(|s| s.blocked_readers = s.blocked_readers.saturating_sub(count));
    }

    pub fn writer_blocked(&self) {
        self.update(|s| s.blocked_writers += 1);
    }

    pub fn writers_unblocked(&self, count: usize) {
        self.update(|s| s.blocked_writers = s.blocked_writers.saturating_sub(count));
    }

    /// Wake anyone in [`ActivityMonitor::wait_for_change`]
    pub fn notify(&self) {
        let _state = self.lock();
        self.changed.notify_all();
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        *self.lock()
    }

    /// Block until the counts change or `timeout` elapses; returns the
    /// current counts.
    pub fn wait_for_change(&self, timeout: Duration) -> ActivitySnapshot {
        let state = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout(state, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        *state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadlock_requires_every_thread_blocked() {
        let monitor = ActivityMonitor::new();
        monitor.reset(2);
        monitor.reader_blocked();
        assert!(!monitor.snapshot().is_deadlocked());

        monitor.writer_blocked();
        let snapshot = monitor.snapshot();
        assert!(snapshot.is_deadlocked());
        assert_eq!(snapshot.blocked(), 2);

        monitor.writers_unblocked(1);
        assert!(!monitor.snapshot().is_deadlocked());
    }

    #[test]
    fn test_finished_threads_leave_blocked_ones_deadlocked() {
        let monitor = ActivityMonitor::new();
        monitor.reset(2);
        monitor.reader_blocked();
        monitor.thread_finished();
        assert!(monitor.snapshot().is_deadlocked());

        monitor.readers_unblocked(1);
        monitor.thread_finished();
        assert!(monitor.snapshot().all_finished());
        assert!(!monitor.snapshot().is_deadlocked());
    }
}
