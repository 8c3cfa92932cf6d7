//! Blocking mailboxes between actor threads.
//!
//! A [`Mailbox`] is a token slot or queue guarded by one mutex and two
//! condition variables (`not_empty` for readers, `not_full` for writers).
//! Every wait loop re-checks the termination flag after waking, so
//! `request_termination` releases all blocked threads promptly.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::error::{ReceiverError, Terminated};
use super::monitor::ActivityMonitor;

/// Capacity and overflow behavior of a mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Single slot; a put replaces any unread token and never blocks
    #[default]
    Overwrite,
    /// FIFO queue; put never blocks
    Unbounded,
    /// FIFO queue of at most `n` tokens; put blocks while full
    Bounded(usize),
    /// Put blocks until its token has been taken
    Rendezvous,
}

/// Capability of a token channel that actor threads block on.
pub trait Receivable<T>: Send + Sync {
    fn put(&self, token: T) -> Result<(), Terminated>;

    /// Block until a token is available
    fn get(&self) -> Result<T, Terminated>;

    fn try_get(&self) -> Result<Option<T>, Terminated>;

    /// Like `get`, giving up after `timeout` with `Ok(None)`
    fn get_timeout(&self, timeout: Duration) -> Result<Option<T>, Terminated>;

    fn has_token(&self) -> bool;

    /// Fail all current and future `get`/`put` calls. Idempotent.
    fn request_termination(&self);

    fn is_terminated(&self) -> bool;

    /// Drop queued tokens and clear termination. Fails while any thread is
    /// waiting on the receiver.
    fn reset(&self) -> Result<(), ReceiverError>;

    fn set_capacity(&self, policy: CapacityPolicy) -> Result<(), ReceiverError>;
}

#[derive(Debug)]
struct MailboxState<T> {
    queue: VecDeque<T>,
    policy: CapacityPolicy,
    terminated: bool,
    /// Threads inside any wait, timed or not
    waiters: usize,
    /// Untimed waiters reported to the monitor and not yet released
    blocked_readers: usize,
    blocked_writers: usize,
    /// Bumped whenever blocked readers/writers are released by another thread
    read_epoch: u64,
    write_epoch: u64,
    pushed: u64,
    taken: u64,
    monitor: Option<Arc<ActivityMonitor>>,
}

impl<T> MailboxState<T> {
    fn new(policy: CapacityPolicy) -> Self {
        Self {
            queue: VecDeque::new(),
            policy,
            terminated: false,
            waiters: 0,
            blocked_readers: 0,
            blocked_writers: 0,
            read_epoch: 0,
            write_epoch: 0,
            pushed: 0,
            taken: 0,
            monitor: None,
        }
    }

    fn has_room(&self) -> bool {
        match self.policy {
            CapacityPolicy::Overwrite | CapacityPolicy::Unbounded => true,
            CapacityPolicy::Bounded(n) => self.queue.len() < n,
            CapacityPolicy::Rendezvous => self.queue.is_empty(),
        }
    }

    fn release_readers(&mut self) {
        if self.blocked_readers > 0 {
            if let Some(monitor) = &self.monitor {
                monitor.readers_unblocked(self.blocked_readers);
            }
            self.blocked_readers = 0;
        }
        self.read_epoch += 1;
    }

    fn release_writers(&mut self) {
        if self.blocked_writers > 0 {
            if let Some(monitor) = &self.monitor {
                monitor.writers_unblocked(self.blocked_writers);
            }
            self.blocked_writers = 0;
        }
        self.write_epoch += 1;
    }

    fn take(&mut self) -> Option<T> {
        let token = self.queue.pop_front()?;
        self.taken += 1;
        self.release_writers();
        Some(token)
    }
}

/// Lock-and-condvar mailbox.
#[derive(Debug)]
pub struct Mailbox<T> {
    state: Mutex<MailboxState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new(CapacityPolicy::default())
    }
}

impl<T> Mailbox<T> {
    /// `Bounded(0)` has no room for a token and is read as `Rendezvous`.
    pub fn new(policy: CapacityPolicy) -> Self {
        let policy = match policy {
            CapacityPolicy::Bounded(0) => CapacityPolicy::Rendezvous,
            other => other,
        };
        Self {
            state: Mutex::new(MailboxState::new(policy)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.lock().policy
    }

    /// Number of queued tokens
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Report blocked threads to `monitor` (or stop reporting).
    pub fn attach_monitor(&self, monitor: Option<Arc<ActivityMonitor>>) {
        self.lock().monitor = monitor;
    }

    fn wait_as_reader<'a>(
        &self,
        mut state: MutexGuard<'a, MailboxState<T>>,
    ) -> MutexGuard<'a, MailboxState<T>> {
        state.waiters += 1;
        state.blocked_readers += 1;
        if let Some(monitor) = &state.monitor {
            monitor.reader_blocked();
        }
        let epoch = state.read_epoch;
        let mut state = self
            .not_empty
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
        state.waiters -= 1;
        if state.read_epoch == epoch {
            // nobody released us: spurious wakeup
            state.blocked_readers -= 1;
            if let Some(monitor) = &state.monitor {
                monitor.readers_unblocked(1);
            }
        }
        state
    }

    fn wait_as_writer<'a>(
        &self,
        mut state: MutexGuard<'a, MailboxState<T>>,
    ) -> MutexGuard<'a, MailboxState<T>> {
        state.waiters += 1;
        state.blocked_writers += 1;
        if let Some(monitor) = &state.monitor {
            monitor.writer_blocked();
        }
        let epoch = state.write_epoch;
        let mut state = self
            .not_full
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
        state.waiters -= 1;
        if state.write_epoch == epoch {
            state.blocked_writers -= 1;
            if let Some(monitor) = &state.monitor {
                monitor.writers_unblocked(1);
            }
        }
        state
    }
}

impl<T: Send> Receivable<T> for Mailbox<T> {
    fn put(&self, token: T) -> Result<(), Terminated> {
        let mut state = self.lock();
        loop {
            if state.terminated {
                return Err(Terminated);
            }
            if state.has_room() {
                break;
            }
            state = self.wait_as_writer(state);
        }

        if state.policy == CapacityPolicy::Overwrite {
            state.queue.clear();
        }
        state.queue.push_back(token);
        state.pushed += 1;
        let ticket = state.pushed;
        state.release_readers();
        self.not_empty.notify_all();

        if state.policy == CapacityPolicy::Rendezvous {
            while state.taken < ticket {
                if state.terminated {
                    return Err(Terminated);
                }
                state = self.wait_as_writer(state);
            }
        }
        Ok(())
    }

    fn get(&self) -> Result<T, Terminated> {
        let mut state = self.lock();
        loop {
            if state.terminated {
                return Err(Terminated);
            }
            if let Some(token) = state.take() {
                self.not_full.notify_all();
                return Ok(token);
            }
            state = self.wait_as_reader(state);
        }
    }

    fn try_get(&self) -> Result<Option<T>, Terminated> {
        let mut state = self.lock();
        if state.terminated {
            return Err(Terminated);
        }
        let token = state.take();
        if token.is_some() {
            self.not_full.notify_all();
        }
        Ok(token)
    }

    fn get_timeout(&self, timeout: Duration) -> Result<Option<T>, Terminated> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.terminated {
                return Err(Terminated);
            }
            if let Some(token) = state.take() {
                self.not_full.notify_all();
                return Ok(Some(token));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            // timed waits are never reported as blocked
            state.waiters += 1;
            let (next, _) = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
            state.waiters -= 1;
        }
    }

    fn has_token(&self) -> bool {
        !self.lock().queue.is_empty()
    }

    fn request_termination(&self) {
        let mut state = self.lock();
        state.terminated = true;
        state.release_readers();
        state.release_writers();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    fn reset(&self) -> Result<(), ReceiverError> {
        let mut state = self.lock();
        if state.waiters > 0 {
            return Err(ReceiverError::Busy(state.waiters));
        }
        state.queue.clear();
        state.terminated = false;
        state.pushed = 0;
        state.taken = 0;
        Ok(())
    }

    fn set_capacity(&self, policy: CapacityPolicy) -> Result<(), ReceiverError> {
        if policy == CapacityPolicy::Bounded(0) {
            return Err(ReceiverError::ZeroCapacity);
        }
        let mut state = self.lock();
        if state.waiters > 0 {
            return Err(ReceiverError::Busy(state.waiters));
        }
        if policy == CapacityPolicy::Overwrite {
            while state.queue.len() > 1 {
                state.queue.pop_front();
            }
        }
        state.policy = policy;
        Ok(())
    }
}
