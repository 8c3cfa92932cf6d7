//! Model time and per-actor activation requests.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::error::Terminated;

/// Wall-clock driven model time: seconds since start times `time_scale`.
#[derive(Debug, Clone, Copy)]
pub struct RealTimeClock {
    start: Instant,
    time_scale: f64,
}

impl RealTimeClock {
    pub fn start(time_scale: f64) -> Self {
        Self {
            start: Instant::now(),
            time_scale,
        }
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Current model time; never decreases
    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * self.time_scale
    }

    /// Wall-clock time left until model time `time`; zero if already past.
    pub fn until(&self, time: f64) -> Duration {
        let seconds = (time - self.now()) / self.time_scale;
        if seconds.is_nan() || seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// Requested model time; ordered with `total_cmp`
#[derive(Debug, Clone, Copy)]
struct Activation(f64);

impl PartialEq for Activation {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Activation {}

impl PartialOrd for Activation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Activation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Pending activations of every actor. An actor with pending activations
/// does not fire before the earliest one.
#[derive(Debug, Default)]
pub struct ActivationSchedule {
    queues: Mutex<Vec<BinaryHeap<Reverse<Activation>>>>,
    changed: Condvar,
}

impl ActivationSchedule {
    pub fn new(actors: usize) -> Self {
        let schedule = Self::default();
        schedule.resize(actors);
        schedule
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BinaryHeap<Reverse<Activation>>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make room for `actors` queues, keeping existing requests.
    pub fn resize(&self, actors: usize) {
        self.lock().resize_with(actors, BinaryHeap::new);
    }

    pub fn clear(&self) {
        for queue in self.lock().iter_mut() {
            queue.clear();
        }
        self.changed.notify_all();
    }

    /// Request an activation of `actor` at model time `time`.
    /// Returns false for an unknown actor.
    pub fn push(&self, actor: usize, time: f64) -> bool {
        let mut queues = self.lock();
        match queues.get_mut(actor) {
            Some(queue) => {
                queue.push(Reverse(Activation(time)));
                self.changed.notify_all();
                true
            }
            None => false,
        }
    }

    /// Earliest pending activation of `actor`
    pub fn next(&self, actor: usize) -> Option<f64> {
        self.lock()
            .get(actor)
            .and_then(|queue| queue.peek())
            .map(|Reverse(activation)| activation.0)
    }

    pub fn pending(&self, actor: usize) -> usize {
        self.lock().get(actor).map_or(0, BinaryHeap::len)
    }

    /// Wake every waiting actor so it re-checks the stop flag.
    pub fn notify_all(&self) {
        let _queues = self.lock();
        self.changed.notify_all();
    }

    /// Block until `actor` may fire: immediately when nothing is pending,
    /// otherwise when the earliest activation is due (which is consumed).
    pub fn wait_until_due(
        &self,
        actor: usize,
        clock: &RealTimeClock,
        stop: &AtomicBool,
    ) -> Result<(), Terminated> {
        let mut queues = self.lock();
        loop {
            if stop.load(AtomicOrdering::Acquire) {
                return Err(Terminated);
            }
            let next = match queues.get(actor).and_then(|queue| queue.peek()) {
                Some(Reverse(activation)) => activation.0,
                None => return Ok(()),
            };
            let wait = clock.until(next);
            if wait.is_zero() {
                if let Some(queue) = queues.get_mut(actor) {
                    queue.pop();
                }
                return Ok(());
            }
            let (guard, _) = self
                .changed
                .wait_timeout(queues, wait)
                .unwrap_or_else(PoisonError::into_inner);
            queues = guard;
        }
    }
}
