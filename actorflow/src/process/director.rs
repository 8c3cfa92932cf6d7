//! Real-time process director.
//!
//! Each actor runs on its own OS thread and blocks inside mailbox `get` and
//! `put`. The director resolves port types, starts the threads, supervises
//! the run and shuts everything down:
//!
//! ```text
//! Idle | Stopped --initialize--> Initializing --> Running
//! Running --request_stop / finish / stop time / deadlock--> StopRequested --> Stopped
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use actorflow_types::{TypeDescriptor, TypeVarId};
use log::{debug, error, info, warn};

use super::actor::{Actor, Firing, FiringContext, OutputBinding, PortDirection};
use super::error::{ActorError, ActorFailure, DirectorError, ModelError};
use super::model::{ActorId, Model, PortKey};
use super::monitor::{ActivityMonitor, ActivitySnapshot};
use super::receiver::{Mailbox, Receivable};
use super::time::{ActivationSchedule, RealTimeClock};
use crate::solver::Solution;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectorState {
    Idle,
    Initializing,
    Running,
    StopRequested,
    Stopped,
}

impl fmt::Display for DirectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirectorState::Idle => "idle",
            DirectorState::Initializing => "initializing",
            DirectorState::Running => "running",
            DirectorState::StopRequested => "stop requested",
            DirectorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every actor returned `Firing::Finish`
    AllFinished,
    StopRequested,
    /// Model time reached the configured stop time
    StopTime,
    /// Every live actor is blocked reading
    Deadlock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub reason: StopReason,
    /// Model time when the run ended
    pub model_time: f64,
    /// Completed firings across all actors
    pub firings: u64,
}

/// State shared between the director, actor threads and stop handles
#[derive(Debug)]
pub(crate) struct DirectorShared {
    state: Mutex<DirectorState>,
    pub(crate) stop: AtomicBool,
    pub(crate) schedule: ActivationSchedule,
    monitor: Arc<ActivityMonitor>,
    mailboxes: Mutex<Vec<Arc<Mailbox<Token>>>>,
    failures: Mutex<Vec<ActorFailure>>,
    firings: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DirectorShared {
    fn new(actors: usize) -> Self {
        Self {
            state: Mutex::new(DirectorState::Idle),
            stop: AtomicBool::new(false),
            schedule: ActivationSchedule::new(actors),
            monitor: Arc::new(ActivityMonitor::new()),
            mailboxes: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            firings: AtomicU64::new(0),
        }
    }

    fn state(&self) -> DirectorState {
        *lock(&self.state)
    }

    fn set_state(&self, state: DirectorState) {
        let mut current = lock(&self.state);
        if *current != state {
            info!("[Director] {} -> {}", *current, state);
            *current = state;
        }
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Idempotent; safe from any thread.
    fn request_stop(&self) {
        if self.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut state = lock(&self.state);
            if matches!(*state, DirectorState::Initializing | DirectorState::Running) {
                info!("[Director] {} -> {}", *state, DirectorState::StopRequested);
                *state = DirectorState::StopRequested;
            }
        }
        for mailbox in lock(&self.mailboxes).iter() {
            mailbox.request_termination();
        }
        self.schedule.notify_all();
        self.monitor.notify();
    }

    fn record_failure(&self, failure: ActorFailure) {
        error!("[Director] {}", failure);
        lock(&self.failures).push(failure);
        self.request_stop();
    }
}

/// Cloneable handle that stops a run from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<DirectorShared>,
}

impl StopHandle {
    /// Stop the run: no actor fires after observing the request, every
    /// blocked `get`/`put` returns `Terminated`.
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.is_stop_requested()
    }

    pub fn state(&self) -> DirectorState {
        self.shared.state()
    }
}

/// Runs a [`Model`] with one thread per actor.
#[derive(Debug)]
pub struct Director {
    model: Model,
    shared: Arc<DirectorShared>,
    threads: Vec<(ActorId, JoinHandle<Box<dyn Actor>>)>,
    solution: Option<Solution>,
    port_vars: HashMap<PortKey, TypeVarId>,
    clock: Option<RealTimeClock>,
}

impl Director {
    pub fn new(model: Model) -> Self {
        let shared = Arc::new(DirectorShared::new(model.len()));
        Self {
            model,
            shared,
            threads: Vec::new(),
            solution: None,
            port_vars: HashMap::new(),
            clock: None,
        }
    }

    pub fn state(&self) -> DirectorState {
        self.shared.state()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Take the model back; stops a run still in progress.
    pub fn into_model(mut self) -> Model {
        self.shutdown();
        let placeholder = Model::new(Arc::clone(self.model.session()));
        std::mem::replace(&mut self.model, placeholder)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn request_stop(&self) {
        self.shared.request_stop();
    }

    /// Type solution of the last initialize
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub fn resolved_port_type(&self, actor: ActorId, port: &str) -> Option<&TypeDescriptor> {
        let var = self.port_vars.get(&(actor, port.to_string()))?;
        self.solution.as_ref()?.resolved_type(*var)
    }

    /// Model time of the current or last run
    pub fn current_time(&self) -> f64 {
        self.clock.map_or(0.0, |clock| clock.now())
    }

    /// Request an activation of `actor` at model time `time`.
    pub fn fire_at(&self, actor: ActorId, time: f64) -> Result<(), DirectorError> {
        if !time.is_finite() {
            return Err(DirectorError::InvalidTime(time));
        }
        if !self.shared.schedule.push(actor.0, time) {
            return Err(ModelError::UnknownActor(actor).into());
        }
        Ok(())
    }

    /// Resolve port types, prepare mailboxes and start one thread per actor.
    pub fn initialize(&mut self) -> Result<(), DirectorError> {
        let previous = self.state();
        if !matches!(previous, DirectorState::Idle | DirectorState::Stopped) {
            return Err(DirectorError::InvalidState {
                operation: "initialize",
                state: previous,
            });
        }
        self.shared.set_state(DirectorState::Initializing);
        if let Err(err) = self.prepare() {
            error!("[Director] initialize failed: {}", err);
            self.shared.set_state(previous);
            return Err(err);
        }

        let clock = RealTimeClock::start(self.model.session().config().director.time_scale);
        self.clock = Some(clock);
        if let Err(err) = self.spawn_all(clock) {
            error!("[Director] initialize failed: {}", err);
            self.shared.request_stop();
            self.join_all();
            self.shared.set_state(DirectorState::Stopped);
            return Err(err);
        }
        self.shared.set_state(DirectorState::Running);
        Ok(())
    }

    /// Single-threaded part of initialize: types and mailboxes.
    fn prepare(&mut self) -> Result<(), DirectorError> {
        if let Some(missing) = self.model.actor_ids().find(|id| !self.model.is_present(*id)) {
            return Err(ModelError::UnknownActor(missing).into());
        }

        let (mut solver, port_vars) = self
            .model
            .type_solver()
            .map_err(ModelError::from)?;
        let solution = solver.solve();
        for diagnostic in &solution.diagnostics {
            debug!("[Director] {}", diagnostic);
        }
        self.solution = Some(solution.clone());
        self.port_vars = port_vars;
        solution.into_result()?;

        let mailboxes = self.model.ensure_mailboxes();
        for mailbox in &mailboxes {
            mailbox.reset()?;
            mailbox.attach_monitor(Some(Arc::clone(&self.shared.monitor)));
        }
        *lock(&self.shared.mailboxes) = mailboxes;

        self.shared.stop.store(false, Ordering::Release);
        lock(&self.shared.failures).clear();
        self.shared.firings.store(0, Ordering::Release);
        self.shared.schedule.resize(self.model.len());
        self.shared.monitor.reset(self.model.len());
        Ok(())
    }

    fn spawn_all(&mut self, clock: RealTimeClock) -> Result<(), DirectorError> {
        let config = &self.model.session().config().director;
        let prefix = config.thread_name_prefix.clone();
        let lattice = Arc::clone(self.model.session().lattice());

        let ids: Vec<ActorId> = self.model.actor_ids().collect();
        for id in ids {
            let ctx = FiringContext::new(
                id,
                self.model.actor_name(id).unwrap_or_default().to_string(),
                self.inputs_of(id),
                self.outputs_of(id),
                Arc::clone(&lattice),
                clock,
                Arc::clone(&self.shared),
            );
            let Some(actor) = self.model.take_actor(id) else {
                return Err(ModelError::UnknownActor(id).into());
            };
            let shared = Arc::clone(&self.shared);
            let name = ctx.name().to_string();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", prefix, name))
                .spawn(move || actor_thread(actor, ctx, shared))
                .map_err(|source| DirectorError::Spawn {
                    actor: name.clone(),
                    source,
                })?;
            debug!("[Director] started actor '{}'", name);
            self.threads.push((id, handle));
        }
        Ok(())
    }

    fn inputs_of(&self, id: ActorId) -> HashMap<String, Arc<dyn Receivable<Token>>> {
        let mut inputs = HashMap::new();
        for port in self.model.ports(id).unwrap_or_default() {
            if port.direction != PortDirection::Input {
                continue;
            }
            if let Some(mailbox) = self.model.mailbox(id, &port.name) {
                let receiver: Arc<dyn Receivable<Token>> = Arc::clone(mailbox) as _;
                inputs.insert(port.name.clone(), receiver);
            }
        }
        inputs
    }

    fn outputs_of(&self, id: ActorId) -> HashMap<String, OutputBinding> {
        let mut outputs = HashMap::new();
        for port in self.model.ports(id).unwrap_or_default() {
            if port.direction != PortDirection::Output {
                continue;
            }
            let receivers = self
                .model
                .connections()
                .iter()
                .filter(|c| c.from == id && c.output == port.name)
                .filter_map(|c| self.model.mailbox(c.to, &c.input))
                .map(|mailbox| Arc::clone(mailbox) as Arc<dyn Receivable<Token>>)
                .collect();
            let ty = self
                .resolved_port_type(id, &port.name)
                .cloned()
                .unwrap_or(TypeDescriptor::Top);
            outputs.insert(port.name.clone(), OutputBinding { ty, receivers });
        }
        outputs
    }

    /// Run to completion: initialize if needed, supervise, shut down.
    pub fn run(&mut self) -> Result<RunSummary, DirectorError> {
        match self.state() {
            DirectorState::Idle | DirectorState::Stopped => self.initialize()?,
            DirectorState::Running | DirectorState::StopRequested => {}
            state => {
                return Err(DirectorError::InvalidState {
                    operation: "run",
                    state,
                })
            }
        }

        let (reason, activity) = self.supervise();
        let model_time = self.current_time();
        self.shutdown();

        let failures = std::mem::take(&mut *lock(&self.shared.failures));
        if !failures.is_empty() {
            return Err(DirectorError::ActorFailed(failures));
        }
        if reason == StopReason::Deadlock && activity.blocked_writers > 0 {
            return Err(DirectorError::Deadlock {
                readers: activity.blocked_readers,
                writers: activity.blocked_writers,
            });
        }
        let summary = RunSummary {
            reason,
            model_time,
            firings: self.shared.firings.load(Ordering::Acquire),
        };
        info!(
            "[Director] run ended ({:?}) at model time {:.3} after {} firing(s)",
            summary.reason, summary.model_time, summary.firings
        );
        Ok(summary)
    }

    fn supervise(&self) -> (StopReason, ActivitySnapshot) {
        let config = &self.model.session().config().director;
        let poll = config.supervisor_poll();
        loop {
            let activity = self.shared.monitor.snapshot();
            if self.shared.is_stop_requested() {
                return (StopReason::StopRequested, activity);
            }
            if activity.all_finished() {
                return (StopReason::AllFinished, activity);
            }
            if config.detect_deadlock && activity.is_deadlocked() {
                warn!(
                    "[Director] deadlock: {} actor(s) blocked reading, {} blocked writing",
                    activity.blocked_readers, activity.blocked_writers
                );
                return (StopReason::Deadlock, activity);
            }
            let mut wait = poll;
            if let (Some(stop_time), Some(clock)) = (config.stop_time, self.clock) {
                if clock.now() >= stop_time {
                    return (StopReason::StopTime, activity);
                }
                wait = wait.min(clock.until(stop_time));
            }
            self.shared.monitor.wait_for_change(wait);
        }
    }

    /// Stop every actor and wait for its thread; ends in `Stopped`.
    fn shutdown(&mut self) {
        if self.threads.is_empty() && self.state() != DirectorState::Running {
            return;
        }
        self.shared.request_stop();
        self.join_all();
        self.shared.schedule.clear();
        self.shared.set_state(DirectorState::Stopped);
    }

    fn join_all(&mut self) {
        for (id, handle) in std::mem::take(&mut self.threads) {
            match handle.join() {
                Ok(actor) => self.model.return_actor(id, actor),
                // actor panics are caught inside the thread; this is the
                // director's own bookkeeping failing
                Err(payload) => lock(&self.shared.failures).push(ActorFailure {
                    actor: self.model.actor_name(id).unwrap_or_default().to_string(),
                    error: ActorError::Panicked(panic_message(payload.as_ref())),
                }),
            }
        }
    }
}

impl Drop for Director {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn actor_thread(
    mut actor: Box<dyn Actor>,
    mut ctx: FiringContext,
    shared: Arc<DirectorShared>,
) -> Box<dyn Actor> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        fire_loop(actor.as_mut(), &mut ctx, &shared)
    }))
    .unwrap_or_else(|payload| Err(ActorError::Panicked(panic_message(payload.as_ref()))));
    let wrapup = panic::catch_unwind(AssertUnwindSafe(|| actor.wrapup()))
        .unwrap_or_else(|payload| Err(ActorError::Panicked(panic_message(payload.as_ref()))));

    for error in [result, wrapup].into_iter().filter_map(Result::err) {
        if !error.is_terminated() {
            shared.record_failure(ActorFailure {
                actor: ctx.name().to_string(),
                error,
            });
        }
    }
    debug!("[Director] actor '{}' finished", ctx.name());
    shared.monitor.thread_finished();
    actor
}

fn fire_loop(
    actor: &mut dyn Actor,
    ctx: &mut FiringContext,
    shared: &DirectorShared,
) -> Result<(), ActorError> {
    actor.initialize(ctx)?;
    loop {
        if shared.is_stop_requested() {
            return Ok(());
        }
        ctx.await_activation()?;
        // a stop may land while the activation is handed out
        if shared.is_stop_requested() {
            return Ok(());
        }
        let firing = actor.fire(ctx)?;
        shared.firings.fetch_add(1, Ordering::AcqRel);
        if firing == Firing::Finish {
            return Ok(());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
