//! Shared actors for integration tests
// Each test target uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actorflow::process::{ActorError, Firing, FiringContext, Port, Schedulable, TypeConstrained};
use actorflow::Token;
use actorflow_types::TypeDescriptor;

/// Sends its values in order on `out`, then finishes.
pub struct Source {
    pub name: String,
    pub values: Vec<Token>,
    pub declared: Option<TypeDescriptor>,
    next: usize,
}

impl Source {
    pub fn new(name: &str, values: Vec<Token>) -> Self {
        Self {
            name: name.to_string(),
            values,
            declared: None,
            next: 0,
        }
    }

    pub fn typed(mut self, ty: TypeDescriptor) -> Self {
        self.declared = Some(ty);
        self
    }
}

impl Schedulable for Source {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut FiringContext) -> Result<(), ActorError> {
        self.next = 0;
        Ok(())
    }

    fn fire(&mut self, ctx: &mut FiringContext) -> Result<Firing, ActorError> {
        match self.values.get(self.next) {
            Some(token) => {
                ctx.send("out", token.clone())?;
                self.next += 1;
                Ok(Firing::Continue)
            }
            None => Ok(Firing::Finish),
        }
    }
}

impl TypeConstrained for Source {
    fn ports(&self) -> Vec<Port> {
        let port = Port::output("out");
        vec![match &self.declared {
            Some(ty) => port.with_type(ty.clone()),
            None => port,
        }]
    }
}

/// Collects tokens from `in`; finishes after `limit` tokens if set.
pub struct Sink {
    pub name: String,
    pub received: Arc<Mutex<Vec<Token>>>,
    pub limit: Option<usize>,
    pub declared: Option<TypeDescriptor>,
}

impl Sink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            received: Arc::new(Mutex::new(Vec::new())),
            limit: None,
            declared: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn typed(mut self, ty: TypeDescriptor) -> Self {
        self.declared = Some(ty);
        self
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<Token>>> {
        Arc::clone(&self.received)
    }
}

impl Schedulable for Sink {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&mut self, ctx: &mut FiringContext) -> Result<Firing, ActorError> {
        let token = ctx.get("in")?;
        let mut received = self.received.lock().unwrap();
        received.push(token);
        if self.limit.is_some_and(|limit| received.len() >= limit) {
            return Ok(Firing::Finish);
        }
        Ok(Firing::Continue)
    }
}

impl TypeConstrained for Sink {
    fn ports(&self) -> Vec<Port> {
        let port = Port::input("in");
        vec![match &self.declared {
            Some(ty) => port.with_type(ty.clone()),
            None => port,
        }]
    }
}

/// Copies `in` to `out` forever.
pub struct Forwarder {
    pub name: String,
}

impl Schedulable for Forwarder {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&mut self, ctx: &mut FiringContext) -> Result<Firing, ActorError> {
        let token = ctx.get("in")?;
        ctx.send("out", token)?;
        Ok(Firing::Continue)
    }
}

impl TypeConstrained for Forwarder {
    fn ports(&self) -> Vec<Port> {
        vec![Port::input("in"), Port::output("out")]
    }
}

/// Counters observed from the test thread
#[derive(Debug, Default, Clone)]
pub struct Probe {
    pub firings: Arc<AtomicUsize>,
    pub wrapped_up: Arc<AtomicBool>,
}

impl Probe {
    pub fn firings(&self) -> usize {
        self.firings.load(Ordering::SeqCst)
    }

    pub fn wrapped_up(&self) -> bool {
        self.wrapped_up.load(Ordering::SeqCst)
    }
}

/// Fires forever, sleeping a little each time.
pub struct Ticker {
    pub name: String,
    pub probe: Probe,
}

impl Ticker {
    pub fn new(name: &str) -> (Self, Probe) {
        let probe = Probe::default();
        (
            Self {
                name: name.to_string(),
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl Schedulable for Ticker {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&mut self, _ctx: &mut FiringContext) -> Result<Firing, ActorError> {
        self.probe.firings.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(1));
        Ok(Firing::Continue)
    }

    fn wrapup(&mut self) -> Result<(), ActorError> {
        self.probe.wrapped_up.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl TypeConstrained for Ticker {
    fn ports(&self) -> Vec<Port> {
        Vec::new()
    }
}

/// How a [`Faulty`] actor misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `fire` returns an error
    Error,
    Panic,
    /// `fire` and `wrapup` both return errors
    ErrorAndWrapup,
}

/// Fails on its `after`-th firing.
pub struct Faulty {
    pub name: String,
    pub after: usize,
    pub fault: Fault,
    fired: usize,
}

impl Faulty {
    pub fn new(name: &str, after: usize, fault: Fault) -> Self {
        Self {
            name: name.to_string(),
            after,
            fault,
            fired: 0,
        }
    }
}

impl Schedulable for Faulty {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&mut self, _ctx: &mut FiringContext) -> Result<Firing, ActorError> {
        self.fired += 1;
        if self.fired < self.after {
            std::thread::sleep(Duration::from_millis(1));
            return Ok(Firing::Continue);
        }
        match self.fault {
            Fault::Panic => panic!("kaboom"),
            Fault::Error | Fault::ErrorAndWrapup => Err(ActorError::failed("boom")),
        }
    }

    fn wrapup(&mut self) -> Result<(), ActorError> {
        match self.fault {
            Fault::ErrorAndWrapup => Err(ActorError::failed("wrapup failed")),
            _ => Ok(()),
        }
    }
}

impl TypeConstrained for Faulty {
    fn ports(&self) -> Vec<Port> {
        Vec::new()
    }
}

/// Records the model time of each firing and asks to be fired again
/// `period` later; finishes after `count` firings.
pub struct Paced {
    pub name: String,
    pub period: f64,
    pub count: usize,
    pub times: Arc<Mutex<Vec<f64>>>,
}

impl Paced {
    pub fn new(name: &str, period: f64, count: usize) -> (Self, Arc<Mutex<Vec<f64>>>) {
        let times = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                name: name.to_string(),
                period,
                count,
                times: Arc::clone(&times),
            },
            times,
        )
    }
}

impl Schedulable for Paced {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&mut self, ctx: &mut FiringContext) -> Result<Firing, ActorError> {
        let now = ctx.current_time();
        let mut times = self.times.lock().unwrap();
        times.push(now);
        if times.len() >= self.count {
            return Ok(Firing::Finish);
        }
        ctx.fire_at(now + self.period)?;
        Ok(Firing::Continue)
    }
}

impl TypeConstrained for Paced {
    fn ports(&self) -> Vec<Port> {
        Vec::new()
    }
}

/// Has an input it never reads; finishes on its first firing.
pub struct Idler {
    pub name: String,
}

impl Schedulable for Idler {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&mut self, _ctx: &mut FiringContext) -> Result<Firing, ActorError> {
        Ok(Firing::Finish)
    }
}

impl TypeConstrained for Idler {
    fn ports(&self) -> Vec<Port> {
        vec![Port::input("in")]
    }
}

/// Sends the same value forever.
pub struct Repeater {
    pub name: String,
    pub value: Token,
}

impl Schedulable for Repeater {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&mut self, ctx: &mut FiringContext) -> Result<Firing, ActorError> {
        ctx.send("out", self.value.clone())?;
        Ok(Firing::Continue)
    }
}

impl TypeConstrained for Repeater {
    fn ports(&self) -> Vec<Port> {
        vec![Port::output("out")]
    }
}
