//! Actor capabilities and the context an actor fires in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use actorflow_types::{TypeDescriptor, TypeLattice, TypeVarId};

use super::director::DirectorShared;
use super::error::ActorError;
use super::model::ActorId;
use super::receiver::Receivable;
use super::time::RealTimeClock;
use crate::solver::Relation;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

/// A named port; `declared` pins its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    pub declared: Option<TypeDescriptor>,
}

impl Port {
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            declared: None,
        }
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            declared: None,
        }
    }

    pub fn with_type(mut self, ty: TypeDescriptor) -> Self {
        self.declared = Some(ty);
        self
    }
}

/// Result of one firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firing {
    Continue,
    /// The actor is done; its thread ends after wrapup
    Finish,
}

/// Execution capability. Runs on the actor's own thread.
pub trait Schedulable: Send {
    fn name(&self) -> &str;

    fn initialize(&mut self, _ctx: &mut FiringContext) -> Result<(), ActorError> {
        Ok(())
    }

    fn fire(&mut self, ctx: &mut FiringContext) -> Result<Firing, ActorError>;

    /// Always called once the actor stops firing, even after an error.
    fn wrapup(&mut self) -> Result<(), ActorError> {
        Ok(())
    }
}

/// Type variables of one actor's ports, by port name.
#[derive(Debug, Clone, Default)]
pub struct PortTypeVars {
    ports: Vec<(String, PortDirection, TypeVarId)>,
}

impl PortTypeVars {
    pub(crate) fn push(&mut self, name: String, direction: PortDirection, var: TypeVarId) {
        self.ports.push((name, direction, var));
    }

    pub fn get(&self, port: &str) -> Option<TypeVarId> {
        self.ports
            .iter()
            .find(|(name, _, _)| name == port)
            .map(|(_, _, var)| *var)
    }

    pub fn inputs(&self) -> impl Iterator<Item = TypeVarId> + '_ {
        self.with_direction(PortDirection::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = TypeVarId> + '_ {
        self.with_direction(PortDirection::Output)
    }

    fn with_direction(&self, direction: PortDirection) -> impl Iterator<Item = TypeVarId> + '_ {
        self.ports
            .iter()
            .filter(move |(_, d, _)| *d == direction)
            .map(|(_, _, var)| *var)
    }
}

/// One type constraint contributed by an actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRule {
    pub left: TypeDescriptor,
    pub relation: Relation,
    pub right: TypeDescriptor,
}

impl TypeRule {
    pub fn new(
        left: impl Into<TypeDescriptor>,
        relation: Relation,
        right: impl Into<TypeDescriptor>,
    ) -> Self {
        Self {
            left: left.into(),
            relation,
            right: right.into(),
        }
    }

    pub fn at_least(left: impl Into<TypeDescriptor>, right: impl Into<TypeDescriptor>) -> Self {
        Self::new(left, Relation::GreaterOrEqual, right)
    }

    pub fn at_most(left: impl Into<TypeDescriptor>, right: impl Into<TypeDescriptor>) -> Self {
        Self::new(left, Relation::LessOrEqual, right)
    }

    pub fn equal(left: impl Into<TypeDescriptor>, right: impl Into<TypeDescriptor>) -> Self {
        Self::new(left, Relation::Equal, right)
    }
}

/// Typing capability: declares ports and the constraints between their
/// types.
pub trait TypeConstrained {
    fn ports(&self) -> Vec<Port>;

    /// Every output is at least every input unless overridden.
    fn type_constraints(&self, ports: &PortTypeVars) -> Vec<TypeRule> {
        let mut rules = Vec::new();
        for output in ports.outputs() {
            for input in ports.inputs() {
                rules.push(TypeRule::at_least(output, input));
            }
        }
        rules
    }
}

/// Anything the director can run.
pub trait Actor: Schedulable + TypeConstrained {}

impl<T: Schedulable + TypeConstrained> Actor for T {}

/// Receivers behind one output port, with the port's resolved type.
pub(crate) struct OutputBinding {
    pub(crate) ty: TypeDescriptor,
    pub(crate) receivers: Vec<Arc<dyn Receivable<Token>>>,
}

impl fmt::Debug for OutputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBinding")
            .field("ty", &self.ty)
            .field("receivers", &self.receivers.len())
            .finish()
    }
}

/// What an actor sees while it runs: its ports, model time and
/// activation requests.
pub struct FiringContext {
    actor: ActorId,
    name: String,
    inputs: HashMap<String, Arc<dyn Receivable<Token>>>,
    outputs: HashMap<String, OutputBinding>,
    lattice: Arc<TypeLattice>,
    clock: RealTimeClock,
    shared: Arc<DirectorShared>,
}

impl fmt::Debug for FiringContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inputs: Vec<&String> = self.inputs.keys().collect();
        inputs.sort();
        f.debug_struct("FiringContext")
            .field("actor", &self.actor)
            .field("name", &self.name)
            .field("inputs", &inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl FiringContext {
    pub(crate) fn new(
        actor: ActorId,
        name: String,
        inputs: HashMap<String, Arc<dyn Receivable<Token>>>,
        outputs: HashMap<String, OutputBinding>,
        lattice: Arc<TypeLattice>,
        clock: RealTimeClock,
        shared: Arc<DirectorShared>,
    ) -> Self {
        Self {
            actor,
            name,
            inputs,
            outputs,
            lattice,
            clock,
            shared,
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn input(&self, port: &str) -> Result<&Arc<dyn Receivable<Token>>, ActorError> {
        self.inputs
            .get(port)
            .ok_or_else(|| ActorError::UnknownPort(port.to_string()))
    }

    /// Block until a token arrives on `port`.
    pub fn get(&mut self, port: &str) -> Result<Token, ActorError> {
        Ok(self.input(port)?.get()?)
    }

    pub fn try_get(&mut self, port: &str) -> Result<Option<Token>, ActorError> {
        Ok(self.input(port)?.try_get()?)
    }

    pub fn get_timeout(
        &mut self,
        port: &str,
        timeout: Duration,
    ) -> Result<Option<Token>, ActorError> {
        Ok(self.input(port)?.get_timeout(timeout)?)
    }

    /// False for unknown ports
    pub fn has_token(&self, port: &str) -> bool {
        self.inputs.get(port).is_some_and(|receiver| receiver.has_token())
    }

    /// Send `token` to every receiver connected to `port`, converted to the
    /// port's resolved type. Sending on an unconnected port is a no-op.
    pub fn send(&mut self, port: &str, token: impl Into<Token>) -> Result<(), ActorError> {
        let token = token.into();
        let binding = self
            .outputs
            .get(port)
            .ok_or_else(|| ActorError::UnknownPort(port.to_string()))?;
        let converted = token
            .convert_to(&binding.ty, &self.lattice)
            .ok_or_else(|| ActorError::TypeMismatch {
                port: port.to_string(),
                expected: binding.ty.clone(),
                found: token.descriptor(&self.lattice),
            })?;
        for receiver in &binding.receivers {
            receiver.put(converted.clone())?;
        }
        Ok(())
    }

    /// Ask to be fired again at model time `time`. The actor does not fire
    /// before its earliest pending request.
    pub fn fire_at(&mut self, time: f64) -> Result<(), ActorError> {
        if !time.is_finite() {
            return Err(ActorError::InvalidTime(time));
        }
        self.shared.schedule.push(self.actor.0, time);
        Ok(())
    }

    /// Current model time
    pub fn current_time(&self) -> f64 {
        self.clock.now()
    }

    pub fn stop_requested(&self) -> bool {
        self.shared.is_stop_requested()
    }

    /// Wait for the next activation; fails once a stop was requested.
    pub(crate) fn await_activation(&self) -> Result<(), ActorError> {
        Ok(self
            .shared
            .schedule
            .wait_until_due(self.actor.0, &self.clock, &self.shared.stop)?)
    }
}
