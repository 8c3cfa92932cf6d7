//! Model construction: actors, ports and the mailboxes between them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use actorflow_types::TypeVarId;

use super::actor::{Actor, Port, PortDirection, PortTypeVars};
use super::error::ModelError;
use super::receiver::{CapacityPolicy, Mailbox};
use crate::session::Session;
use crate::solver::{ConstraintSolver, Relation, SolverError};
use crate::token::Token;

/// Index of an actor in its model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub usize);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Port address within a model
pub(crate) type PortKey = (ActorId, String);

struct ActorSlot {
    name: String,
    ports: Vec<Port>,
    /// Moved to the actor's thread while a run is in progress
    actor: Option<Box<dyn Actor>>,
}

impl fmt::Debug for ActorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSlot")
            .field("name", &self.name)
            .field("ports", &self.ports)
            .field("present", &self.actor.is_some())
            .finish()
    }
}

/// A directed link from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub from: ActorId,
    pub output: String,
    pub to: ActorId,
    pub input: String,
}

/// Actors and their connections. Every input port owns one mailbox; several
/// producers may share it and an output may feed several mailboxes.
#[derive(Debug)]
pub struct Model {
    session: Arc<Session>,
    actors: Vec<ActorSlot>,
    connections: Vec<Connection>,
    mailboxes: HashMap<PortKey, Arc<Mailbox<Token>>>,
}

impl Model {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            actors: Vec::new(),
            connections: Vec::new(),
            mailboxes: HashMap::new(),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn add_actor(&mut self, actor: impl Actor + 'static) -> ActorId {
        let id = ActorId(self.actors.len());
        self.actors.push(ActorSlot {
            name: actor.name().to_string(),
            ports: actor.ports(),
            actor: Some(Box::new(actor)),
        });
        self.session.bump_version();
        id
    }

    /// Connect with the session's default capacity policy.
    pub fn connect(
        &mut self,
        from: ActorId,
        output: &str,
        to: ActorId,
        input: &str,
    ) -> Result<(), ModelError> {
        let policy = self.session.config().director.default_capacity;
        self.connect_with_policy(from, output, to, input, policy)
    }

    /// Connect `from.output` to `to.input`. The first connection to an input
    /// fixes its mailbox policy; later ones must agree.
    pub fn connect_with_policy(
        &mut self,
        from: ActorId,
        output: &str,
        to: ActorId,
        input: &str,
        policy: CapacityPolicy,
    ) -> Result<(), ModelError> {
        if policy == CapacityPolicy::Bounded(0) {
            return Err(ModelError::ZeroCapacity);
        }
        self.port(from, output, PortDirection::Output)?;
        self.port(to, input, PortDirection::Input)?;

        let key = (to, input.to_string());
        match self.mailboxes.get(&key) {
            Some(existing) if existing.policy() != policy => {
                return Err(ModelError::PolicyMismatch {
                    actor: self.actors[to.0].name.clone(),
                    port: input.to_string(),
                    existing: existing.policy(),
                });
            }
            Some(_) => {}
            None => {
                self.mailboxes.insert(key, Arc::new(Mailbox::new(policy)));
            }
        }
        self.connections.push(Connection {
            from,
            output: output.to_string(),
            to,
            input: input.to_string(),
        });
        self.session.bump_version();
        Ok(())
    }

    fn port(
        &self,
        actor: ActorId,
        name: &str,
        direction: PortDirection,
    ) -> Result<&Port, ModelError> {
        let slot = self
            .actors
            .get(actor.0)
            .ok_or(ModelError::UnknownActor(actor))?;
        slot.ports
            .iter()
            .find(|port| port.name == name && port.direction == direction)
            .ok_or_else(|| ModelError::UnknownPort {
                actor: slot.name.clone(),
                port: name.to_string(),
                direction: match direction {
                    PortDirection::Input => "input",
                    PortDirection::Output => "output",
                },
            })
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> {
        (0..self.actors.len()).map(ActorId)
    }

    pub fn actor_name(&self, id: ActorId) -> Option<&str> {
        self.actors.get(id.0).map(|slot| slot.name.as_str())
    }

    pub fn ports(&self, id: ActorId) -> Option<&[Port]> {
        self.actors.get(id.0).map(|slot| slot.ports.as_slice())
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Mailbox behind an input port, if it is connected
    pub fn mailbox(&self, actor: ActorId, input: &str) -> Option<&Arc<Mailbox<Token>>> {
        self.mailboxes.get(&(actor, input.to_string()))
    }

    /// Give every unconnected input its own mailbox, so every input can be
    /// read. Returns all mailboxes.
    pub(crate) fn ensure_mailboxes(&mut self) -> Vec<Arc<Mailbox<Token>>> {
        let default = self.session.config().director.default_capacity;
        for (index, slot) in self.actors.iter().enumerate() {
            for port in slot.ports.iter().filter(|p| p.direction == PortDirection::Input) {
                self.mailboxes
                    .entry((ActorId(index), port.name.clone()))
                    .or_insert_with(|| Arc::new(Mailbox::new(default)));
            }
        }
        let mut keys: Vec<&PortKey> = self.mailboxes.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| self.mailboxes.get(key).cloned())
            .collect()
    }

    /// Solver with one variable per port, named `actor.port`, plus declared
    /// types, actor rules and `output <= input` for every connection.
    pub(crate) fn type_solver(
        &self,
    ) -> Result<(ConstraintSolver, HashMap<PortKey, TypeVarId>), SolverError> {
        let mut solver = self.session.solver();
        let mut vars = HashMap::new();

        for (index, slot) in self.actors.iter().enumerate() {
            let id = ActorId(index);
            let mut port_vars = PortTypeVars::default();
            for port in &slot.ports {
                let var = solver.new_variable(format!("{}.{}", slot.name, port.name));
                if let Some(declared) = &port.declared {
                    solver.add_constraint(var, Relation::Equal, declared.clone())?;
                }
                port_vars.push(port.name.clone(), port.direction, var);
                vars.insert((id, port.name.clone()), var);
            }
            if let Some(actor) = &slot.actor {
                for rule in actor.type_constraints(&port_vars) {
                    solver.add_constraint(rule.left, rule.relation, rule.right)?;
                }
            }
        }

        for connection in &self.connections {
            let from = vars.get(&(connection.from, connection.output.clone()));
            let to = vars.get(&(connection.to, connection.input.clone()));
            if let (Some(&from), Some(&to)) = (from, to) {
                solver.add_constraint(from, Relation::LessOrEqual, to)?;
            }
        }
        Ok((solver, vars))
    }

    pub(crate) fn take_actor(&mut self, id: ActorId) -> Option<Box<dyn Actor>> {
        self.actors.get_mut(id.0).and_then(|slot| slot.actor.take())
    }

    pub(crate) fn return_actor(&mut self, id: ActorId, actor: Box<dyn Actor>) {
        if let Some(slot) = self.actors.get_mut(id.0) {
            slot.actor = Some(actor);
        }
    }

    pub(crate) fn is_present(&self, id: ActorId) -> bool {
        self.actors.get(id.0).is_some_and(|slot| slot.actor.is_some())
    }
}
