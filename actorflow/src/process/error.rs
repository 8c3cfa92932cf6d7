//! Error types for receivers, actors and the director

use std::fmt;

use actorflow_types::TypeDescriptor;
use thiserror::Error;

use super::director::DirectorState;
use super::model::ActorId;
use crate::solver::{SolverError, TypeConflictError};

/// Control signal: the receiver was terminated by the scheduler.
///
/// Ends an actor's loop cleanly; never reported as a failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("receiver terminated")]
pub struct Terminated;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiverError {
    /// Threads are still waiting on the receiver
    #[error("receiver is busy: {0} thread(s) blocked on it")]
    Busy(usize),

    #[error("bounded capacity must be at least 1")]
    ZeroCapacity,
}

/// Failure raised by actor code or by its firing context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActorError {
    #[error("{0}")]
    Failed(String),

    #[error("port '{port}' expects {expected}, cannot convert {found}")]
    TypeMismatch {
        port: String,
        expected: TypeDescriptor,
        found: TypeDescriptor,
    },

    #[error("no port named '{0}'")]
    UnknownPort(String),

    #[error("invalid activation time {0}")]
    InvalidTime(f64),

    #[error("actor panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Terminated(#[from] Terminated),
}

impl ActorError {
    pub fn failed(message: impl Into<String>) -> Self {
        ActorError::Failed(message.into())
    }

    /// Termination is a shutdown signal, not a failure
    pub fn is_terminated(&self) -> bool {
        matches!(self, ActorError::Terminated(_))
    }
}

/// One actor's failure within a run
#[derive(Debug, Clone, PartialEq)]
pub struct ActorFailure {
    pub actor: String,
    pub error: ActorError,
}

impl fmt::Display for ActorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor '{}' failed: {}", self.actor, self.error)
    }
}

/// Invalid model construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("no actor with id {0}")]
    UnknownActor(ActorId),

    #[error("actor '{actor}' has no {direction} port '{port}'")]
    UnknownPort {
        actor: String,
        port: String,
        direction: &'static str,
    },

    #[error("input '{actor}.{port}' already uses capacity {existing:?}")]
    PolicyMismatch {
        actor: String,
        port: String,
        existing: super::receiver::CapacityPolicy,
    },

    #[error("bounded capacity must be at least 1")]
    ZeroCapacity,

    #[error(transparent)]
    Solver(#[from] SolverError),
}

#[derive(Error, Debug)]
pub enum DirectorError {
    #[error(transparent)]
    TypeConflict(#[from] TypeConflictError),

    #[error("{}", format_failures(.0))]
    ActorFailed(Vec<ActorFailure>),

    #[error("cannot {operation} while director is {state}")]
    InvalidState {
        operation: &'static str,
        state: DirectorState,
    },

    #[error("deadlock: {readers} actor(s) blocked reading, {writers} blocked writing")]
    Deadlock { readers: usize, writers: usize },

    #[error("failed to spawn thread for actor '{actor}': {source}")]
    Spawn {
        actor: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Receiver(#[from] ReceiverError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid activation time {0}")]
    InvalidTime(f64),
}

fn format_failures(failures: &[ActorFailure]) -> String {
    let lines: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!("{} actor(s) failed: {}", failures.len(), lines.join("; "))
}
