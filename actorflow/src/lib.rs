//! actorflow
//!
//! Kernel of an actor-oriented dataflow framework: a constraint solver that
//! infers port types over the [`actorflow_types`] lattice, and a real-time
//! process director that runs every actor on its own thread, connected by
//! blocking mailboxes.
//!
//! # Example
//!
//! ```
//! use actorflow::solver::{ConstraintSolver, Relation};
//! use actorflow_types::TypeDescriptor;
//!
//! let mut solver = ConstraintSolver::standard();
//! let a = solver.new_variable("portA");
//! let b = solver.new_variable("portB");
//! solver.add_constraint(a, Relation::Equal, TypeDescriptor::INT).unwrap();
//! solver.add_constraint(a, Relation::LessOrEqual, b).unwrap();
//! solver.add_constraint(b, Relation::LessOrEqual, TypeDescriptor::DOUBLE).unwrap();
//!
//! let solution = solver.solve();
//! assert_eq!(solution.resolved_type(b), Some(&TypeDescriptor::DOUBLE));
//! ```

// Library code logs through `log`; it never prints.
#![deny(clippy::print_stderr)]

pub mod config;
pub mod process;
pub mod session;
pub mod solver;
pub mod token;

// Re-exports
pub use config::{ConfigError, DirectorConfig, KernelConfig, ResolutionPolicy, SolverConfig};
pub use process::{
    Actor, ActorError, ActorId, CapacityPolicy, Director, DirectorError, DirectorState, Firing,
    FiringContext, Mailbox, Model, Port, Receivable, RunSummary, Schedulable, StopHandle,
    StopReason, Terminated, TypeConstrained, TypeRule,
};
pub use session::Session;
pub use solver::{ConstraintSolver, Relation, Solution, TypeConflictError};
pub use token::{RecordToken, Token, TokenError};
