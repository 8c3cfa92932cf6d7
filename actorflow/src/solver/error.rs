//! Solver errors

use std::fmt;

use actorflow_types::{TypeDescriptor, TypeVarId};
use serde::Serialize;
use thiserror::Error;

use super::constraint::ConstraintId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// A constraint names a variable this solver never created
    #[error("unknown type variable {0}")]
    UnknownVariable(TypeVarId),

    /// The snapshot describes more variables or constraints than exist now
    #[error(
        "snapshot of {snapshot_variables} variable(s) and {snapshot_constraints} constraint(s) \
         does not fit a solver with {variables} and {constraints}"
    )]
    StaleSnapshot {
        snapshot_variables: usize,
        snapshot_constraints: usize,
        variables: usize,
        constraints: usize,
    },
}

/// One variable whose lower bound is not below its upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableConflict {
    pub variable: TypeVarId,
    pub name: String,
    pub lower: TypeDescriptor,
    pub upper: TypeDescriptor,
    /// Every constraint mentioning the variable, in registration order
    pub constraints: Vec<ConstraintId>,
    /// Same constraints, rendered with variable names
    pub rendered: Vec<String>,
}

impl fmt::Display for VariableConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: lower bound {} is not below upper bound {}",
            self.name, self.lower, self.upper
        )?;
        if !self.rendered.is_empty() {
            write!(f, " (constraints: {})", self.rendered.join(", "))?;
        }
        Ok(())
    }
}

/// Type resolution failed for at least one variable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("type conflict in {} variable(s): {}", .conflicts.len(), format_conflicts(.conflicts))]
pub struct TypeConflictError {
    pub conflicts: Vec<VariableConflict>,
}

fn format_conflicts(conflicts: &[VariableConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
