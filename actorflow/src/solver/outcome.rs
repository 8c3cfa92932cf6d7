//! Results of one solve.

use actorflow_types::{CacheStats, TypeDescriptor, TypeVarId};
use serde::Serialize;

use super::constraint::ConstraintId;
use super::diagnostics::SolverDiagnostic;
use super::error::{TypeConflictError, VariableConflict};

/// Final bounds and resolved type of one variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariableReport {
    pub id: TypeVarId,
    pub name: String,
    /// Bounds at the propagation fixed point
    pub lower: TypeDescriptor,
    pub upper: TypeDescriptor,
    /// `None` for variables in conflict
    pub resolved: Option<TypeDescriptor>,
}

/// A constraint that does not hold once the resolved types are substituted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnsatisfiedConstraint {
    pub constraint: ConstraintId,
    pub rendered: String,
    pub left: TypeDescriptor,
    pub right: TypeDescriptor,
}

/// Everything a solve produced, including problems.
///
/// Conflicts do not abort the solve: every variable is processed and the
/// caller decides with [`Solution::into_result`] whether conflicts are fatal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Solution {
    /// Topology version the solve ran against
    pub version: u64,
    /// Propagation passes run
    pub iterations: usize,
    /// False when the pass limit was hit first
    pub converged: bool,
    pub variables: Vec<VariableReport>,
    pub conflicts: Vec<VariableConflict>,
    pub unsatisfied: Vec<UnsatisfiedConstraint>,
    pub diagnostics: Vec<SolverDiagnostic>,
    pub cache: CacheStats,
}

impl Solution {
    pub fn resolved_type(&self, var: TypeVarId) -> Option<&TypeDescriptor> {
        self.variables
            .get(var.0 as usize)
            .and_then(|report| report.resolved.as_ref())
    }

    pub fn variable(&self, var: TypeVarId) -> Option<&VariableReport> {
        self.variables.get(var.0 as usize)
    }

    pub fn conflict(&self, var: TypeVarId) -> Option<&VariableConflict> {
        self.conflicts.iter().find(|c| c.variable == var)
    }

    /// No conflicts and every constraint holds.
    pub fn is_ok(&self) -> bool {
        self.conflicts.is_empty() && self.unsatisfied.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Turn conflicts into an error. Unsatisfied constraints alone are not
    /// fatal; they stay visible on the returned solution.
    pub fn into_result(self) -> Result<Solution, TypeConflictError> {
        if self.conflicts.is_empty() {
            Ok(self)
        } else {
            Err(TypeConflictError {
                conflicts: self.conflicts,
            })
        }
    }
}

/// Restore point for [`super::ConstraintSolver::restore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverSnapshot {
    pub(crate) variables: usize,
    pub(crate) constraints: usize,
}

impl SolverSnapshot {
    pub fn variables(&self) -> usize {
        self.variables
    }

    pub fn constraints(&self) -> usize {
        self.constraints
    }
}
