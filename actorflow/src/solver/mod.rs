//! Type constraint solver.
//!
//! Variables start at `[bottom, top]`. Constraints are propagated in
//! registration order until no bound moves (or the pass limit is hit), then
//! every variable is checked for a conflict and resolved according to the
//! configured [`ResolutionPolicy`].
//!
//! Resolution runs in two steps so that picking one end of an interval does
//! not break a constraint with a neighbour still at the other end: variables
//! with an informative preferred bound are pinned to it first, and the
//! opposite bounds are re-propagated before the remaining variables are
//! resolved.

mod constraint;
mod diagnostics;
mod error;
mod outcome;
mod propagate;
mod variable;


pub use constraint::{Constraint, ConstraintId, Relation};
pub use diagnostics::{DiagnosticReason, SolverDiagnostic};
pub use error::{SolverError, TypeConflictError, VariableConflict};
pub use outcome::{Solution, SolverSnapshot, UnsatisfiedConstraint, VariableReport};
pub use variable::{TypeVariable, VariableState};

use std::sync::Arc;

use actorflow_types::{LatticeCache, TypeDescriptor, TypeLattice, TypeVarId};
use log::{debug, warn};

use crate::config::{ResolutionPolicy, SolverConfig};

/// Collects type variables and constraints and solves them against a lattice.
#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    lattice: Arc<TypeLattice>,
    config: SolverConfig,
    variables: Vec<TypeVariable>,
    constraints: Vec<Constraint>,
    version: u64,
}

impl ConstraintSolver {
    pub fn new(lattice: Arc<TypeLattice>, config: SolverConfig) -> Self {
        Self::with_version(lattice, config, 0)
    }

    /// Solver whose solutions are stamped with a topology version
    pub fn with_version(lattice: Arc<TypeLattice>, config: SolverConfig, version: u64) -> Self {
        Self {
            lattice,
            config,
            variables: Vec::new(),
            constraints: Vec::new(),
            version,
        }
    }

    /// Solver over the standard lattice with default settings
    pub fn standard() -> Self {
        Self::new(Arc::new(TypeLattice::standard()), SolverConfig::default())
    }

    pub fn lattice(&self) -> &TypeLattice {
        &self.lattice
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn new_variable(&mut self, name: impl Into<String>) -> TypeVarId {
        self.push_variable(name.into(), None)
    }

    /// Variable that resolves to `default` when no bound is informative
    pub fn new_variable_with_default(
        &mut self,
        name: impl Into<String>,
        default: TypeDescriptor,
    ) -> TypeVarId {
        self.push_variable(name.into(), Some(default))
    }

    fn push_variable(&mut self, name: String, default: Option<TypeDescriptor>) -> TypeVarId {
        let id = TypeVarId(self.variables.len() as u32);
        self.variables.push(TypeVariable::new(id, name, default));
        id
    }

    /// Register `left relation right`. A bare variable is written
    /// `TypeDescriptor::Unknown(id)`; a `TypeVarId` converts directly.
    pub fn add_constraint(
        &mut self,
        left: impl Into<TypeDescriptor>,
        relation: Relation,
        right: impl Into<TypeDescriptor>,
    ) -> Result<ConstraintId, SolverError> {
        let left = left.into();
        let right = right.into();
        for var in left.type_variables().into_iter().chain(right.type_variables()) {
            if var.0 as usize >= self.variables.len() {
                return Err(SolverError::UnknownVariable(var));
            }
        }
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(Constraint {
            id,
            left,
            relation,
            right,
        });
        Ok(id)
    }

    pub fn variable(&self, id: TypeVarId) -> Option<&TypeVariable> {
        self.variables.get(id.0 as usize)
    }

    pub fn variables(&self) -> &[TypeVariable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_subtype(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> bool {
        self.lattice.is_subtype(a, b)
    }

    /// Resolved type from the last solve
    pub fn resolved_type(&self, id: TypeVarId) -> Option<&TypeDescriptor> {
        self.variable(id).and_then(TypeVariable::resolved)
    }

    pub fn snapshot(&self) -> SolverSnapshot {
        SolverSnapshot {
            variables: self.variables.len(),
            constraints: self.constraints.len(),
        }
    }

    /// Drop every variable and constraint registered after `snapshot`.
    /// Bounds of the remaining variables are reset; solve again to get
    /// resolved types.
    pub fn restore(&mut self, snapshot: SolverSnapshot) -> Result<(), SolverError> {
        if snapshot.variables > self.variables.len()
            || snapshot.constraints > self.constraints.len()
        {
            return Err(SolverError::StaleSnapshot {
                snapshot_variables: snapshot.variables,
                snapshot_constraints: snapshot.constraints,
                variables: self.variables.len(),
                constraints: self.constraints.len(),
            });
        }
        self.variables.truncate(snapshot.variables);
        self.constraints.truncate(snapshot.constraints);
        for var in &mut self.variables {
            var.clear();
        }
        Ok(())
    }

    /// Solve from scratch. Always processes every variable; conflicts and
    /// violated constraints are reported on the returned [`Solution`].
    pub fn solve(&mut self) -> Solution {
        let lattice = Arc::clone(&self.lattice);
        let mut cache = LatticeCache::new(&lattice);
        let mut diagnostics = Vec::new();

        for var in &mut self.variables {
            var.clear();
        }
        debug!(
            "[ConstraintSolver] solving {} variable(s), {} constraint(s)",
            self.variables.len(),
            self.constraints.len()
        );

        // ==================== Propagation ====================
        let (iterations, converged) = fixed_point(self.config.max_iterations, || {
            let mut changed = false;
            for constraint in &self.constraints {
                changed |= propagate::propagate(constraint, &mut self.variables, &mut cache);
            }
            changed
        });
        if !converged {
            warn!(
                "[ConstraintSolver] no fixed point after {} iteration(s)",
                iterations
            );
            diagnostics.push(SolverDiagnostic::new(
                DiagnosticReason::FixedPointDivergence(iterations),
            ));
        }

        // ==================== Conflicts ====================
        let mut conflicts = Vec::new();
        let mut in_conflict = vec![false; self.variables.len()];
        for (index, var) in self.variables.iter().enumerate() {
            if cache.is_subtype(&var.lower, &var.upper) {
                continue;
            }
            in_conflict[index] = true;
            let related: Vec<&Constraint> = self
                .constraints
                .iter()
                .filter(|c| c.mentions(var.id))
                .collect();
            conflicts.push(VariableConflict {
                variable: var.id,
                name: var.name.clone(),
                lower: var.lower.clone(),
                upper: var.upper.clone(),
                constraints: related.iter().map(|c| c.id).collect(),
                rendered: related
                    .iter()
                    .map(|c| c.render(|id| self.variable_name(id)))
                    .collect(),
            });
        }

        // ==================== Resolution ====================
        let resolved = self.resolve(&in_conflict, &mut cache, &mut diagnostics);
        for ((var, conflict), ty) in self
            .variables
            .iter_mut()
            .zip(&in_conflict)
            .zip(&resolved)
        {
            var.state = match (conflict, ty) {
                (false, Some(ty)) => VariableState::Resolved(ty.clone()),
                _ => VariableState::Conflict,
            };
        }

        // ==================== Re-check ====================
        let mut unsatisfied = Vec::new();
        let lookup = |index: usize| resolved.get(index).cloned().flatten();
        for constraint in &self.constraints {
            let touches_conflict = constraint
                .left
                .type_variables()
                .into_iter()
                .chain(constraint.right.type_variables())
                .any(|var| in_conflict.get(var.0 as usize).copied().unwrap_or(false));
            if touches_conflict {
                continue;
            }
            let left = propagate::substitute(&constraint.left, &lookup);
            let right = propagate::substitute(&constraint.right, &lookup);
            let holds = match constraint.relation {
                Relation::LessOrEqual => cache.is_subtype(&left, &right),
                Relation::GreaterOrEqual => cache.is_subtype(&right, &left),
                Relation::Equal => {
                    cache.is_subtype(&left, &right) && cache.is_subtype(&right, &left)
                }
            };
            if !holds {
                let rendered = constraint.render(|id| self.variable_name(id));
                warn!("[ConstraintSolver] constraint {} does not hold after resolution", rendered);
                unsatisfied.push(UnsatisfiedConstraint {
                    constraint: constraint.id,
                    rendered,
                    left,
                    right,
                });
            }
        }

        let stats = cache.stats();
        debug!(
            "[ConstraintSolver] done in {} iteration(s): {} conflict(s), {} unsatisfied, \
             cache {} hit(s) / {} miss(es)",
            iterations,
            conflicts.len(),
            unsatisfied.len(),
            stats.hits,
            stats.misses
        );

        Solution {
            version: self.version,
            iterations,
            converged,
            variables: self
                .variables
                .iter()
                .map(|var| VariableReport {
                    id: var.id,
                    name: var.name.clone(),
                    lower: var.lower.clone(),
                    upper: var.upper.clone(),
                    resolved: var.resolved().cloned(),
                })
                .collect(),
            conflicts,
            unsatisfied,
            diagnostics,
            cache: stats,
        }
    }

    /// Pick a type for every variable not in conflict.
    fn resolve(
        &self,
        in_conflict: &[bool],
        cache: &mut LatticeCache<'_>,
        diagnostics: &mut Vec<SolverDiagnostic>,
    ) -> Vec<Option<TypeDescriptor>> {
        let policy = self.config.resolution;
        let mut working = self.variables.clone();
        let mut pinned = vec![false; working.len()];

        for (index, var) in working.iter_mut().enumerate() {
            if in_conflict[index] {
                continue;
            }
            match policy {
                ResolutionPolicy::Greatest if !var.upper.is_top() => {
                    var.lower = var.upper.clone();
                    pinned[index] = true;
                }
                ResolutionPolicy::Least if !var.lower.is_uninformative() => {
                    var.upper = var.lower.clone();
                    pinned[index] = true;
                }
                _ => {}
            }
        }

        fixed_point(self.config.max_iterations, || {
            let mut changed = false;
            for constraint in &self.constraints {
                changed |= match policy {
                    ResolutionPolicy::Greatest => {
                        propagate::propagate_lower(constraint, &mut working, cache)
                    }
                    ResolutionPolicy::Least => {
                        propagate::propagate_upper(constraint, &mut working, cache)
                    }
                };
            }
            changed
        });

        working
            .iter()
            .enumerate()
            .map(|(index, var)| {
                if in_conflict[index] {
                    return None;
                }
                let preferred = match policy {
                    ResolutionPolicy::Greatest => &var.lower,
                    ResolutionPolicy::Least => &var.upper,
                };
                if pinned[index] {
                    return Some(preferred.clone());
                }
                // the preferred bound was trivial, so fall back to the other one
                let fallback = match policy {
                    ResolutionPolicy::Greatest if !var.lower.is_uninformative() => {
                        Some(var.lower.clone())
                    }
                    ResolutionPolicy::Least if !var.upper.is_top() => Some(var.upper.clone()),
                    _ => None,
                };
                if fallback.is_some() {
                    return fallback;
                }
                match &var.default {
                    Some(default) => {
                        debug!(
                            "[ConstraintSolver] {} resolved to default {}",
                            var.name, default
                        );
                        diagnostics.push(
                            SolverDiagnostic::new(DiagnosticReason::DefaultApplied(
                                default.clone(),
                            ))
                            .with_context(var.name.clone()),
                        );
                        Some(default.clone())
                    }
                    None => {
                        diagnostics.push(
                            SolverDiagnostic::new(DiagnosticReason::Unconstrained)
                                .with_context(var.name.clone()),
                        );
                        Some(TypeDescriptor::Top)
                    }
                }
            })
            .collect()
    }

    fn variable_name(&self, id: TypeVarId) -> Option<String> {
        self.variable(id).map(|var| var.name.clone())
    }
}

/// Run `pass` until it reports no change or `limit` passes ran.
/// Returns the number of passes and whether a fixed point was reached.
fn fixed_point(limit: usize, mut pass: impl FnMut() -> bool) -> (usize, bool) {
    let mut iterations = 0;
    while iterations < limit {
        iterations += 1;
        if !pass() {
            return (iterations, true);
        }
    }
    (iterations, false)
}
