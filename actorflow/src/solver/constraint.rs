//! Constraints between type terms.

use std::fmt;

use actorflow_types::{TypeDescriptor, TypeVarId};
use serde::Serialize;

/// Index of a constraint in registration order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConstraintId(pub u32);

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::LessOrEqual => "<=",
            Relation::Equal => "==",
            Relation::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `left relation right`, where either side may embed type variables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub id: ConstraintId,
    pub left: TypeDescriptor,
    pub relation: Relation,
    pub right: TypeDescriptor,
}

impl Constraint {
    /// The constraint as `lower <= upper` pairs.
    pub fn inequalities(&self) -> Vec<(&TypeDescriptor, &TypeDescriptor)> {
        match self.relation {
            Relation::LessOrEqual => vec![(&self.left, &self.right)],
            Relation::GreaterOrEqual => vec![(&self.right, &self.left)],
            Relation::Equal => vec![(&self.left, &self.right), (&self.right, &self.left)],
        }
    }

    pub fn mentions(&self, var: TypeVarId) -> bool {
        self.left.type_variables().contains(&var) || self.right.type_variables().contains(&var)
    }

    /// Render with variable ids replaced by `name(id)`
    pub fn render(&self, name: impl Fn(TypeVarId) -> Option<String>) -> String {
        format!(
            "{} {} {}",
            render_term(&self.left, &name),
            self.relation,
            render_term(&self.right, &name)
        )
    }
}

fn render_term(term: &TypeDescriptor, name: &impl Fn(TypeVarId) -> Option<String>) -> String {
    match term.as_variable().and_then(name) {
        Some(name) => name,
        None => term.to_string(),
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.relation, self.right)
    }
}
