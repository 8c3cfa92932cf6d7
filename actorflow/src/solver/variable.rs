//! Type variables and their bounds.

use actorflow_types::{TypeDescriptor, TypeVarId};
use serde::Serialize;

/// Progress of one variable through a solve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum VariableState {
    /// No constraint has touched the bounds yet
    Unresolved,
    /// At least one bound tightened
    Bounded,
    Resolved(TypeDescriptor),
    /// Lower bound is not below the upper bound
    Conflict,
}

/// A type variable. Bounds only ever tighten: the lower bound rises by LUB,
/// the upper bound falls by GLB.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeVariable {
    pub(crate) id: TypeVarId,
    pub(crate) name: String,
    pub(crate) lower: TypeDescriptor,
    pub(crate) upper: TypeDescriptor,
    pub(crate) default: Option<TypeDescriptor>,
    pub(crate) state: VariableState,
}

impl TypeVariable {
    pub(crate) fn new(id: TypeVarId, name: String, default: Option<TypeDescriptor>) -> Self {
        Self {
            id,
            name,
            lower: TypeDescriptor::Bottom,
            upper: TypeDescriptor::Top,
            default,
            state: VariableState::Unresolved,
        }
    }

    pub fn id(&self) -> TypeVarId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower(&self) -> &TypeDescriptor {
        &self.lower
    }

    pub fn upper(&self) -> &TypeDescriptor {
        &self.upper
    }

    pub fn default_type(&self) -> Option<&TypeDescriptor> {
        self.default.as_ref()
    }

    pub fn state(&self) -> &VariableState {
        &self.state
    }

    /// Back to the initial bounds, keeping name and default.
    pub(crate) fn clear(&mut self) {
        self.lower = TypeDescriptor::Bottom;
        self.upper = TypeDescriptor::Top;
        self.state = VariableState::Unresolved;
    }

    pub(crate) fn raise_lower(&mut self, lower: TypeDescriptor) -> bool {
        if lower == self.lower {
            return false;
        }
        self.lower = lower;
        self.state = VariableState::Bounded;
        true
    }

    pub(crate) fn lower_upper(&mut self, upper: TypeDescriptor) -> bool {
        if upper == self.upper {
            return false;
        }
        self.upper = upper;
        self.state = VariableState::Bounded;
        true
    }

    pub fn resolved(&self) -> Option<&TypeDescriptor> {
        match &self.state {
            VariableState::Resolved(ty) => Some(ty),
            _ => None,
        }
    }
}
