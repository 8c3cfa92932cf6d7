//! Class hierarchy backing object types.
//!
//! An arena of class nodes, each holding the index of its parent. Parents are
//! registered before their children, so the hierarchy is always a forest and
//! ancestor walks terminate.

use std::collections::HashMap;

use crate::descriptor::TypeName;
use crate::error::HierarchyError;

/// Index of a class in a [`ClassHierarchy`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct ClassNode {
    name: TypeName,
    parent: Option<ClassId>,
}

/// Single-inheritance class forest.
#[derive(Clone, Debug, Default)]
pub struct ClassHierarchy {
    nodes: Vec<ClassNode>,
    by_name: HashMap<String, ClassId>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with an optional, already registered, parent.
    pub fn add_class(
        &mut self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<ClassId, HierarchyError> {
        let name = TypeName::validated("class", name.to_string())?;
        if self.by_name.contains_key(name.as_str()) {
            return Err(HierarchyError::DuplicateClass(name.to_string()));
        }
        let parent = match parent {
            Some(parent_name) => Some(self.id(parent_name).ok_or_else(|| {
                HierarchyError::UnknownParent {
                    class: name.to_string(),
                    parent: parent_name.to_string(),
                }
            })?),
            None => None,
        };
        let id = ClassId(self.nodes.len() as u32);
        self.by_name.insert(name.to_string(), id);
        self.nodes.push(ClassNode { name, parent });
        Ok(id)
    }

    /// Look up a class by name
    pub fn id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: ClassId) -> &TypeName {
        &self.nodes[id.index()].name
    }

    pub fn parent(&self, id: ClassId) -> Option<ClassId> {
        self.nodes[id.index()].parent
    }

    pub fn contains(&self, name: &str) -> bool {
        self.id(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The class itself followed by its ancestors, nearest first.
    ///
    /// Unregistered names have no ancestors besides themselves.
    pub fn ancestors(&self, name: &str) -> Vec<TypeName> {
        match self.id(name) {
            Some(id) => self.ancestor_ids(id).map(|id| self.name(id).clone()).collect(),
            None => TypeName::new(name).into_iter().collect(),
        }
    }

    fn ancestor_ids(&self, start: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(Some(start), move |id| self.parent(*id))
    }

    /// Reflexive subclass test
    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        match (self.id(sub), self.id(sup)) {
            (Some(sub), Some(sup)) => self.ancestor_ids(sub).any(|id| id == sup),
            _ => false,
        }
    }

    /// Nearest class that both `a` and `b` descend from, if any.
    pub fn lowest_common_ancestor(&self, a: &str, b: &str) -> Option<TypeName> {
        if a == b {
            return TypeName::new(a).ok();
        }
        let (a, b) = (self.id(a)?, self.id(b)?);
        self.ancestor_ids(a)
            .find(|candidate| self.ancestor_ids(b).any(|id| id == *candidate))
            .map(|id| self.name(id).clone())
    }
}
