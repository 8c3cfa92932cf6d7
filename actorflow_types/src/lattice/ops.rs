//! Lattice operations over full type descriptors.
//!
//! - least upper bound (⊔)
//! - greatest lower bound (⊓)
//! - subtype test (⊑), defined as `a ⊔ b == b`
//! - four-way comparison
//!
//! Neither bound operation fails: unrelated tags meet at `Top` / `Bottom`.

use std::collections::BTreeMap;

use serde::Serialize;

use super::primitive::PrimitiveLattice;
use crate::descriptor::{ObjectClass, RecordFields, TypeDescriptor, TypeName};
use crate::hierarchy::ClassHierarchy;

/// Outcome of [`TypeLattice::compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LatticeOrdering {
    /// Strictly below
    Lower,
    Same,
    /// Strictly above
    Higher,
    Incomparable,
}

/// Primitive lattice plus the class hierarchy for object types.
#[derive(Clone, Debug)]
pub struct TypeLattice {
    primitives: PrimitiveLattice,
    classes: ClassHierarchy,
}

impl Default for TypeLattice {
    fn default() -> Self {
        Self::standard()
    }
}

impl TypeLattice {
    pub fn new(primitives: PrimitiveLattice, classes: ClassHierarchy) -> Self {
        Self {
            primitives,
            classes,
        }
    }

    /// Standard primitive lattice, empty class hierarchy.
    pub fn standard() -> Self {
        Self::new(PrimitiveLattice::standard().clone(), ClassHierarchy::new())
    }

    /// Replace the class hierarchy
    pub fn with_classes(mut self, classes: ClassHierarchy) -> Self {
        self.classes = classes;
        self
    }

    pub fn primitives(&self) -> &PrimitiveLattice {
        &self.primitives
    }

    pub fn classes(&self) -> &ClassHierarchy {
        &self.classes
    }

    /// Least upper bound (join).
    ///
    /// # Examples
    /// ```text
    /// int ⊔ double                    = double
    /// array(int) ⊔ array(long)        = array(long)
    /// {a = int, b = string} ⊔ {a = double} = {a = double}
    /// object("Dog") ⊔ object("Cat")   = object("Animal")
    /// int ⊔ array(int)                = top
    /// unknown(1) ⊔ unknown(2)         = bottom
    /// ```
    ///
    /// Type variables carry no information and are read as `Bottom`.
    pub fn least_upper_bound(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
        self.join(&a.without_variables(), &b.without_variables())
    }

    fn join(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
        use TypeDescriptor::*;
        if a == b {
            return a.clone();
        }
        match (a, b) {
            (Bottom, t) | (t, Bottom) => t.clone(),
            (Top, _) | (_, Top) => Top,

            (Primitive(x), Primitive(y)) => self.primitives.least_upper_bound(x, y),

            (Array(x), Array(y)) => TypeDescriptor::array(self.join(x, y)),

            // Only shared labels survive
            (Record(x), Record(y)) => {
                let fields = x
                    .iter()
                    .filter_map(|(label, tx)| {
                        y.get(label)
                            .map(|ty| (label.to_string(), self.join(tx, ty)))
                    })
                    .collect();
                Record(RecordFields::from_valid(fields))
            }

            (Function { args: ax, ret: rx }, Function { args: ay, ret: ry }) => {
                if ax.len() != ay.len() {
                    return Top;
                }
                let args = ax.iter().zip(ay).map(|(x, y)| self.join(x, y)).collect();
                TypeDescriptor::function(args, self.join(rx, ry))
            }

            (Object(x), Object(y)) => Object(self.object_lub(x, y)),

            _ => Top,
        }
    }

    /// Greatest lower bound (meet).
    ///
    /// # Examples
    /// ```text
    /// long ⊓ double                  = int
    /// {a = int} ⊓ {b = string}       = {a = int, b = string}
    /// object("Dog") ⊓ object("Cat")  = object(impossible)
    /// int ⊓ array(int)               = bottom
    /// ```
    pub fn greatest_lower_bound(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
        self.meet(&a.without_variables(), &b.without_variables())
    }

    fn meet(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
        use TypeDescriptor::*;
        if a == b {
            return a.clone();
        }
        match (a, b) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Top, t) | (t, Top) => t.clone(),

            (Primitive(x), Primitive(y)) => self.primitives.greatest_lower_bound(x, y),

            (Array(x), Array(y)) => TypeDescriptor::array(self.meet(x, y)),

            // Every label of either side is kept
            (Record(x), Record(y)) => {
                let mut fields: BTreeMap<String, TypeDescriptor> = x.map().clone();
                for (label, ty) in y.iter() {
                    let merged = match fields.get(label) {
                        Some(tx) => self.meet(tx, ty),
                        None => ty.clone(),
                    };
                    fields.insert(label.to_string(), merged);
                }
                Record(RecordFields::from_valid(fields))
            }

            (Function { args: ax, ret: rx }, Function { args: ay, ret: ry }) => {
                if ax.len() != ay.len() {
                    return Bottom;
                }
                let args = ax.iter().zip(ay).map(|(x, y)| self.meet(x, y)).collect();
                TypeDescriptor::function(args, self.meet(rx, ry))
            }

            (Object(x), Object(y)) => Object(self.object_glb(x, y)),

            _ => Bottom,
        }
    }

    /// `a ⊑ b`
    pub fn is_subtype(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> bool {
        let b = b.without_variables();
        self.join(&a.without_variables(), &b) == *b
    }

    pub fn compare(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> LatticeOrdering {
        if a == b {
            LatticeOrdering::Same
        } else if self.is_subtype(a, b) {
            LatticeOrdering::Lower
        } else if self.is_subtype(b, a) {
            LatticeOrdering::Higher
        } else {
            LatticeOrdering::Incomparable
        }
    }

    fn object_lub(&self, a: &ObjectClass, b: &ObjectClass) -> ObjectClass {
        match (a, b) {
            (ObjectClass::Unconstrained, _) | (_, ObjectClass::Unconstrained) => {
                ObjectClass::Unconstrained
            }
            (ObjectClass::Impossible, other) | (other, ObjectClass::Impossible) => other.clone(),
            (ObjectClass::Class(x), ObjectClass::Class(y)) => self
                .common_superclass(x, y)
                .map(ObjectClass::Class)
                .unwrap_or(ObjectClass::Unconstrained),
        }
    }

    fn object_glb(&self, a: &ObjectClass, b: &ObjectClass) -> ObjectClass {
        match (a, b) {
            (ObjectClass::Impossible, _) | (_, ObjectClass::Impossible) => ObjectClass::Impossible,
            (ObjectClass::Unconstrained, other) | (other, ObjectClass::Unconstrained) => {
                other.clone()
            }
            (ObjectClass::Class(x), ObjectClass::Class(y)) => {
                if self.classes.is_subclass(x.as_str(), y.as_str()) {
                    ObjectClass::Class(x.clone())
                } else if self.classes.is_subclass(y.as_str(), x.as_str()) {
                    ObjectClass::Class(y.clone())
                } else {
                    ObjectClass::Impossible
                }
            }
        }
    }

    /// Walk the ancestors of `a` until one is also an ancestor of `b`.
    fn common_superclass(&self, a: &TypeName, b: &TypeName) -> Option<TypeName> {
        self.classes.lowest_common_ancestor(a.as_str(), b.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeVarId;

    fn ty(text: &str) -> TypeDescriptor {
        TypeDescriptor::parse(text).unwrap()
    }

    fn animals() -> TypeLattice {
        let mut classes = ClassHierarchy::new();
        classes.add_class("Animal", None).unwrap();
        classes.add_class("Dog", Some("Animal")).unwrap();
        classes.add_class("Cat", Some("Animal")).unwrap();
        classes.add_class("Rock", None).unwrap();
        TypeLattice::standard().with_classes(classes)
    }

    // ==================== Join ====================

    #[test]
    fn test_lub_primitives_and_extremes() {
        let l = TypeLattice::standard();
        assert_eq!(l.least_upper_bound(&ty("int"), &ty("double")), ty("double"));
        assert_eq!(l.least_upper_bound(&ty("bottom"), &ty("int")), ty("int"));
        assert_eq!(l.least_upper_bound(&ty("top"), &ty("int")), ty("top"));
        assert_eq!(l.least_upper_bound(&ty("int"), &ty("array(int)")), ty("top"));
    }

    #[test]
    fn test_lub_unknown_is_uninformative() {
        let l = TypeLattice::standard();
        let u1 = TypeDescriptor::variable(TypeVarId(1));
        let u2 = TypeDescriptor::variable(TypeVarId(2));
        assert_eq!(l.least_upper_bound(&u1, &ty("int")), ty("int"));
        assert_eq!(l.least_upper_bound(&u1, &u2), TypeDescriptor::Bottom);
        assert_eq!(l.greatest_lower_bound(&u1, &u2), TypeDescriptor::Bottom);
        assert_eq!(l.least_upper_bound(&u1, &u1), TypeDescriptor::Bottom);
        assert_eq!(
            l.least_upper_bound(&TypeDescriptor::array(u1.clone()), &ty("array(int)")),
            ty("array(int)")
        );
    }

    #[test]
    fn test_unknown_sits_with_bottom() {
        let l = TypeLattice::standard();
        let u1 = TypeDescriptor::variable(TypeVarId(1));
        let u2 = TypeDescriptor::variable(TypeVarId(2));
        let lub = l.least_upper_bound(&u1, &u2);
        assert!(l.is_subtype(&u1, &lub));
        assert!(l.is_subtype(&u2, &lub));
        assert!(l.is_subtype(&u1, &TypeDescriptor::Bottom));
        assert!(l.is_subtype(&TypeDescriptor::Bottom, &u1));
        assert!(l.is_subtype(&u1, &ty("int")));
        assert_eq!(l.compare(&u1, &ty("int")), LatticeOrdering::Lower);
    }

    #[test]
    fn test_lub_structured() {
        let l = TypeLattice::standard();
        assert_eq!(
            l.least_upper_bound(&ty("array(int)"), &ty("array(long)")),
            ty("array(long)")
        );
        assert_eq!(
            l.least_upper_bound(&ty("{a = int, b = string}"), &ty("{a = double, c = int}")),
            ty("{a = double}")
        );
        assert_eq!(
            l.least_upper_bound(
                &ty("function(double) -> int"),
                &ty("function(int) -> double")
            ),
            ty("function(double) -> double")
        );
        assert_eq!(
            l.least_upper_bound(&ty("function(int) -> int"), &ty("function(double) -> int")),
            ty("function(double) -> int")
        );
        assert!(l.is_subtype(&ty("function(int) -> int"), &ty("function(double) -> int")));
        assert_eq!(
            l.least_upper_bound(&ty("function(int) -> int"), &ty("function() -> int")),
            ty("top")
        );
    }

    #[test]
    fn test_glb_structured() {
        let l = TypeLattice::standard();
        assert_eq!(l.greatest_lower_bound(&ty("long"), &ty("double")), ty("int"));
        assert_eq!(
            l.greatest_lower_bound(&ty("{a = long}"), &ty("{a = double, b = string}")),
            ty("{a = int, b = string}")
        );
        assert_eq!(
            l.greatest_lower_bound(
                &ty("function(double) -> int"),
                &ty("function(int) -> double")
            ),
            ty("function(int) -> int")
        );
        assert_eq!(l.greatest_lower_bound(&ty("string"), &ty("{}")), ty("bottom"));
        assert_eq!(l.greatest_lower_bound(&ty("top"), &ty("array(int)")), ty("array(int)"));
    }

    // ==================== Objects ====================

    #[test]
    fn test_object_bounds() {
        let l = animals();
        assert_eq!(
            l.least_upper_bound(&ty(r#"object("Dog")"#), &ty(r#"object("Cat")"#)),
            ty(r#"object("Animal")"#)
        );
        assert_eq!(
            l.least_upper_bound(&ty(r#"object("Dog")"#), &ty(r#"object("Rock")"#)),
            ty("object(null)")
        );
        assert_eq!(
            l.least_upper_bound(&ty("object(impossible)"), &ty(r#"object("Cat")"#)),
            ty(r#"object("Cat")"#)
        );
        assert_eq!(
            l.greatest_lower_bound(&ty(r#"object("Dog")"#), &ty(r#"object("Cat")"#)),
            ty("object(impossible)")
        );
        assert_eq!(
            l.greatest_lower_bound(&ty(r#"object("Dog")"#), &ty(r#"object("Animal")"#)),
            ty(r#"object("Dog")"#)
        );
        assert_eq!(
            l.greatest_lower_bound(&ty("object(null)"), &ty(r#"object("Rock")"#)),
            ty(r#"object("Rock")"#)
        );
    }

    // ==================== Subtype / compare ====================

    #[test]
    fn test_is_subtype_and_compare() {
        let l = animals();
        assert!(l.is_subtype(&ty("int"), &ty("scalar")));
        assert!(!l.is_subtype(&ty("scalar"), &ty("int")));
        assert!(l.is_subtype(&ty(r#"object("Dog")"#), &ty("object(null)")));
        assert!(l.is_subtype(&ty("{a = int, b = int}"), &ty("{a = long}")));
        assert_eq!(l.compare(&ty("int"), &ty("long")), LatticeOrdering::Lower);
        assert_eq!(l.compare(&ty("long"), &ty("int")), LatticeOrdering::Higher);
        assert_eq!(l.compare(&ty("long"), &ty("long")), LatticeOrdering::Same);
        assert_eq!(l.compare(&ty("long"), &ty("double")), LatticeOrdering::Incomparable);
    }
}
