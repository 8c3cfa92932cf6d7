//! Type descriptors: the elements of the type lattice.
//!
//! A [`TypeDescriptor`] is an immutable value. Equality, hashing and ordering
//! are structural, so descriptors can be used directly as cache keys.
//!
//! ```text
//! Top
//!   ↑
//! primitives / array(..) / {label = ..} / function(..) -> .. / object(..)
//!   ↑
//! Bottom, unknown(id)
//! ```
//!
//! # Module structure
//!
//! - `display`: canonical textual form (the inverse of [`crate::parser`])

mod display;


use crate::error::MalformedTypeError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a type variable (a port, parameter or expression slot).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeVarId(pub u32);

impl fmt::Display for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A class or domain type name.
///
/// Names are non-empty and never contain `"` or `\`, which keeps the quoted
/// textual form free of escapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Result<Self, MalformedTypeError> {
        Self::validated("type", name.into())
    }

    pub(crate) fn validated(what: &'static str, name: String) -> Result<Self, MalformedTypeError> {
        if name.is_empty() || name.contains(['"', '\\']) {
            return Err(MalformedTypeError::invalid_name(what, name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TypeName {
    type Error = MalformedTypeError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::validated("type", name)
    }
}

impl From<TypeName> for String {
    fn from(name: TypeName) -> Self {
        name.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node of the finite (primitive) part of the lattice.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Boolean,
    UnsignedByte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Complex,
    FixedPoint,
    /// Abstract supertype of every numeric kind
    Scalar,
    String,
    Event,
    /// Domain-specific named type registered by the model layer
    Named(TypeName),
}

impl PrimitiveKind {
    /// Every built-in kind, in declaration order.
    pub const BUILTIN: [PrimitiveKind; 12] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::UnsignedByte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Complex,
        PrimitiveKind::FixedPoint,
        PrimitiveKind::Scalar,
        PrimitiveKind::String,
        PrimitiveKind::Event,
    ];

    /// Create a named domain kind
    pub fn named(name: impl Into<String>) -> Result<Self, MalformedTypeError> {
        Ok(PrimitiveKind::Named(TypeName::validated("domain", name.into())?))
    }

    /// Keyword used in the textual form; `None` for named domain kinds.
    pub fn keyword(&self) -> Option<&'static str> {
        let keyword = match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::UnsignedByte => "unsignedByte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Complex => "complex",
            PrimitiveKind::FixedPoint => "fixedpoint",
            PrimitiveKind::Scalar => "scalar",
            PrimitiveKind::String => "string",
            PrimitiveKind::Event => "event",
            PrimitiveKind::Named(_) => return None,
        };
        Some(keyword)
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::BUILTIN
            .iter()
            .find(|kind| kind.keyword() == Some(keyword))
            .cloned()
    }

    /// Returns true for the numeric kinds (everything under `scalar`).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::UnsignedByte
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::Float
                | PrimitiveKind::Double
                | PrimitiveKind::Complex
                | PrimitiveKind::FixedPoint
                | PrimitiveKind::Scalar
        )
    }
}

/// Class constraint of an object type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectClass {
    /// Synthetic bottom of the object sub-lattice (no class satisfies it)
    Impossible,
    Class(TypeName),
    /// Any object; the top of the object sub-lattice
    Unconstrained,
}

/// Fields of a record type, ordered by label.
///
/// Only reachable through [`RecordFields::new`], which rejects duplicate or
/// non-identifier labels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, TypeDescriptor)>", into = "Vec<(String, TypeDescriptor)>")]
pub struct RecordFields(BTreeMap<String, TypeDescriptor>);

impl RecordFields {
    pub fn new<I, S>(fields: I) -> Result<Self, MalformedTypeError>
    where
        I: IntoIterator<Item = (S, TypeDescriptor)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (label, ty) in fields {
            let label = label.into();
            if !is_valid_label(&label) {
                return Err(MalformedTypeError::InvalidLabel { label });
            }
            if map.contains_key(&label) {
                return Err(MalformedTypeError::DuplicateField { label });
            }
            map.insert(label, ty);
        }
        Ok(Self(map))
    }

    /// Build from labels already known to be valid (lattice operations only
    /// recombine labels of existing records).
    pub(crate) fn from_valid(map: BTreeMap<String, TypeDescriptor>) -> Self {
        Self(map)
    }

    pub fn get(&self, label: &str) -> Option<&TypeDescriptor> {
        self.0.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDescriptor)> {
        self.0.iter().map(|(label, ty)| (label.as_str(), ty))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn map(&self) -> &BTreeMap<String, TypeDescriptor> {
        &self.0
    }

    /// Same labels, each field type passed through `f`.
    pub fn map_types(&self, mut f: impl FnMut(&TypeDescriptor) -> TypeDescriptor) -> Self {
        Self(self.0.iter().map(|(label, ty)| (label.clone(), f(ty))).collect())
    }
}

impl TryFrom<Vec<(String, TypeDescriptor)>> for RecordFields {
    type Error = MalformedTypeError;

    fn try_from(fields: Vec<(String, TypeDescriptor)>) -> Result<Self, Self::Error> {
        RecordFields::new(fields)
    }
}

impl From<RecordFields> for Vec<(String, TypeDescriptor)> {
    fn from(fields: RecordFields) -> Self {
        fields.0.into_iter().collect()
    }
}

/// Record labels share the identifier syntax of the lexer.
pub fn is_valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// One element of the type lattice.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// Most specific element; below everything
    Bottom,
    Primitive(PrimitiveKind),
    Array(Box<TypeDescriptor>),
    Record(RecordFields),
    Function {
        args: Vec<TypeDescriptor>,
        ret: Box<TypeDescriptor>,
    },
    Object(ObjectClass),
    /// Most general element; above everything
    Top,
    /// Placeholder for the (not yet resolved) type of a type variable.
    /// Carries no information, so the lattice treats it like `Bottom`.
    Unknown(TypeVarId),
}

impl TypeDescriptor {
    pub const BOOLEAN: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Boolean);
    pub const UNSIGNED_BYTE: TypeDescriptor =
        TypeDescriptor::Primitive(PrimitiveKind::UnsignedByte);
    pub const SHORT: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Short);
    pub const INT: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Int);
    pub const LONG: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Long);
    pub const FLOAT: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Float);
    pub const DOUBLE: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Double);
    pub const COMPLEX: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Complex);
    pub const FIXED_POINT: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::FixedPoint);
    pub const SCALAR: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Scalar);
    pub const STRING: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::String);
    pub const EVENT: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Event);
    /// `object(null)`: any object
    pub const OBJECT: TypeDescriptor = TypeDescriptor::Object(ObjectClass::Unconstrained);
    /// `object(impossible)`: GLB of unrelated classes
    pub const IMPOSSIBLE_OBJECT: TypeDescriptor = TypeDescriptor::Object(ObjectClass::Impossible);

    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    /// Create a record type; fails on duplicate or non-identifier labels.
    pub fn record<I, S>(fields: I) -> Result<Self, MalformedTypeError>
    where
        I: IntoIterator<Item = (S, TypeDescriptor)>,
        S: Into<String>,
    {
        Ok(TypeDescriptor::Record(RecordFields::new(fields)?))
    }

    pub fn function(args: Vec<TypeDescriptor>, ret: TypeDescriptor) -> Self {
        TypeDescriptor::Function {
            args,
            ret: Box::new(ret),
        }
    }

    /// Create an object type constrained to the named class.
    pub fn object(class: impl Into<String>) -> Result<Self, MalformedTypeError> {
        let name = TypeName::validated("class", class.into())?;
        Ok(TypeDescriptor::Object(ObjectClass::Class(name)))
    }

    /// Create a named domain type.
    pub fn named(name: impl Into<String>) -> Result<Self, MalformedTypeError> {
        Ok(TypeDescriptor::Primitive(PrimitiveKind::named(name)?))
    }

    pub fn variable(id: TypeVarId) -> Self {
        TypeDescriptor::Unknown(id)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, TypeDescriptor::Bottom)
    }

    pub fn is_top(&self) -> bool {
        matches!(self, TypeDescriptor::Top)
    }

    /// Returns the variable id if this descriptor is a bare type variable.
    pub fn as_variable(&self) -> Option<TypeVarId> {
        match self {
            TypeDescriptor::Unknown(id) => Some(*id),
            _ => None,
        }
    }

    /// Bottom or a bare type variable: carries no type information.
    pub fn is_uninformative(&self) -> bool {
        matches!(self, TypeDescriptor::Bottom | TypeDescriptor::Unknown(_))
    }

    /// Returns true if a value of exactly this type could exist: no
    /// `Bottom`, `Top`, `Unknown` or impossible object anywhere inside.
    pub fn is_instantiable(&self) -> bool {
        match self {
            TypeDescriptor::Bottom
            | TypeDescriptor::Top
            | TypeDescriptor::Unknown(_)
            | TypeDescriptor::Object(ObjectClass::Impossible) => false,
            TypeDescriptor::Primitive(_) | TypeDescriptor::Object(_) => true,
            TypeDescriptor::Array(element) => element.is_instantiable(),
            TypeDescriptor::Record(fields) => fields.iter().all(|(_, ty)| ty.is_instantiable()),
            TypeDescriptor::Function { args, ret } => {
                args.iter().all(TypeDescriptor::is_instantiable) && ret.is_instantiable()
            }
        }
    }

    /// Type variables embedded anywhere in this descriptor.
    pub fn type_variables(&self) -> BTreeSet<TypeVarId> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    pub fn has_variables(&self) -> bool {
        match self {
            TypeDescriptor::Unknown(_) => true,
            TypeDescriptor::Array(element) => element.has_variables(),
            TypeDescriptor::Record(fields) => fields.iter().any(|(_, ty)| ty.has_variables()),
            TypeDescriptor::Function { args, ret } => {
                args.iter().any(TypeDescriptor::has_variables) || ret.has_variables()
            }
            TypeDescriptor::Bottom
            | TypeDescriptor::Top
            | TypeDescriptor::Primitive(_)
            | TypeDescriptor::Object(_) => false,
        }
    }

    /// This descriptor with every type variable read as `Bottom`; borrowed
    /// when there is nothing to replace.
    pub fn without_variables(&self) -> Cow<'_, TypeDescriptor> {
        if !self.has_variables() {
            return Cow::Borrowed(self);
        }
        Cow::Owned(self.erase_variables())
    }

    fn erase_variables(&self) -> TypeDescriptor {
        match self {
            TypeDescriptor::Unknown(_) => TypeDescriptor::Bottom,
            TypeDescriptor::Array(element) => TypeDescriptor::array(element.erase_variables()),
            TypeDescriptor::Record(fields) => {
                TypeDescriptor::Record(fields.map_types(TypeDescriptor::erase_variables))
            }
            TypeDescriptor::Function { args, ret } => TypeDescriptor::function(
                args.iter().map(TypeDescriptor::erase_variables).collect(),
                ret.erase_variables(),
            ),
            other => other.clone(),
        }
    }

    fn collect_variables(&self, out: &mut BTreeSet<TypeVarId>) {
        match self {
            TypeDescriptor::Unknown(id) => {
                out.insert(*id);
            }
            TypeDescriptor::Array(element) => element.collect_variables(out),
            TypeDescriptor::Record(fields) => {
                for (_, ty) in fields.iter() {
                    ty.collect_variables(out);
                }
            }
            TypeDescriptor::Function { args, ret } => {
                for arg in args {
                    arg.collect_variables(out);
                }
                ret.collect_variables(out);
            }
            TypeDescriptor::Bottom
            | TypeDescriptor::Top
            | TypeDescriptor::Primitive(_)
            | TypeDescriptor::Object(_) => {}
        }
    }

    /// Nesting depth of structured types (a primitive has depth 0).
    pub fn depth(&self) -> usize {
        match self {
            TypeDescriptor::Array(element) => 1 + element.depth(),
            TypeDescriptor::Record(fields) => {
                1 + fields.iter().map(|(_, ty)| ty.depth()).max().unwrap_or(0)
            }
            TypeDescriptor::Function { args, ret } => {
                1 + args
                    .iter()
                    .map(TypeDescriptor::depth)
                    .chain(std::iter::once(ret.depth()))
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl From<PrimitiveKind> for TypeDescriptor {
    fn from(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive(kind)
    }
}

impl From<TypeVarId> for TypeDescriptor {
    fn from(id: TypeVarId) -> Self {
        TypeDescriptor::Unknown(id)
    }
}
