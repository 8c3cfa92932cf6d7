//! Canonical textual form of TypeDescriptor.
//!
//! The output is accepted by [`crate::parser::parse_type`] and parses back to
//! an equal descriptor.

use super::{ObjectClass, PrimitiveKind, TypeDescriptor};
use std::fmt;

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Named(name) => write!(f, "domain(\"{}\")", name),
            builtin => f.write_str(builtin.keyword().unwrap_or("?")),
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectClass::Unconstrained => write!(f, "object(null)"),
            ObjectClass::Impossible => write!(f, "object(impossible)"),
            ObjectClass::Class(name) => write!(f, "object(\"{}\")", name),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Bottom => write!(f, "bottom"),
            TypeDescriptor::Top => write!(f, "top"),
            TypeDescriptor::Primitive(kind) => write!(f, "{}", kind),
            TypeDescriptor::Array(element) => write!(f, "array({})", element),
            TypeDescriptor::Record(fields) => {
                write!(f, "{{")?;
                for (i, (label, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", label, ty)?;
                }
                write!(f, "}}")
            }
            TypeDescriptor::Function { args, ret } => {
                write!(f, "function(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ") -> {}", ret)
            }
            TypeDescriptor::Object(class) => write!(f, "{}", class),
            TypeDescriptor::Unknown(id) => write!(f, "unknown({})", id),
        }
    }
}
