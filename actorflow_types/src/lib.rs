//! actorflow_types
//!
//! Type descriptors, their canonical textual syntax, the class hierarchy for
//! object types, and the type lattice used by the actorflow constraint solver.
//!
//! # Example
//!
//! ```
//! use actorflow_types::{parse_type, TypeLattice};
//!
//! let lattice = TypeLattice::standard();
//! let int = parse_type("int").unwrap();
//! let double = parse_type("double").unwrap();
//!
//! assert_eq!(lattice.least_upper_bound(&int, &double), double);
//! assert!(lattice.is_subtype(&int, &double));
//! ```

#![deny(clippy::print_stderr)]

pub mod descriptor;
pub mod error;
pub mod hierarchy;
pub mod lattice;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

// Re-exports
pub use descriptor::{
    is_valid_label, ObjectClass, PrimitiveKind, RecordFields, TypeDescriptor, TypeName, TypeVarId,
};
pub use error::{
    HierarchyError, LatticeConstructionError, MalformedTypeError, ParseResult, ParseTypeError,
};
pub use hierarchy::{ClassHierarchy, ClassId};
pub use lattice::{
    CacheStats, LatticeBuilder, LatticeCache, LatticeOrdering, PrimitiveLattice, TypeLattice,
};
pub use parser::parse_type;
pub use span::Span;
