//! Type lattice.
//!
//! # Module structure
//!
//! - `primitive`: finite primitive sub-lattice with precomputed bound tables
//! - `ops`: LUB, GLB, subtype and comparison over all descriptors
//! - `cache`: per-session memoization of bound queries

pub mod cache;
pub mod ops;
pub mod primitive;

pub use cache::{CacheStats, LatticeCache};
pub use ops::{LatticeOrdering, TypeLattice};
pub use primitive::{LatticeBuilder, PrimitiveLattice};
