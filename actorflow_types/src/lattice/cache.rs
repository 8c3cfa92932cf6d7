//! Memoized lattice queries for one solving session.
//!
//! Both bound operations are commutative, so results are stored once per
//! unordered operand pair.

use std::collections::HashMap;

use serde::Serialize;

use super::ops::TypeLattice;
use crate::descriptor::TypeDescriptor;

type PairKey = (TypeDescriptor, TypeDescriptor);

/// Hit/miss counters of a [`LatticeCache`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Cache of LUB and GLB results over a borrowed lattice.
#[derive(Debug, Clone)]
pub struct LatticeCache<'a> {
    lattice: &'a TypeLattice,
    lub: HashMap<PairKey, TypeDescriptor>,
    glb: HashMap<PairKey, TypeDescriptor>,
    hits: u64,
    misses: u64,
}

fn key(a: &TypeDescriptor, b: &TypeDescriptor) -> PairKey {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl<'a> LatticeCache<'a> {
    pub fn new(lattice: &'a TypeLattice) -> Self {
        Self {
            lattice,
            lub: HashMap::new(),
            glb: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn lattice(&self) -> &'a TypeLattice {
        self.lattice
    }

    pub fn least_upper_bound(&mut self, a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
        // trivial cases would only fill the table
        if a == b || a.is_top() || b.is_top() || a.is_bottom() || b.is_bottom() {
            return self.lattice.least_upper_bound(a, b);
        }
        let k = key(a, b);
        if let Some(hit) = self.lub.get(&k) {
            self.hits += 1;
            return hit.clone();
        }
        self.misses += 1;
        let result = self.lattice.least_upper_bound(a, b);
        self.lub.insert(k, result.clone());
        result
    }

    pub fn greatest_lower_bound(
        &mut self,
        a: &TypeDescriptor,
        b: &TypeDescriptor,
    ) -> TypeDescriptor {
        if a == b || a.is_top() || b.is_top() || a.is_bottom() || b.is_bottom() {
            return self.lattice.greatest_lower_bound(a, b);
        }
        let k = key(a, b);
        if let Some(hit) = self.glb.get(&k) {
            self.hits += 1;
            return hit.clone();
        }
        self.misses += 1;
        let result = self.lattice.greatest_lower_bound(a, b);
        self.glb.insert(k, result.clone());
        result
    }

    pub fn is_subtype(&mut self, a: &TypeDescriptor, b: &TypeDescriptor) -> bool {
        self.least_upper_bound(a, b) == *b.without_variables()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.lub.len() + self.glb.len(),
        }
    }

    /// Clear the cache.
    pub fn clear(&mut self) {
        self.lub.clear();
        self.glb.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
