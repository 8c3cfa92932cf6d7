//! The finite sub-lattice of primitive kinds.
//!
//! Built once from declared nodes and `sub <= sup` edges. Construction takes
//! the reflexive-transitive closure (Floyd–Warshall), rejects cycles and
//! precomputes the LUB and GLB of every pair. `Bottom` and `Top` are implicit
//! and never declared.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::error::LatticeConstructionError;

static STANDARD: Lazy<PrimitiveLattice> = Lazy::new(|| match LatticeBuilder::standard().build() {
    Ok(lattice) => lattice,
    Err(e) => panic!("standard primitive lattice is malformed: {}", e),
});

/// Result of a table lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bound {
    Bottom,
    Node(usize),
    Top,
}

/// Collects nodes and edges for a [`PrimitiveLattice`].
#[derive(Clone, Debug, Default)]
pub struct LatticeBuilder {
    nodes: Vec<PrimitiveKind>,
    edges: Vec<(PrimitiveKind, PrimitiveKind)>,
}

impl LatticeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the built-in kinds and their edges.
    pub fn standard() -> Self {
        use PrimitiveKind::*;
        let mut builder = Self::new();
        for kind in PrimitiveKind::BUILTIN {
            builder = builder.node(kind);
        }
        builder
            .edge(Boolean, String)
            .edge(UnsignedByte, Short)
            .edge(Short, Int)
            .edge(Short, Float)
            .edge(Int, Long)
            .edge(Int, Double)
            .edge(Float, Double)
            .edge(Long, Scalar)
            .edge(Double, Complex)
            .edge(Complex, Scalar)
            .edge(FixedPoint, Scalar)
            .edge(Scalar, String)
    }

    pub fn node(mut self, kind: PrimitiveKind) -> Self {
        self.nodes.push(kind);
        self
    }

    /// Assert `sub <= sup`
    pub fn edge(mut self, sub: PrimitiveKind, sup: PrimitiveKind) -> Self {
        self.edges.push((sub, sup));
        self
    }

    pub fn build(self) -> Result<PrimitiveLattice, LatticeConstructionError> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (i, kind) in self.nodes.iter().enumerate() {
            if index.insert(kind.clone(), i).is_some() {
                return Err(LatticeConstructionError::DuplicateNode(kind.to_string()));
            }
        }

        let n = self.nodes.len();
        let mut leq = vec![false; n * n];
        for i in 0..n {
            leq[i * n + i] = true;
        }
        for (sub, sup) in &self.edges {
            let lookup = |kind: &PrimitiveKind| {
                index
                    .get(kind)
                    .copied()
                    .ok_or_else(|| LatticeConstructionError::UndeclaredNode {
                        sub: sub.to_string(),
                        sup: sup.to_string(),
                        missing: kind.to_string(),
                    })
            };
            let (i, j) = (lookup(sub)?, lookup(sup)?);
            leq[i * n + j] = true;
        }

        // Floyd–Warshall transitive closure
        for k in 0..n {
            for i in 0..n {
                if !leq[i * n + k] {
                    continue;
                }
                for j in 0..n {
                    if leq[k * n + j] {
                        leq[i * n + j] = true;
                    }
                }
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if leq[i * n + j] && leq[j * n + i] {
                    return Err(LatticeConstructionError::Cycle(
                        self.nodes[i].to_string(),
                        self.nodes[j].to_string(),
                    ));
                }
            }
        }

        let mut lattice = PrimitiveLattice {
            nodes: self.nodes,
            index,
            leq,
            lub: vec![Bound::Top; n * n],
            glb: vec![Bound::Bottom; n * n],
        };
        for i in 0..n {
            for j in i..n {
                let lub = lattice.unique_bound(i, j, true)?;
                let glb = lattice.unique_bound(i, j, false)?;
                lattice.lub[i * n + j] = lub;
                lattice.lub[j * n + i] = lub;
                lattice.glb[i * n + j] = glb;
                lattice.glb[j * n + i] = glb;
            }
        }
        Ok(lattice)
    }
}

/// Closed, table-driven lattice over a finite set of primitive kinds.
#[derive(Clone, Debug)]
pub struct PrimitiveLattice {
    nodes: Vec<PrimitiveKind>,
    index: HashMap<PrimitiveKind, usize>,
    /// Row-major `n * n` reflexive-transitive closure
    leq: Vec<bool>,
    lub: Vec<Bound>,
    glb: Vec<Bound>,
}

impl PrimitiveLattice {
    /// The process-wide standard lattice, built on first use.
    pub fn standard() -> &'static PrimitiveLattice {
        &STANDARD
    }

    pub fn nodes(&self) -> &[PrimitiveKind] {
        &self.nodes
    }

    pub fn contains(&self, kind: &PrimitiveKind) -> bool {
        self.index.contains_key(kind)
    }

    /// Reflexive `a <= b`. Unregistered kinds are only below themselves.
    pub fn leq(&self, a: &PrimitiveKind, b: &PrimitiveKind) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&i), Some(&j)) => self.leq[i * self.nodes.len() + j],
            _ => a == b,
        }
    }

    pub fn least_upper_bound(&self, a: &PrimitiveKind, b: &PrimitiveKind) -> TypeDescriptor {
        self.lookup(a, b, &self.lub, TypeDescriptor::Top)
    }

    pub fn greatest_lower_bound(&self, a: &PrimitiveKind, b: &PrimitiveKind) -> TypeDescriptor {
        self.lookup(a, b, &self.glb, TypeDescriptor::Bottom)
    }

    fn lookup(
        &self,
        a: &PrimitiveKind,
        b: &PrimitiveKind,
        table: &[Bound],
        unrelated: TypeDescriptor,
    ) -> TypeDescriptor {
        if a == b {
            return TypeDescriptor::Primitive(a.clone());
        }
        match (self.index.get(a), self.index.get(b)) {
            (Some(&i), Some(&j)) => match table[i * self.nodes.len() + j] {
                Bound::Bottom => TypeDescriptor::Bottom,
                Bound::Top => TypeDescriptor::Top,
                Bound::Node(k) => TypeDescriptor::Primitive(self.nodes[k].clone()),
            },
            _ => unrelated,
        }
    }

    /// Unique least upper (or greatest lower) bound of nodes `i` and `j`.
    fn unique_bound(
        &self,
        i: usize,
        j: usize,
        upper: bool,
    ) -> Result<Bound, LatticeConstructionError> {
        let n = self.nodes.len();
        let below = |x: usize, y: usize| self.leq[x * n + y];
        let bounds: Vec<usize> = (0..n)
            .filter(|&k| {
                if upper {
                    below(i, k) && below(j, k)
                } else {
                    below(k, i) && below(k, j)
                }
            })
            .collect();
        // keep the bounds with no other bound strictly closer to the pair
        let extreme: Vec<usize> = bounds
            .iter()
            .copied()
            .filter(|&k| {
                !bounds
                    .iter()
                    .any(|&m| m != k && if upper { below(m, k) } else { below(k, m) })
            })
            .collect();
        match extreme.as_slice() {
            [] if upper => Ok(Bound::Top),
            [] => Ok(Bound::Bottom),
            [k] => Ok(Bound::Node(*k)),
            candidates => {
                let (a, b) = (self.nodes[i].to_string(), self.nodes[j].to_string());
                let candidates = candidates.iter().map(|&k| self.nodes[k].to_string()).collect();
                Err(if upper {
                    LatticeConstructionError::NoUniqueLub { a, b, candidates }
                } else {
                    LatticeConstructionError::NoUniqueGlb { a, b, candidates }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PrimitiveKind::*;

    fn lub(a: PrimitiveKind, b: PrimitiveKind) -> TypeDescriptor {
        PrimitiveLattice::standard().least_upper_bound(&a, &b)
    }

    fn glb(a: PrimitiveKind, b: PrimitiveKind) -> TypeDescriptor {
        PrimitiveLattice::standard().greatest_lower_bound(&a, &b)
    }

    #[test]
    fn test_standard_lattice_builds() {
        let lattice = PrimitiveLattice::standard();
        assert_eq!(lattice.nodes().len(), PrimitiveKind::BUILTIN.len());
        assert!(lattice.leq(&UnsignedByte, &String));
        assert!(lattice.leq(&Int, &Int));
        assert!(!lattice.leq(&Double, &Long));
    }

    #[test]
    fn test_standard_bounds() {
        assert_eq!(lub(Int, Double), TypeDescriptor::DOUBLE);
        assert_eq!(lub(Long, Double), TypeDescriptor::SCALAR);
        assert_eq!(lub(Int, Float), TypeDescriptor::DOUBLE);
        assert_eq!(lub(Boolean, Int), TypeDescriptor::STRING);
        assert_eq!(lub(Event, Int), TypeDescriptor::Top);
        assert_eq!(glb(Long, Double), TypeDescriptor::INT);
        assert_eq!(glb(Int, Float), TypeDescriptor::SHORT);
        assert_eq!(glb(Boolean, Int), TypeDescriptor::Bottom);
        assert_eq!(glb(String, Complex), TypeDescriptor::COMPLEX);
    }

    #[test]
    fn test_unregistered_named_kind() {
        let named = PrimitiveKind::named("Frame").unwrap();
        let lattice = PrimitiveLattice::standard();
        assert!(!lattice.contains(&named));
        assert_eq!(
            lattice.least_upper_bound(&named, &named),
            TypeDescriptor::Primitive(named.clone())
        );
        assert_eq!(lattice.least_upper_bound(&named, &Int), TypeDescriptor::Top);
        assert_eq!(lattice.greatest_lower_bound(&named, &Int), TypeDescriptor::Bottom);
    }

    #[test]
    fn test_named_kinds_extend_standard() {
        let frame = PrimitiveKind::named("Frame").unwrap();
        let lattice = LatticeBuilder::standard()
            .node(frame.clone())
            .edge(frame.clone(), String)
            .build()
            .unwrap();
        assert_eq!(lattice.least_upper_bound(&frame, &Int), TypeDescriptor::STRING);
    }

    #[test]
    fn test_rejects_cycle() {
        let err = LatticeBuilder::new()
            .node(Int)
            .node(Long)
            .edge(Int, Long)
            .edge(Long, Int)
            .build()
            .unwrap_err();
        assert_eq!(err, LatticeConstructionError::Cycle("int".into(), "long".into()));
    }

    #[test]
    fn test_rejects_undeclared_and_duplicate_nodes() {
        let err = LatticeBuilder::new().node(Int).edge(Int, Long).build().unwrap_err();
        assert!(matches!(
            err,
            LatticeConstructionError::UndeclaredNode { ref missing, .. } if missing == "long"
        ));

        let err = LatticeBuilder::new().node(Int).node(Int).build().unwrap_err();
        assert_eq!(err, LatticeConstructionError::DuplicateNode("int".into()));
    }

    #[test]
    fn test_rejects_non_lattice() {
        // int and short both sit below long and double, which are unrelated
        let err = LatticeBuilder::new()
            .node(Short)
            .node(Int)
            .node(Long)
            .node(Double)
            .edge(Short, Long)
            .edge(Short, Double)
            .edge(Int, Long)
            .edge(Int, Double)
            .build()
            .unwrap_err();
        match err {
            LatticeConstructionError::NoUniqueLub { a, b, candidates } => {
                assert_eq!((a.as_str(), b.as_str()), ("short", "int"));
                assert_eq!(candidates, vec!["long".to_string(), "double".to_string()]);
            }
            other => panic!("expected NoUniqueLub, got {:?}", other),
        }
    }
}
