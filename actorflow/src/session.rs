//! Per-session state shared by models, solvers and directors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use actorflow_types::TypeLattice;

use crate::config::KernelConfig;
use crate::solver::{ConstraintSolver, Solution};

/// Owns the type lattice and configuration, and counts topology changes so
/// stale solutions can be detected.
#[derive(Debug)]
pub struct Session {
    lattice: Arc<TypeLattice>,
    config: KernelConfig,
    version: AtomicU64,
}

impl Session {
    pub fn new(lattice: TypeLattice, config: KernelConfig) -> Self {
        Self {
            lattice: Arc::new(lattice),
            config,
            version: AtomicU64::new(0),
        }
    }

    /// Standard lattice with the given configuration
    pub fn with_config(config: KernelConfig) -> Self {
        Self::new(TypeLattice::standard(), config)
    }

    pub fn standard() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn lattice(&self) -> &Arc<TypeLattice> {
        &self.lattice
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Record a topology change; returns the new version.
    pub fn bump_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Fresh solver stamped with the current version
    pub fn solver(&self) -> ConstraintSolver {
        ConstraintSolver::with_version(
            Arc::clone(&self.lattice),
            self.config.solver.clone(),
            self.version(),
        )
    }

    /// Whether `solution` was computed against the current topology
    pub fn is_current(&self, solution: &Solution) -> bool {
        solution.version == self.version()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::standard()
    }
}
