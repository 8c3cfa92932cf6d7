//! Non-fatal solver diagnostics.
//!
//! Collected into each [`super::Solution`] instead of global state, and
//! mirrored to the `log` facade as they are produced.

use std::fmt;

use actorflow_types::TypeDescriptor;
use serde::Serialize;

/// Reason for a solver diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticReason {
    /// Propagation stopped at the iteration limit without reaching a fixed
    /// point. Contains the number of passes run.
    FixedPointDivergence(usize),

    /// No bound carried information; the declared default was used.
    DefaultApplied(TypeDescriptor),

    /// No bound carried information and there was no default.
    Unconstrained,
}

impl fmt::Display for DiagnosticReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticReason::FixedPointDivergence(iterations) => write!(
                f,
                "constraint propagation didn't converge after {} iterations",
                iterations
            ),
            DiagnosticReason::DefaultApplied(ty) => {
                write!(f, "resolved to declared default {}", ty)
            }
            DiagnosticReason::Unconstrained => write!(f, "unconstrained, resolved to top"),
        }
    }
}

/// A single solver diagnostic (warning).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SolverDiagnostic {
    pub reason: DiagnosticReason,
    /// Variable name the diagnostic is about, if any
    pub context: Option<String>,
}

impl SolverDiagnostic {
    pub fn new(reason: DiagnosticReason) -> Self {
        Self {
            reason,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for SolverDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type solver warning: {}", self.reason)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({})", ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = SolverDiagnostic::new(DiagnosticReason::DefaultApplied(TypeDescriptor::INT))
            .with_context("portA");
        assert_eq!(
            d.to_string(),
            "type solver warning: resolved to declared default int (portA)"
        );
        let d = SolverDiagnostic::new(DiagnosticReason::FixedPointDivergence(100));
        assert_eq!(
            d.to_string(),
            "type solver warning: constraint propagation didn't converge after 100 iterations"
        );
    }
}
