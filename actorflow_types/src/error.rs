//! Error types for type construction, parsing and lattice construction

use crate::span::Span;
use thiserror::Error;

/// A structurally invalid type was requested.
///
/// Construction is rejected as a whole; no partially built descriptor escapes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedTypeError {
    /// Two record fields share a label
    #[error("duplicate record field '{label}'")]
    DuplicateField { label: String },

    /// Record label is not an identifier
    #[error("invalid record field label '{label}'")]
    InvalidLabel { label: String },

    /// Class or domain name is empty or contains quote/backslash characters
    #[error("invalid {what} name '{name}'")]
    InvalidName { what: &'static str, name: String },
}

impl MalformedTypeError {
    pub(crate) fn invalid_name(what: &'static str, name: impl Into<String>) -> Self {
        MalformedTypeError::InvalidName {
            what,
            name: name.into(),
        }
    }
}

/// Error reading the canonical textual form of a type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseTypeError {
    /// Unexpected token
    #[error("unexpected token '{found}' at {span}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        span: Span,
    },

    /// Unexpected end of input
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    /// Unknown type keyword
    #[error("unknown type name '{name}' at {span}")]
    UnknownName { name: String, span: Span },

    /// Input did not lex
    #[error("unrecognized input at {span}")]
    Lexer { span: Span },

    /// Integer literal out of range
    #[error("invalid type variable id '{literal}' at {span}")]
    InvalidId { literal: String, span: Span },

    /// Nesting exceeds the parser's depth limit
    #[error("type nested deeper than {limit} levels at {span}")]
    TooDeep { limit: usize, span: Span },

    /// The text parsed, but describes a malformed type
    #[error(transparent)]
    Malformed(#[from] MalformedTypeError),
}

impl ParseTypeError {
    pub(crate) fn unexpected_token(
        found: impl Into<String>,
        expected: impl Into<String>,
        span: Span,
    ) -> Self {
        ParseTypeError::UnexpectedToken {
            found: found.into(),
            expected: expected.into(),
            span,
        }
    }

    pub(crate) fn unexpected_eof(expected: impl Into<String>) -> Self {
        ParseTypeError::UnexpectedEof {
            expected: expected.into(),
        }
    }

    /// Get the span of the error, if it has one
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseTypeError::UnexpectedToken { span, .. }
            | ParseTypeError::UnknownName { span, .. }
            | ParseTypeError::Lexer { span }
            | ParseTypeError::InvalidId { span, .. }
            | ParseTypeError::TooDeep { span, .. } => Some(*span),
            ParseTypeError::UnexpectedEof { .. } | ParseTypeError::Malformed(_) => None,
        }
    }
}

/// The asserted finite sub-lattice is not a lattice.
///
/// Raised only while building a [`crate::PrimitiveLattice`]; never at query time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatticeConstructionError {
    /// An edge names a node that was never declared
    #[error("edge {sub} <= {sup} references undeclared node '{missing}'")]
    UndeclaredNode {
        sub: String,
        sup: String,
        missing: String,
    },

    /// The same node was declared twice
    #[error("node '{0}' declared twice")]
    DuplicateNode(String),

    /// Two distinct nodes are each below the other
    #[error("cycle between '{0}' and '{1}'")]
    Cycle(String, String),

    /// A pair has zero or several minimal upper bounds
    #[error("'{a}' and '{b}' have no unique least upper bound (candidates: {candidates:?})")]
    NoUniqueLub {
        a: String,
        b: String,
        candidates: Vec<String>,
    },

    /// A pair has zero or several maximal lower bounds
    #[error("'{a}' and '{b}' have no unique greatest lower bound (candidates: {candidates:?})")]
    NoUniqueGlb {
        a: String,
        b: String,
        candidates: Vec<String>,
    },
}

/// Invalid class hierarchy registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// Class registered twice
    #[error("class '{0}' is already registered")]
    DuplicateClass(String),

    /// Parent must be registered before its children
    #[error("parent class '{parent}' of '{class}' is not registered")]
    UnknownParent { class: String, parent: String },

    /// Class name cannot be carried by an object type
    #[error(transparent)]
    Malformed(#[from] MalformedTypeError),
}

/// Result type for type parsing
pub type ParseResult<T> = Result<T, ParseTypeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MalformedTypeError::DuplicateField {
            label: "x".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate record field 'x'");

        let err = ParseTypeError::unexpected_token(")", "a type", Span::new(4, 5));
        assert_eq!(err.to_string(), "unexpected token ')' at 4..5, expected a type");
        assert_eq!(err.span(), Some(Span::new(4, 5)));

        let err = LatticeConstructionError::Cycle("int".into(), "long".into());
        assert_eq!(err.to_string(), "cycle between 'int' and 'long'");
    }

    #[test]
    fn test_malformed_converts_into_parse_error() {
        let err: ParseTypeError = MalformedTypeError::invalid_name("class", "").into();
        assert!(err.span().is_none());
        assert_eq!(err.to_string(), "invalid class name ''");
    }
}
