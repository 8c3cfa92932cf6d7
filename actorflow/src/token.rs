//! Data tokens carried between actors.

use std::fmt;

use actorflow_types::{is_valid_label, PrimitiveKind, TypeDescriptor, TypeLattice};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("duplicate record label '{0}'")]
    DuplicateLabel(String),

    #[error("invalid record label '{0}'")]
    InvalidLabel(String),
}

/// Labelled token fields; labels are valid identifiers, unique, and kept in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, Token)>", into = "Vec<(String, Token)>")]
pub struct RecordToken(Vec<(String, Token)>);

impl RecordToken {
    pub fn new<I, S>(fields: I) -> Result<Self, TokenError>
    where
        I: IntoIterator<Item = (S, Token)>,
        S: Into<String>,
    {
        let mut out: Vec<(String, Token)> = Vec::new();
        for (label, token) in fields {
            let label = label.into();
            if !is_valid_label(&label) {
                return Err(TokenError::InvalidLabel(label));
            }
            if out.iter().any(|(existing, _)| *existing == label) {
                return Err(TokenError::DuplicateLabel(label));
            }
            out.push((label, token));
        }
        Ok(Self(out))
    }

    pub fn get(&self, label: &str) -> Option<&Token> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Token)> {
        self.0.iter().map(|(l, t)| (l.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<(String, Token)>> for RecordToken {
    type Error = TokenError;

    fn try_from(fields: Vec<(String, Token)>) -> Result<Self, Self::Error> {
        RecordToken::new(fields)
    }
}

impl From<RecordToken> for Vec<(String, Token)> {
    fn from(record: RecordToken) -> Self {
        record.0
    }
}

/// A value flowing through a mailbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Boolean(bool),
    UnsignedByte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Array(Vec<Token>),
    Record(RecordToken),
    /// Pure event without a value
    Event,
}

impl Token {
    /// Type of this token. An array's element type is the LUB of its
    /// elements; an empty array has element type `bottom`.
    pub fn descriptor(&self, lattice: &TypeLattice) -> TypeDescriptor {
        match self {
            Token::Boolean(_) => TypeDescriptor::BOOLEAN,
            Token::UnsignedByte(_) => TypeDescriptor::UNSIGNED_BYTE,
            Token::Short(_) => TypeDescriptor::SHORT,
            Token::Int(_) => TypeDescriptor::INT,
            Token::Long(_) => TypeDescriptor::LONG,
            Token::Float(_) => TypeDescriptor::FLOAT,
            Token::Double(_) => TypeDescriptor::DOUBLE,
            Token::String(_) => TypeDescriptor::STRING,
            Token::Event => TypeDescriptor::EVENT,
            Token::Array(elements) => {
                let element = elements
                    .iter()
                    .fold(TypeDescriptor::Bottom, |acc, token| {
                        lattice.least_upper_bound(&acc, &token.descriptor(lattice))
                    });
                TypeDescriptor::array(element)
            }
            Token::Record(record) => {
                let fields = record
                    .iter()
                    .map(|(label, token)| (label, token.descriptor(lattice)));
                // labels were validated when the record token was built
                TypeDescriptor::record(fields).unwrap_or(TypeDescriptor::Top)
            }
        }
    }

    /// Convert to `target` without losing information.
    ///
    /// Returns `None` when the token's type is not below `target` or no
    /// lossless conversion exists.
    pub fn convert_to(&self, target: &TypeDescriptor, lattice: &TypeLattice) -> Option<Token> {
        let own = self.descriptor(lattice);
        if own == *target {
            return Some(self.clone());
        }
        if !lattice.is_subtype(&own, target) {
            return None;
        }
        match (self, target) {
            (Token::Array(elements), TypeDescriptor::Array(element)) => elements
                .iter()
                .map(|token| token.convert_to(element, lattice))
                .collect::<Option<Vec<_>>>()
                .map(Token::Array),
            (Token::Record(record), TypeDescriptor::Record(fields)) => {
                let converted = fields
                    .iter()
                    .map(|(label, ty)| {
                        let token = record.get(label)?.convert_to(ty, lattice)?;
                        Some((label.to_string(), token))
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(Token::Record(RecordToken(converted)))
            }
            (_, TypeDescriptor::Primitive(kind)) => self.widen(kind),
            // No token representation; the value is carried as is.
            _ => Some(self.clone()),
        }
    }

    fn widen(&self, kind: &PrimitiveKind) -> Option<Token> {
        use PrimitiveKind as K;
        let widened = match (self, kind) {
            (Token::UnsignedByte(v), K::Short) => Token::Short(i16::from(*v)),
            (Token::UnsignedByte(v), K::Int) => Token::Int(i32::from(*v)),
            (Token::UnsignedByte(v), K::Long) => Token::Long(i64::from(*v)),
            (Token::UnsignedByte(v), K::Float) => Token::Float(f32::from(*v)),
            (Token::UnsignedByte(v), K::Double) => Token::Double(f64::from(*v)),
            (Token::Short(v), K::Int) => Token::Int(i32::from(*v)),
            (Token::Short(v), K::Long) => Token::Long(i64::from(*v)),
            (Token::Short(v), K::Float) => Token::Float(f32::from(*v)),
            (Token::Short(v), K::Double) => Token::Double(f64::from(*v)),
            (Token::Int(v), K::Long) => Token::Long(i64::from(*v)),
            (Token::Int(v), K::Double) => Token::Double(f64::from(*v)),
            (Token::Float(v), K::Double) => Token::Double(f64::from(*v)),
            (Token::Boolean(v), K::String) => Token::String(v.to_string()),
            (Token::UnsignedByte(v), K::String) => Token::String(v.to_string()),
            (Token::Short(v), K::String) => Token::String(v.to_string()),
            (Token::Int(v), K::String) => Token::String(v.to_string()),
            (Token::Long(v), K::String) => Token::String(v.to_string()),
            (Token::Float(v), K::String) => Token::String(v.to_string()),
            (Token::Double(v), K::String) => Token::String(v.to_string()),
            // complex, fixed point, scalar and domain types have no token of
            // their own
            (token, K::Complex | K::FixedPoint | K::Scalar | K::Named(_)) => token.clone(),
            _ => return None,
        };
        Some(widened)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value of any integral token
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Token::UnsignedByte(v) => Some(i64::from(*v)),
            Token::Short(v) => Some(i64::from(*v)),
            Token::Int(v) => Some(i64::from(*v)),
            Token::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating value of any numeric token that converts losslessly
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Token::UnsignedByte(v) => Some(f64::from(*v)),
            Token::Short(v) => Some(f64::from(*v)),
            Token::Int(v) => Some(f64::from(*v)),
            Token::Float(v) => Some(f64::from(*v)),
            Token::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Boolean(v) => write!(f, "{}", v),
            Token::UnsignedByte(v) => write!(f, "{}ub", v),
            Token::Short(v) => write!(f, "{}s", v),
            Token::Int(v) => write!(f, "{}", v),
            Token::Long(v) => write!(f, "{}L", v),
            Token::Float(v) => write!(f, "{}f", v),
            Token::Double(v) => write!(f, "{:?}", v),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Array(elements) => {
                write!(f, "{{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "}}")
            }
            Token::Record(record) => {
                write!(f, "{{")?;
                for (i, (label, token)) in record.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", label, token)?;
                }
                write!(f, "}}")
            }
            Token::Event => write!(f, "present"),
        }
    }
}

impl From<bool> for Token {
    fn from(v: bool) -> Self {
        Token::Boolean(v)
    }
}

impl From<i32> for Token {
    fn from(v: i32) -> Self {
        Token::Int(v)
    }
}

impl From<i64> for Token {
    fn from(v: i64) -> Self {
        Token::Long(v)
    }
}

impl From<f64> for Token {
    fn from(v: f64) -> Self {
        Token::Double(v)
    }
}

impl From<&str> for Token {
    fn from(v: &str) -> Self {
        Token::String(v.to_string())
    }
}

impl From<String> for Token {
    fn from(v: String) -> Self {
        Token::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn lattice() -> TypeLattice {
        TypeLattice::standard()
    }

    #[test]
    fn test_descriptor() {
        let lattice = lattice();
        assert_eq!(Token::Int(3).descriptor(&lattice), TypeDescriptor::INT);
        assert_eq!(
            Token::Array(vec![Token::Int(1), Token::Double(2.0)]).descriptor(&lattice),
            TypeDescriptor::array(TypeDescriptor::DOUBLE)
        );
        assert_eq!(
            Token::Array(vec![]).descriptor(&lattice),
            TypeDescriptor::array(TypeDescriptor::Bottom)
        );
        let record = RecordToken::new([("x", Token::Int(1)), ("name", Token::from("a"))]).unwrap();
        assert_eq!(
            Token::Record(record).descriptor(&lattice),
            TypeDescriptor::record([("x", TypeDescriptor::INT), ("name", TypeDescriptor::STRING)])
                .unwrap()
        );
    }

    #[test]
    fn test_lossless_widening() {
        let lattice = lattice();
        assert_eq!(
            Token::Int(7).convert_to(&TypeDescriptor::DOUBLE, &lattice),
            Some(Token::Double(7.0))
        );
        assert_eq!(
            Token::UnsignedByte(200).convert_to(&TypeDescriptor::SHORT, &lattice),
            Some(Token::Short(200))
        );
        assert_eq!(
            Token::Int(7).convert_to(&TypeDescriptor::STRING, &lattice),
            Some(Token::String("7".to_string()))
        );
        assert_eq!(
            Token::Int(7).convert_to(&TypeDescriptor::SCALAR, &lattice),
            Some(Token::Int(7))
        );
        assert_eq!(
            Token::Int(7).convert_to(&TypeDescriptor::Top, &lattice),
            Some(Token::Int(7))
        );
    }

    #[test]
    fn test_narrowing_is_refused() {
        let lattice = lattice();
        assert_eq!(Token::Double(1.0).convert_to(&TypeDescriptor::INT, &lattice), None);
        assert_eq!(Token::Long(1).convert_to(&TypeDescriptor::DOUBLE, &lattice), None);
        assert_eq!(Token::from("1").convert_to(&TypeDescriptor::INT, &lattice), None);
    }

    #[test]
    fn test_structured_conversion() {
        let lattice = lattice();
        let array = Token::Array(vec![Token::Short(1), Token::Int(2)]);
        assert_eq!(
            array.convert_to(&TypeDescriptor::array(TypeDescriptor::LONG), &lattice),
            Some(Token::Array(vec![Token::Long(1), Token::Long(2)]))
        );

        let record = Token::Record(
            RecordToken::new([("x", Token::Int(1)), ("y", Token::from("keep?"))]).unwrap(),
        );
        let target = TypeDescriptor::record([("x", TypeDescriptor::DOUBLE)]).unwrap();
        assert_eq!(
            record.convert_to(&target, &lattice),
            Some(Token::Record(
                RecordToken::new([("x", Token::Double(1.0))]).unwrap()
            ))
        );
    }

    #[test]
    fn test_record_token_validation() {
        assert_eq!(
            RecordToken::new([("x", Token::Int(1)), ("x", Token::Int(2))]).unwrap_err(),
            TokenError::DuplicateLabel("x".to_string())
        );
        assert_eq!(
            RecordToken::new([("1x", Token::Int(1))]).unwrap_err(),
            TokenError::InvalidLabel("1x".to_string())
        );
    }

    #[test]
    fn test_display() {
        let record = RecordToken::new([("a", Token::Int(1)), ("b", Token::Double(2.5))]).unwrap();
        assert_snapshot!(Token::Record(record).to_string(), @"{a = 1, b = 2.5}");
        assert_snapshot!(
            Token::Array(vec![Token::Short(1), Token::Long(2), Token::Boolean(true)]).to_string(),
            @"{1s, 2L, true}"
        );
        assert_snapshot!(Token::Event.to_string(), @"present");
    }
}
