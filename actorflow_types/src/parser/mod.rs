//! Recursive descent parser for the canonical type syntax
//!
//! ```text
//! type := "bottom" | "top" | primitive | "domain(" NAME ")"
//!       | "array(" type ")"
//!       | "{" [ IDENT "=" type { "," IDENT "=" type } ] "}"
//!       | "function(" [ type { "," type } ] ")" "->" type
//!       | "object(" ( "null" | "impossible" | NAME ) ")"
//!       | "unknown(" INT ")"
//! ```

use std::str::FromStr;

use crate::descriptor::{ObjectClass, PrimitiveKind, TypeDescriptor, TypeName, TypeVarId};
use crate::error::{ParseResult, ParseTypeError};
use crate::lexer::{Lexer, SpannedToken};
use crate::token::Token;

/// Parse a complete type string.
///
/// # Example
///
/// ```
/// use actorflow_types::{parse_type, TypeDescriptor};
///
/// let ty = parse_type("array(double)").unwrap();
/// assert_eq!(ty, TypeDescriptor::array(TypeDescriptor::DOUBLE));
/// ```
pub fn parse_type(source: &str) -> ParseResult<TypeDescriptor> {
    let mut parser = TypeParser::new(source);
    let ty = parser.parse_type()?;
    parser.expect_end()?;
    Ok(ty)
}

impl TypeDescriptor {
    /// Parse the canonical textual form
    pub fn parse(source: &str) -> ParseResult<Self> {
        parse_type(source)
    }
}

impl FromStr for TypeDescriptor {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s)
    }
}

/// Deepest nesting of arrays, records and functions the parser accepts
pub const MAX_NESTING_DEPTH: usize = 256;

/// Type syntax parser
#[derive(Debug)]
pub struct TypeParser<'a> {
    lexer: Lexer<'a>,
    depth: usize,
}

impl<'a> TypeParser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            depth: 0,
        }
    }

    /// Parse one type, leaving any trailing input in place
    pub fn parse_type(&mut self) -> ParseResult<TypeDescriptor> {
        let tok = self.bump("a type")?;
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseTypeError::TooDeep {
                limit: MAX_NESTING_DEPTH,
                span: tok.span,
            });
        }
        self.depth += 1;
        let result = match tok.token {
            Token::Identifier => self.parse_named(tok),
            Token::LBrace => self.parse_record_rest(),
            _ => Err(ParseTypeError::unexpected_token(tok.text, "a type", tok.span)),
        };
        self.depth -= 1;
        result
    }

    /// Fail unless all input was consumed
    pub fn expect_end(&mut self) -> ParseResult<()> {
        match self.lexer.next_token() {
            None => Ok(()),
            Some(Err(e)) => Err(e),
            Some(Ok(tok)) => Err(ParseTypeError::unexpected_token(
                tok.text,
                "end of input",
                tok.span,
            )),
        }
    }

    fn parse_named(&mut self, tok: SpannedToken<'a>) -> ParseResult<TypeDescriptor> {
        match tok.text {
            "bottom" => Ok(TypeDescriptor::Bottom),
            "top" => Ok(TypeDescriptor::Top),
            "array" => {
                self.expect(Token::LParen)?;
                let element = self.parse_type()?;
                self.expect(Token::RParen)?;
                Ok(TypeDescriptor::array(element))
            }
            "function" => self.parse_function_rest(),
            "object" => self.parse_object_rest(),
            "domain" => {
                self.expect(Token::LParen)?;
                let name = self.expect(Token::QuotedName)?;
                self.expect(Token::RParen)?;
                let kind = PrimitiveKind::Named(TypeName::validated("domain", unquote(name.text))?);
                Ok(TypeDescriptor::Primitive(kind))
            }
            "unknown" => {
                self.expect(Token::LParen)?;
                let literal = self.expect(Token::Integer)?;
                self.expect(Token::RParen)?;
                let id = literal
                    .text
                    .parse::<u32>()
                    .map_err(|_| ParseTypeError::InvalidId {
                        literal: literal.text.to_string(),
                        span: literal.span,
                    })?;
                Ok(TypeDescriptor::Unknown(TypeVarId(id)))
            }
            keyword => match PrimitiveKind::from_keyword(keyword) {
                Some(kind) => Ok(TypeDescriptor::Primitive(kind)),
                None => Err(ParseTypeError::UnknownName {
                    name: keyword.to_string(),
                    span: tok.span,
                }),
            },
        }
    }

    /// After `function`
    fn parse_function_rest(&mut self) -> ParseResult<TypeDescriptor> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if !self.eat(Token::RParen)? {
            loop {
                args.push(self.parse_type()?);
                let sep = self.bump("',' or ')'")?;
                match sep.token {
                    Token::Comma => continue,
                    Token::RParen => break,
                    _ => {
                        return Err(ParseTypeError::unexpected_token(
                            sep.text,
                            "',' or ')'",
                            sep.span,
                        ))
                    }
                }
            }
        }
        self.expect(Token::Arrow)?;
        let ret = self.parse_type()?;
        Ok(TypeDescriptor::function(args, ret))
    }

    /// After `object`
    fn parse_object_rest(&mut self) -> ParseResult<TypeDescriptor> {
        self.expect(Token::LParen)?;
        let tok = self.bump("a class name, 'null' or 'impossible'")?;
        let class = match (tok.token, tok.text) {
            (Token::Identifier, "null") => ObjectClass::Unconstrained,
            (Token::Identifier, "impossible") => ObjectClass::Impossible,
            (Token::QuotedName, text) => {
                ObjectClass::Class(TypeName::validated("class", unquote(text))?)
            }
            _ => {
                return Err(ParseTypeError::unexpected_token(
                    tok.text,
                    "a class name, 'null' or 'impossible'",
                    tok.span,
                ))
            }
        };
        self.expect(Token::RParen)?;
        Ok(TypeDescriptor::Object(class))
    }

    /// After `{`
    fn parse_record_rest(&mut self) -> ParseResult<TypeDescriptor> {
        let mut fields = Vec::new();
        if !self.eat(Token::RBrace)? {
            loop {
                let label = self.expect(Token::Identifier)?;
                self.expect(Token::Equals)?;
                let ty = self.parse_type()?;
                fields.push((label.text.to_string(), ty));
                let sep = self.bump("',' or '}'")?;
                match sep.token {
                    Token::Comma => continue,
                    Token::RBrace => break,
                    _ => {
                        return Err(ParseTypeError::unexpected_token(
                            sep.text,
                            "',' or '}'",
                            sep.span,
                        ))
                    }
                }
            }
        }
        Ok(TypeDescriptor::record(fields)?)
    }

    // ==================== Token helpers ====================

    fn bump(&mut self, expected: &str) -> ParseResult<SpannedToken<'a>> {
        match self.lexer.next_token() {
            Some(result) => result,
            None => Err(ParseTypeError::unexpected_eof(expected)),
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<SpannedToken<'a>> {
        let tok = self.bump(token.describe())?;
        if tok.token == token {
            Ok(tok)
        } else {
            Err(ParseTypeError::unexpected_token(
                tok.text,
                token.describe(),
                tok.span,
            ))
        }
    }

    /// Consume the next token if it is `token`
    fn eat(&mut self, token: Token) -> ParseResult<bool> {
        match self.lexer.peek() {
            Some(Ok(tok)) if tok.token == token => {
                self.lexer.next_token();
                Ok(true)
            }
            Some(Err(e)) => Err(e.clone()),
            _ => Ok(false),
        }
    }
}

fn unquote(text: &str) -> String {
    // the lexer guarantees surrounding quotes and none inside
    text[1..text.len() - 1].to_string()
}
