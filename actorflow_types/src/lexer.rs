//! Lexer for the canonical type syntax
//!
//! Wraps the logos-generated lexer with one token of lookahead and span
//! tracking.

use logos::Logos;

use crate::error::{ParseResult, ParseTypeError};
use crate::span::Span;
use crate::token::Token;

/// A token with its span
#[derive(Debug, Clone, Copy)]
pub struct SpannedToken<'a> {
    pub token: Token,
    pub span: Span,
    pub text: &'a str,
}

/// Type syntax lexer
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, Token>,
    peeked: Option<ParseResult<SpannedToken<'a>>>,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("source", &self.source)
            .field("peeked", &self.peeked)
            .finish_non_exhaustive()
    }
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    /// Get the source text
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Peek at the next token without consuming it
    pub fn peek(&mut self) -> Option<&ParseResult<SpannedToken<'a>>> {
        if self.peeked.is_none() {
            self.peeked = self.next_token_internal();
        }
        self.peeked.as_ref()
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Option<ParseResult<SpannedToken<'a>>> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }
        self.next_token_internal()
    }

    fn next_token_internal(&mut self) -> Option<ParseResult<SpannedToken<'a>>> {
        let result = self.inner.next()?;
        let range = self.inner.span();
        let span = Span::new(range.start, range.end);
        match result {
            Ok(token) => Some(Ok(SpannedToken {
                token,
                span,
                text: &self.source[range],
            })),
            Err(()) => Some(Err(ParseTypeError::Lexer { span })),
        }
    }
}
