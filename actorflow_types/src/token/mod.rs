//! Token definitions for the canonical type syntax
//!
//! Keywords (`array`, `object`, `int`, ...) lex as plain identifiers and are
//! recognized by the parser, so record labels may reuse them.

use logos::Logos;
use std::fmt;

/// Type syntax tokens
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // ==================== Delimiters ====================
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    // ==================== Punctuation ====================
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token("->")]
    Arrow,

    // ==================== Atoms ====================
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r"[0-9]+")]
    Integer,
    /// Quoted name; escapes are not part of the syntax
    #[regex(r#""[^"\\]*""#)]
    QuotedName,
}

impl Token {
    /// Human-readable name used in "expected ..." diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::LBrace => "'{'",
            Token::RBrace => "'}'",
            Token::Comma => "','",
            Token::Equals => "'='",
            Token::Arrow => "'->'",
            Token::Identifier => "identifier",
            Token::Integer => "integer",
            Token::QuotedName => "quoted name",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
