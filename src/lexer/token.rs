//! The token shape the parser consumes.
//!
//! This mirrors the external tokenizer contract spec'd at the crate
//! boundary: `{ type, value, loc, opts? }`. `kind` plays the role of
//! `type`/`value` combined (Rust's enums let the payload live with the
//! discriminant); `loc` is always present.

use crate::ast::Loc;

/// A comment the lexer recognized but did not attach to any node.
#[derive(Clone, Debug, PartialEq)]
pub enum CommentText {
    /// A `;; ...` line comment, text excludes the leading `;;`.
    Line(String),
    /// A `(; ... ;)` block comment, text excludes the delimiters.
    Block(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    /// `$name`, sigil stripped.
    Identifier(String),
    /// A bare word recognized by the dispatch table (`module`, `func`,
    /// `then`, `mut`, ...).
    Keyword(String),
    /// `i32`, `i64`, `f32`, or `f64` used as a standalone token (as opposed
    /// to the prefix of a dotted opcode, which the lexer splits into
    /// `Valtype` + `Dot` + `Name`).
    Valtype(String),
    /// Any other bare word: opcode names, labels used as plain text, etc.
    Name(String),
    /// Raw string contents between the quotes, escapes not yet decoded.
    String(String),
    /// Raw numeric text, not yet decoded.
    Number(String),
    Dot,
    Equal,
    Comment(CommentText),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

impl Token {
    pub fn new(kind: TokenKind, loc: Loc) -> Self {
        Token { kind, loc }
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::OpenParen => "'('".to_string(),
            TokenKind::CloseParen => "')'".to_string(),
            TokenKind::Identifier(v) => format!("identifier '${v}'"),
            TokenKind::Keyword(v) => format!("keyword '{v}'"),
            TokenKind::Valtype(v) => format!("valtype '{v}'"),
            TokenKind::Name(v) => format!("'{v}'"),
            TokenKind::String(v) => format!("string \"{v}\""),
            TokenKind::Number(v) => format!("number '{v}'"),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Equal => "'='".to_string(),
            TokenKind::Comment(_) => "comment".to_string(),
        }
    }
}
