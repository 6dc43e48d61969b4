//! The parser's token cursor: the low-level primitives every form-specific
//! parse function is built from. Kept separate from the grammar-level code
//! in [`super::fields`]/[`super::instr`]/[`super::func`] so those read as
//! grammar, not token bookkeeping.

use crate::ast::{Identifier, Index, Limit, Loc, NumberLiteral, ReferenceType, UniqueNameGenerator, ValueType};
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};
use crate::parser::numbers;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    pub(super) source: &'a str,
    pub(super) names: UniqueNameGenerator,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &[Token], source: &'a str) -> Self {
        let tokens = tokens
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Comment(_)))
            .cloned()
            .collect();

        Parser {
            tokens,
            pos: 0,
            source,
            names: UniqueNameGenerator::new(),
        }
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    pub fn peek_at_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    pub fn loc_here(&self) -> Option<Loc> {
        self.peek().map(|t| t.loc)
    }

    pub fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.source, self.loc_here(), message.into())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = self
            .peek()
            .map(|t| t.describe())
            .unwrap_or_else(|| "end of input".to_string());
        self.error(format!("expected {expected}, found {found}"))
    }

    pub fn at_open_paren(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::OpenParen))
    }

    pub fn at_close_paren(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::CloseParen))
    }

    pub fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Keyword(k)) if k == keyword)
    }

    /// `(` followed immediately by the given keyword, without consuming
    /// either token — used to look one form ahead (`(then`, `(else`, ...).
    pub fn at_open_paren_keyword(&self, keyword: &str) -> bool {
        self.at_open_paren() && matches!(self.peek_at_kind(1), Some(TokenKind::Keyword(k)) if k == keyword)
    }

    pub fn expect_open_paren(&mut self) -> Result<Loc, ParseError> {
        if !self.at_open_paren() {
            return Err(self.unexpected("'('"));
        }
        let loc = self.loc_here().expect("checked by at_open_paren");
        self.bump();
        Ok(loc)
    }

    pub fn expect_close_paren(&mut self) -> Result<Loc, ParseError> {
        if !self.at_close_paren() {
            return Err(self.unexpected("')'"));
        }
        let loc = self.loc_here().expect("checked by at_close_paren");
        self.bump();
        Ok(loc)
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Result<Loc, ParseError> {
        if !self.at_keyword(keyword) {
            return Err(self.unexpected(&format!("keyword '{keyword}'")));
        }
        let loc = self.loc_here().expect("checked by at_keyword");
        self.bump();
        Ok(loc)
    }

    /// Consumes `$name` if present, returning the identifier.
    pub fn eat_identifier(&mut self) -> Option<Identifier> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(value)) => {
                let value = value.clone();
                let loc = self.loc_here();
                self.bump();
                Some(Identifier::named(value, loc))
            }
            _ => None,
        }
    }

    /// Consumes `$name` if present, otherwise draws the next generated name
    /// for `kind` (`"func_0"`, `"block_0"`, ...).
    pub fn identifier_or_generated(&mut self, kind: &'static str) -> Identifier {
        self.eat_identifier()
            .unwrap_or_else(|| self.names.generate(kind))
    }

    pub fn expect_string(&mut self) -> Result<(String, Loc), ParseError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::String(raw)) => {
                let loc = self.loc_here().expect("token present");
                self.bump();
                Ok((raw, loc))
            }
            _ => Err(self.unexpected("a string literal")),
        }
    }

    pub fn expect_raw_number(&mut self) -> Result<(String, Loc), ParseError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Number(raw)) => {
                let loc = self.loc_here().expect("token present");
                self.bump();
                Ok((raw, loc))
            }
            _ => Err(self.unexpected("a number")),
        }
    }

    pub fn expect_number_literal(&mut self) -> Result<NumberLiteral, ParseError> {
        let (raw, loc) = self.expect_raw_number()?;
        let value = numbers::decode(&raw).map_err(|e| ParseError::syntax(self.source, Some(loc), e.0))?;
        Ok(NumberLiteral::new(value, raw, Some(loc)))
    }

    pub fn expect_u32(&mut self) -> Result<u32, ParseError> {
        let (raw, loc) = self.expect_raw_number()?;
        numbers::parse32i(&raw)
            .map(|v| v as u32)
            .map_err(|e| ParseError::syntax(self.source, Some(loc), e.0))
    }

    pub fn expect_valtype(&mut self) -> Result<(ValueType, Loc), ParseError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Valtype(name)) => {
                let loc = self.loc_here().expect("token present");
                self.bump();
                ValueType::parse(&name)
                    .map(|ty| (ty, loc))
                    .ok_or_else(|| self.error(format!("'{name}' is not a valtype")))
            }
            _ => Err(self.unexpected("a valtype")),
        }
    }

    pub fn expect_reference_type(&mut self) -> Result<ReferenceType, ParseError> {
        if self.at_keyword("anyfunc") || self.at_keyword("funcref") {
            self.bump();
            Ok(ReferenceType::AnyFunc)
        } else {
            Err(self.unexpected("'anyfunc' or 'funcref'"))
        }
    }

    pub fn parse_limit(&mut self) -> Result<Limit, ParseError> {
        let min = self.expect_u32()?;
        let max = if matches!(self.peek_kind(), Some(TokenKind::Number(_))) {
            Some(self.expect_u32()?)
        } else {
            None
        };
        Ok(Limit::new(min, max))
    }

    /// Reads an `Index`: `$name` or a bare numeral.
    pub fn parse_index(&mut self) -> Result<Index, ParseError> {
        if let Some(id) = self.eat_identifier() {
            return Ok(Index::Id(id));
        }
        let literal = self.expect_number_literal()?;
        Ok(Index::Num(literal))
    }
}
