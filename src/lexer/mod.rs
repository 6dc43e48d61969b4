//! Source text -> token stream.
//!
//! spec.md treats the tokenizer as an external collaborator and only
//! describes the shape of token it must deliver (see [`token`]). This
//! module is the first-party producer of that shape, so the crate can be
//! driven directly from WAT source rather than requiring callers to hand
//! construct a token vector.

pub mod token;

pub use token::{CommentText, Token, TokenKind};

use crate::ast::{Loc, Position};
use crate::error::ParseError;

const KEYWORDS: &[&str] = &[
    "module", "func", "param", "result", "export", "import", "memory", "data", "table", "elem",
    "global", "type", "start", "block", "loop", "if", "then", "else", "mut", "funcref", "anyfunc",
    "declare", "binary", "quote",
];

/// Tokenizes `source`, a complete WAT/WAST text-format document.
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.advance();
                }
                b'(' if self.peek_at(1) == Some(b';') => {
                    tokens.push(self.lex_block_comment()?);
                }
                b'(' => {
                    let start = self.position();
                    self.advance();
                    tokens.push(Token::new(TokenKind::OpenParen, self.loc_from(start)));
                }
                b')' => {
                    let start = self.position();
                    self.advance();
                    tokens.push(Token::new(TokenKind::CloseParen, self.loc_from(start)));
                }
                b';' if self.peek_at(1) == Some(b';') => {
                    tokens.push(self.lex_line_comment());
                }
                b'"' => {
                    tokens.push(self.lex_string()?);
                }
                _ => {
                    tokens.extend(self.lex_atom()?);
                }
            }
        }

        Ok(tokens)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn loc_from(&self, start: Position) -> Loc {
        Loc::new(start, self.position())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn lex_line_comment(&mut self) -> Token {
        let start = self.position();
        self.advance();
        self.advance();

        let text_start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'\n' {
                break;
            }
            self.advance();
        }

        let text = self.source[text_start..self.pos].to_string();
        Token::new(TokenKind::Comment(CommentText::Line(text)), self.loc_from(start))
    }

    fn lex_block_comment(&mut self) -> Result<Token, ParseError> {
        let start = self.position();
        self.advance();
        self.advance();

        let text_start = self.pos;
        let mut depth = 1usize;

        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b'('), Some(b';')) => {
                    depth += 1;
                    self.advance();
                    self.advance();
                }
                (Some(b';'), Some(b')')) => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.source[text_start..self.pos].to_string();
                        self.advance();
                        self.advance();
                        return Ok(Token::new(
                            TokenKind::Comment(CommentText::Block(text)),
                            self.loc_from(start),
                        ));
                    }
                    self.advance();
                    self.advance();
                }
                (Some(_), _) => {
                    self.advance();
                }
                (None, _) => {
                    return Err(ParseError::lex(
                        self.source,
                        Some(self.loc_from(start)),
                        "unterminated block comment",
                    ));
                }
            }
        }
    }

    fn lex_string(&mut self) -> Result<Token, ParseError> {
        let start = self.position();
        self.advance();

        let text_start = self.pos;

        loop {
            match self.peek() {
                Some(b'"') => {
                    let text = self.source[text_start..self.pos].to_string();
                    self.advance();
                    return Ok(Token::new(TokenKind::String(text), self.loc_from(start)));
                }
                Some(b'\\') => {
                    self.advance();
                    if self.advance().is_none() {
                        break;
                    }
                }
                Some(_) => {
                    self.advance();
                }
                None => break,
            }
        }

        Err(ParseError::lex(
            self.source,
            Some(self.loc_from(start)),
            "unterminated string literal",
        ))
    }

    fn lex_atom(&mut self) -> Result<Vec<Token>, ParseError> {
        let start = self.position();
        let text_start = self.pos;

        while let Some(c) = self.peek() {
            if is_atom_boundary(c) {
                break;
            }
            self.advance();
        }

        let atom = &self.source[text_start..self.pos];
        if atom.is_empty() {
            return Err(ParseError::lex(
                self.source,
                Some(self.loc_from(start)),
                format!("unexpected character '{}'", self.peek().unwrap_or(b'?') as char),
            ));
        }

        Ok(split_atom(atom, start, self))
    }
}

fn is_atom_boundary(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' | b'"')
        || (c == b';' /* handled specially, but a lone ';' still ends an atom */)
}

fn looks_numeric(atom: &str) -> bool {
    let body = atom.strip_prefix(['+', '-']).unwrap_or(atom);
    body.starts_with(|c: char| c.is_ascii_digit())
        || body.eq_ignore_ascii_case("inf")
        || body.to_ascii_lowercase().starts_with("nan")
}

/// Splits one whitespace-delimited atom into its constituent tokens: a
/// number is never split; `<valtype>.<name>` becomes three tokens;
/// `<name>=<number>` becomes three tokens; anything else is a single
/// `Keyword`, `Valtype`, or `Name` token.
fn split_atom(atom: &str, start: Position, lexer: &Lexer<'_>) -> Vec<Token> {
    let loc = Loc::new(start, lexer.position());

    if let Some(rest) = atom.strip_prefix('$') {
        return vec![Token::new(TokenKind::Identifier(rest.to_string()), loc)];
    }

    if looks_numeric(atom) {
        return vec![Token::new(TokenKind::Number(atom.to_string()), loc)];
    }

    if let Some(eq) = atom.find('=') {
        let (name, rest) = atom.split_at(eq);
        let value = &rest[1..];
        let mut tokens = classify_word(name, loc);
        tokens.push(Token::new(TokenKind::Equal, loc));
        if looks_numeric(value) {
            tokens.push(Token::new(TokenKind::Number(value.to_string()), loc));
        } else {
            tokens.push(Token::new(TokenKind::Name(value.to_string()), loc));
        }
        return tokens;
    }

    for valtype in ["i32", "i64", "f32", "f64"] {
        if let Some(rest) = atom.strip_prefix(valtype) {
            if let Some(rest) = rest.strip_prefix('.') {
                let mut tokens = vec![Token::new(TokenKind::Valtype(valtype.to_string()), loc)];
                tokens.push(Token::new(TokenKind::Dot, loc));
                tokens.push(Token::new(TokenKind::Name(rest.to_string()), loc));
                return tokens;
            }
        }
    }

    classify_word(atom, loc)
}

fn classify_word(word: &str, loc: Loc) -> Vec<Token> {
    if matches!(word, "i32" | "i64" | "f32" | "f64") {
        return vec![Token::new(TokenKind::Valtype(word.to_string()), loc)];
    }

    if KEYWORDS.contains(&word) {
        return vec![Token::new(TokenKind::Keyword(word.to_string()), loc)];
    }

    vec![Token::new(TokenKind::Name(word.to_string()), loc)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_empty_module() {
        assert_eq!(
            kinds("(module)"),
            vec![
                TokenKind::OpenParen,
                TokenKind::Keyword("module".to_string()),
                TokenKind::CloseParen,
            ]
        );
    }

    #[test]
    fn splits_dotted_opcode() {
        assert_eq!(
            kinds("i32.add"),
            vec![
                TokenKind::Valtype("i32".to_string()),
                TokenKind::Dot,
                TokenKind::Name("add".to_string()),
            ]
        );
    }

    #[test]
    fn splits_named_argument() {
        assert_eq!(
            kinds("offset=4"),
            vec![
                TokenKind::Name("offset".to_string()),
                TokenKind::Equal,
                TokenKind::Number("4".to_string()),
            ]
        );
    }

    #[test]
    fn does_not_split_float_literal_on_dot() {
        assert_eq!(kinds("0.5"), vec![TokenKind::Number("0.5".to_string())]);
    }

    #[test]
    fn lexes_identifier_and_string() {
        assert_eq!(
            kinds("$f \"hi\""),
            vec![
                TokenKind::Identifier("f".to_string()),
                TokenKind::String("hi".to_string()),
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("(module ;; comment\n(; block ;) )"),
            vec![
                TokenKind::OpenParen,
                TokenKind::Keyword("module".to_string()),
                TokenKind::Comment(CommentText::Line(" comment".to_string())),
                TokenKind::Comment(CommentText::Block(" block ".to_string())),
                TokenKind::CloseParen,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_a_parse_error() {
        assert!(lex("\"abc").is_err());
    }
}
