//! Leaf value nodes: decoded number and string literals, byte arrays, and
//! the `Index` value used everywhere a function/global/memory/table/type
//! slot is referenced.

use crate::ast::ident::Identifier;
use crate::ast::loc::Loc;
use crate::ast::types::ValueType;

/// The decoded value of a `NumberLiteral`, produced by the number-literal
/// decoder (never constructed by hand from source text elsewhere).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NumericValue {
    Int(i64),
    Float(f64),
}

impl NumericValue {
    pub fn as_f64(self) -> f64 {
        match self {
            NumericValue::Int(i) => i as f64,
            NumericValue::Float(f) => f,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            NumericValue::Int(i) => i,
            NumericValue::Float(f) => f as i64,
        }
    }
}

/// A decoded numeric literal. `raw` preserves the exact source text (useful
/// for a future printer); `ty`, when present, is the valtype the parser's
/// opcode signature table coerced this literal to.
#[derive(Clone, Debug, PartialEq)]
pub struct NumberLiteral {
    pub value: NumericValue,
    pub raw: String,
    pub ty: Option<ValueType>,
    pub loc: Option<Loc>,
}

impl NumberLiteral {
    pub fn new(value: NumericValue, raw: impl Into<String>, loc: Option<Loc>) -> Self {
        NumberLiteral {
            value,
            raw: raw.into(),
            ty: None,
            loc,
        }
    }

    pub fn with_type(mut self, ty: ValueType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self.value {
            NumericValue::Int(i) => u32::try_from(i).ok().or_else(|| {
                // Text offsets/aligns are unsigned but the decoder produces
                // a signed 64-bit value; accept the low 32 bits for values
                // that round-tripped through `parse32i`'s wrap semantics.
                if (0..=u32::MAX as i64).contains(&i) {
                    Some(i as u32)
                } else {
                    None
                }
            }),
            NumericValue::Float(_) => None,
        }
    }
}

/// A decoded string literal (escape sequences already resolved into bytes,
/// per the string-literal decoder).
#[derive(Clone, Debug, PartialEq)]
pub struct StringLiteral {
    pub value: Vec<u8>,
    pub loc: Option<Loc>,
}

impl StringLiteral {
    pub fn as_utf8_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// A sequence of raw bytes, as found in a `Data` segment's initializer.
#[derive(Clone, Debug, PartialEq)]
pub struct ByteArray {
    pub values: Vec<u8>,
    pub loc: Option<Loc>,
}

/// The memory index carried by a `Data` segment. Distinct from the general
/// `Index` because, absent the multi-memory proposal, it is always a bare
/// numeral defaulting to 0.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MemIndexLiteral {
    pub value: u32,
    pub loc: Option<Loc>,
}

impl MemIndexLiteral {
    pub fn zero() -> Self {
        MemIndexLiteral { value: 0, loc: None }
    }
}

/// A value that resolves to a function/global/memory/table/type slot:
/// either a symbolic name or a numeric position.
#[derive(Clone, Debug, PartialEq)]
pub enum Index {
    Id(Identifier),
    Num(NumberLiteral),
}

impl Index {
    pub fn loc(&self) -> Option<Loc> {
        match self {
            Index::Id(id) => id.loc,
            Index::Num(n) => n.loc,
        }
    }
}

/// A leading or standalone `;;` line comment.
#[derive(Clone, Debug, PartialEq)]
pub struct LeadingComment {
    pub value: String,
    pub loc: Option<Loc>,
}

/// A `(; ... ;)` block comment.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockComment {
    pub value: String,
    pub loc: Option<Loc>,
}

/// A comment encountered while parsing, retained only when the caller asks
/// for comments to be collected (see `parser::Options`).
#[derive(Clone, Debug, PartialEq)]
pub enum Comment {
    Leading(LeadingComment),
    Block(BlockComment),
}
