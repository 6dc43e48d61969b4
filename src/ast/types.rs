//! Value types and the small type-level vocabulary the text format uses:
//! limits, mutability, global types, and signatures.

use crate::ast::ident::Identifier;
use crate::ast::loc::Loc;

/// The four numeric value types the text format's core scope covers.
/// SIMD (`v128`) and reference types beyond bare `funcref` tables are
/// explicitly out of scope.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "i32" => Some(ValueType::I32),
            "i64" => Some(ValueType::I64),
            "f32" => Some(ValueType::F32),
            "f64" => Some(ValueType::F64),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ValueType::I32 | ValueType::I64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, ValueType::F32 | ValueType::F64)
    }
}

/// The element type of a table. Only function references are supported;
/// `externref` is part of the reference-types proposal this core excludes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReferenceType {
    AnyFunc,
}

/// A range `{min, max?}` giving the size of a memory (in 64 KiB pages) or a
/// table (in elements).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Limit {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limit {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Limit { min, max }
    }

    pub fn exact(n: u32) -> Self {
        Limit { min: n, max: Some(n) }
    }
}

/// Whether a global is mutable (`var`, declared `(mut <type>)`) or not
/// (`const`, the default when no `mut` wrapper is present).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mutability {
    Const,
    Var,
}

/// The declared type of a global variable or global import.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GlobalType {
    pub valtype: ValueType,
    pub mutability: Mutability,
}

/// A `ValueType` occurring as a literal operand in the AST (e.g. the result
/// type of a block, or a `(result i32)` clause).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ValtypeLiteral {
    pub name: ValueType,
    pub loc: Option<Loc>,
}

/// One parameter of a function signature: an optional local name and its
/// value type.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub id: Option<Identifier>,
    pub valtype: ValueType,
}

/// A function's parameter and result types.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<ValueType>,
}

impl Signature {
    pub fn empty() -> Self {
        Signature::default()
    }
}
