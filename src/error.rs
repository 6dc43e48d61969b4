//! The error kinds surfaced at this crate's boundary.
//!
//! `ParseError` and `RuntimeError` are ordinary `std::error::Error`s (via
//! `thiserror`, matching the teacher's existing `ModelError`/`ParseError`
//! pattern). `Trap` is deliberately not one of them — it is a value a
//! frame carries and that propagates through child frames without being
//! raised, per the execution model. `AssertionError` reports a producer
//! bug: an AST builder invariant violated by its caller.

use thiserror::Error;

use crate::ast::Loc;
use crate::codeframe::code_frame_from_source;

/// A fatal error raised while tokenizing or parsing WAT/WAST source. The
/// message always begins with a two-line code frame citing the offending
/// token's location, when one is known.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{message}")]
    Syntax { message: String },
    #[error("{message}")]
    Lex { message: String },
}

impl ParseError {
    /// Builds a syntax error whose message is prefixed with a code frame
    /// for `loc`, when source and location are both available.
    pub fn syntax(source: &str, loc: Option<Loc>, reason: impl Into<String>) -> Self {
        ParseError::Syntax {
            message: with_code_frame(source, loc, reason.into()),
        }
    }

    pub fn lex(source: &str, loc: Option<Loc>, reason: impl Into<String>) -> Self {
        ParseError::Lex {
            message: with_code_frame(source, loc, reason.into()),
        }
    }
}

fn with_code_frame(source: &str, loc: Option<Loc>, reason: String) -> String {
    match loc {
        Some(loc) => format!("{}\n{}", code_frame_from_source(source, loc), reason),
        None => reason,
    }
}

/// An error raised while executing an instruction sequence: a missing
/// argument, an unsupported `(object, op)` combination, an unresolved
/// local/global/function address, or an index that was required to be a
/// numeric literal but wasn't. Always propagates out of
/// `execute_stack_frame` rather than being caught internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("instruction '{0}' is missing a required argument")]
    MissingArgument(String),

    #[error("unsupported operation '{object}.{op}'")]
    UnsupportedOperation { object: String, op: String },

    #[error("index is not a numeric literal")]
    NonNumericIndex,

    #[error("unknown local at index {0}")]
    UnknownLocal(u32),

    #[error("unknown global at index {0}")]
    UnknownGlobal(u32),

    #[error("unknown function at index {0}")]
    UnknownFunction(u32),

    #[error("unknown table at index {0}")]
    UnknownTable(u32),

    #[error("unknown memory at index {0}")]
    UnknownMemory(u32),

    #[error("unresolved identifier '{0}'")]
    UnresolvedIdentifier(String),

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("operand stack type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("call arity mismatch: expected {expected} arguments, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("no host import bound for '{module}.{name}'")]
    UnboundImport { module: String, name: String },

    #[error("constant expression trapped: {0}")]
    ConstantExpressionTrapped(String),
}

/// An internal invariant violation: the producer (an AST builder, module
/// instantiation) received data shaped in a way the model forbids. Not
/// meant to be recovered from; it indicates a bug upstream of this crate.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("assertion failed: {0}")]
pub struct AssertionError(String);

impl AssertionError {
    pub fn new(message: impl Into<String>) -> Self {
        AssertionError(message.into())
    }
}
