//! Instruction nodes.
//!
//! `block`, `loop`, and `if` are always represented by their own dedicated
//! node kinds, never by a generic `Instr` whose `id` happens to be one of
//! those three strings — that invariant is enforced by `Instr::new`, the
//! only public constructor for the generic form, rather than left as a
//! convention callers must remember.

use std::collections::BTreeMap;

use crate::ast::ident::Identifier;
use crate::ast::loc::Loc;
use crate::ast::types::{Signature, ValueType};
use crate::ast::values::{Index, NumberLiteral};
use crate::error::AssertionError;

/// The three plain-instruction ids that must never appear on an `Instr`:
/// they are always lifted into `BlockInstruction`/`LoopInstruction`/
/// `IfInstruction` by the parser.
const STRUCTURED_IDS: [&str; 3] = ["block", "loop", "if"];

/// An operand of a plain instruction: a literal (coerced to the valtype
/// the opcode signature table expects), a nested folded instruction whose
/// result feeds the enclosing instruction, or a branch target — `br`,
/// `br_if`, and `br_table` address an enclosing label either by numeral
/// or by the symbolic name given to a `block`/`loop`/`if`.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Literal(NumberLiteral),
    Nested(Box<Instruction>),
    Label(Index),
}

/// All instructions except `block`, `loop`, and `if`.
///
/// `object` holds the valtype prefix for dotted opcodes (`i32.add` ->
/// `object: Some(I32), id: "add"`); it is `None` for opcodes with no type
/// prefix (`get_local`, `nop`, `drop`, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct Instr {
    pub id: String,
    pub object: Option<ValueType>,
    pub args: Vec<Operand>,
    pub named_args: BTreeMap<String, NumberLiteral>,
    pub loc: Option<Loc>,
}

impl Instr {
    /// Builds a plain instruction node.
    ///
    /// # Panics
    /// Panics via [`AssertionError`] semantics would be the binary-shaped
    /// alternative, but since this is a structural invariant a caller can
    /// trivially violate by typo, it is instead reported as a `Result` so
    /// parser code can turn it into a `ParseError` with a code frame.
    pub fn new(
        id: impl Into<String>,
        object: Option<ValueType>,
        args: Vec<Operand>,
        named_args: BTreeMap<String, NumberLiteral>,
        loc: Option<Loc>,
    ) -> Result<Self, AssertionError> {
        let id = id.into();

        if STRUCTURED_IDS.contains(&id.as_str()) {
            return Err(AssertionError::new(format!(
                "'{id}' must be represented as a structured instruction node, not a plain Instr"
            )));
        }

        Ok(Instr {
            id,
            object,
            args,
            named_args,
            loc,
        })
    }
}

/// Either an inline signature or a reference to a module-level `(type ..)`
/// declaration, as used by `func` and `call_indirect`.
#[derive(Clone, Debug, PartialEq)]
pub enum SignatureOrRef {
    Signature(Signature),
    TypeUse(Index),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockInstruction {
    pub label: Identifier,
    pub instr: Vec<Instruction>,
    pub result: Option<ValueType>,
    pub loc: Option<Loc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoopInstruction {
    pub label: Identifier,
    pub instr: Vec<Instruction>,
    pub result: Option<ValueType>,
    pub loc: Option<Loc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfInstruction {
    pub label: Identifier,
    pub test: Vec<Instruction>,
    pub result: Option<ValueType>,
    pub consequent: Vec<Instruction>,
    pub alternate: Vec<Instruction>,
    pub loc: Option<Loc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallInstruction {
    pub index: Index,
    pub instr_args: Vec<Instruction>,
    pub loc: Option<Loc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallIndirectInstruction {
    pub signature: SignatureOrRef,
    pub instr_args: Vec<Instruction>,
    pub loc: Option<Loc>,
}

/// A module-level `(type $t (func ...))` declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeInstruction {
    pub id: Option<Identifier>,
    pub signature: Signature,
    pub loc: Option<Loc>,
}

/// Every kind of instruction that can appear in a function body.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Plain(Instr),
    Block(BlockInstruction),
    Loop(LoopInstruction),
    If(IfInstruction),
    Call(CallInstruction),
    CallIndirect(CallIndirectInstruction),
}

impl Instruction {
    pub fn loc(&self) -> Option<Loc> {
        match self {
            Instruction::Plain(i) => i.loc,
            Instruction::Block(b) => b.loc,
            Instruction::Loop(l) => l.loc,
            Instruction::If(i) => i.loc,
            Instruction::Call(c) => c.loc,
            Instruction::CallIndirect(c) => c.loc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_block_as_plain_instruction_id() {
        for id in STRUCTURED_IDS {
            let result = Instr::new(id, None, vec![], BTreeMap::new(), None);
            assert!(result.is_err(), "expected {id} to be rejected");
        }
    }

    #[test]
    fn accepts_ordinary_opcode() {
        let instr = Instr::new("add", Some(ValueType::I32), vec![], BTreeMap::new(), None);
        assert!(instr.is_ok());
    }
}
