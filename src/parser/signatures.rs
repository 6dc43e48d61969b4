//! The opcode signature table: keyed by `(object, name)`, tells the
//! instruction parser how many operands a plain-form and a folded-form
//! occurrence of an opcode take, and whether those operands are immediate
//! literals (coerced to a valtype) or nested folded sub-expressions whose
//! result is consumed off the stack.
//!
//! Ops not present here default to zero operands in both notations and a
//! literal kind of `f64`, per spec's fallback rule for unrecognized
//! `(object, name)` pairs.

use crate::ast::ValueType;

/// Whether an opcode's operands are read as `NumberLiteral`s (coerced to a
/// declared type) or as nested instructions supplying a stack value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    /// A bare numeric/index literal, coerced to the given type when typed
    /// coercion applies (indices are read as-is, untyped).
    Literal(Option<ValueType>),
    /// A nested folded instruction (or, in plain form, the instruction
    /// left implicitly on the stack).
    Stack,
}

/// How many operands an opcode takes, and in which notations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Arity {
    /// The same fixed count in both plain and folded notation (indices,
    /// constants).
    Immediate(usize),
    /// Zero textual operands in plain notation; this many nested
    /// sub-expressions in folded notation (binops, unops, memory ops).
    Stack(usize),
    /// `set_local`/`tee_local`: one index operand, plus an optional second
    /// operand supplying the value via a nested child frame.
    OptionalInit,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OpcodeSignature {
    pub arity: Arity,
    pub operand: OperandKind,
}

const fn stack(n: usize) -> OpcodeSignature {
    OpcodeSignature {
        arity: Arity::Stack(n),
        operand: OperandKind::Stack,
    }
}

fn immediate(n: usize, ty: Option<ValueType>) -> OpcodeSignature {
    OpcodeSignature {
        arity: Arity::Immediate(n),
        operand: OperandKind::Literal(ty),
    }
}

/// Looks up the signature for `object.name` (or bare `name` when `object`
/// is `None`). Returns `None` when the opcode is not one this crate parses
/// operands for specially — the caller then falls back to zero operands.
pub fn lookup(object: Option<ValueType>, name: &str) -> Option<OpcodeSignature> {
    match name {
        "const" => Some(immediate(1, object)),

        "get_local" | "get_global" => Some(immediate(1, None)),
        "set_global" => Some(OpcodeSignature {
            arity: Arity::Immediate(1),
            operand: OperandKind::Literal(None),
        }),
        "set_local" | "tee_local" => Some(OpcodeSignature {
            arity: Arity::OptionalInit,
            operand: OperandKind::Literal(None),
        }),

        // `br`/`br_if`/`br_table` resolve a label operand (numeral or
        // symbolic name), parsed specially in `parse_op_instruction`
        // alongside `call`/`call_indirect` rather than through this table.
        "drop" => Some(stack(1)),
        "select" => Some(stack(3)),

        // Binary numeric operators: two stack operands.
        "add" | "sub" | "mul" | "div" | "div_s" | "div_u" | "rem_s" | "rem_u" | "and" | "or"
        | "xor" | "shl" | "shr_s" | "shr_u" | "rotl" | "rotr" | "min" | "max" | "copysign"
        | "eq" | "ne" | "lt" | "lt_s" | "lt_u" | "gt" | "gt_s" | "gt_u" | "le" | "le_s"
        | "le_u" | "ge" | "ge_s" | "ge_u" => Some(stack(2)),

        // Unary numeric operators: one stack operand.
        "clz" | "ctz" | "popcnt" | "eqz" | "abs" | "neg" | "sqrt" | "ceil" | "floor" | "trunc"
        | "nearest" | "wrap_i64" | "extend_i32_s" | "extend_i32_u" | "convert_i32_s"
        | "convert_i32_u" | "convert_i64_s" | "convert_i64_u" | "demote_f64" | "promote_f32"
        | "trunc_f32_s" | "trunc_f32_u" | "trunc_f64_s" | "trunc_f64_u" | "reinterpret" => {
            Some(stack(1))
        }

        // Memory access: address (plus value, for stores), named
        // `offset=`/`align=` arguments are parsed separately before these.
        "load" | "load8_s" | "load8_u" | "load16_s" | "load16_u" | "load32_s" | "load32_u" => {
            Some(stack(1))
        }
        "store" | "store8" | "store16" | "store32" => Some(stack(2)),

        _ => None,
    }
}
