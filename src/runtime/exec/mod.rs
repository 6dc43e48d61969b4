//! Instruction execution: dispatches a single `Instruction` or a sequence of
//! them, threading the value stack, the label stack, the originating
//! module, and the allocator through every handler.
//!
//! Numeric, memory/local/global, and control-flow handlers live in their
//! own submodules; this file only wires the dispatch table together and
//! hosts the few helpers shared across all three (operand evaluation,
//! index-literal extraction).

mod control;
mod memory;
mod numeric;

use crate::ast::{Index, Instr, Instruction, NumberLiteral, Operand, ValueType};
use crate::error::RuntimeError;
use crate::runtime::allocator::Allocator;
use crate::runtime::frame::{Step, StackFrame};
use crate::runtime::instance::ModuleInstance;
use crate::runtime::trap::Trap;
use crate::runtime::values::Value;

/// Runs a body of instructions in order, stopping at the first non-`Continue`
/// step (a branch, a return, or a trap).
pub fn execute_sequence(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    code: &[Instruction],
) -> Result<Step, RuntimeError> {
    for instr in code {
        match execute_instruction(frame, module, allocator, instr)? {
            Step::Continue => continue,
            other => return Ok(other),
        }
    }
    Ok(Step::Continue)
}

pub fn execute_instruction(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instruction,
) -> Result<Step, RuntimeError> {
    match instr {
        Instruction::Plain(i) => execute_plain(frame, module, allocator, i),
        Instruction::Block(b) => control::execute_block(frame, module, allocator, b),
        Instruction::Loop(l) => control::execute_loop(frame, module, allocator, l),
        Instruction::If(i) => control::execute_if(frame, module, allocator, i),
        Instruction::Call(c) => control::execute_call(frame, module, allocator, c),
        Instruction::CallIndirect(c) => control::execute_call_indirect(frame, module, allocator, c),
    }
}

fn execute_plain(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
) -> Result<Step, RuntimeError> {
    match instr.id.as_str() {
        "nop" => Ok(Step::Continue),
        "unreachable" => Ok(Step::Trap(Trap::new("unreachable executed"))),

        "const" => numeric::execute_const(frame, instr),

        "get_local" => memory::execute_get_local(frame, instr),
        "set_local" => memory::execute_set_local(frame, module, allocator, instr, false),
        "tee_local" => memory::execute_set_local(frame, module, allocator, instr, true),
        "get_global" => memory::execute_get_global(frame, module, allocator, instr),
        "set_global" => memory::execute_set_global(frame, module, allocator, instr),

        "return" => control::execute_return(frame, module, allocator, instr),
        "br" => control::execute_br(frame, instr),
        "br_if" => control::execute_br_if(frame, module, allocator, instr),
        "br_table" => control::execute_br_table(frame, module, allocator, instr),

        "drop" => match push_stack_args(frame, module, allocator, instr)? {
            Step::Continue => control::execute_drop(frame),
            other => Ok(other),
        },
        "select" => match push_stack_args(frame, module, allocator, instr)? {
            Step::Continue => control::execute_select(frame),
            other => Ok(other),
        },

        _ => match push_stack_args(frame, module, allocator, instr)? {
            Step::Continue => {
                if memory::is_load_store(&instr.id) {
                    memory::execute_load_store(frame, module, allocator, instr)
                } else {
                    numeric::execute_numeric(frame, instr)
                }
            }
            other => Ok(other),
        },
    }
}

/// Pushes every stack-arity operand of `instr` (evaluating nested folded
/// sub-expressions, or coercing bare literals), leaving the frame exactly as
/// if the operands had already been left on the stack by preceding plain
/// instructions. Stops early on a non-`Continue` step from a nested
/// instruction.
fn push_stack_args(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
) -> Result<Step, RuntimeError> {
    for operand in &instr.args {
        match push_operand(frame, module, allocator, operand, instr.object)? {
            Step::Continue => {}
            other => return Ok(other),
        }
    }
    Ok(Step::Continue)
}

/// Evaluates one operand onto the stack: a literal is coerced to its
/// declared (or fallback) type and pushed directly; a nested instruction is
/// executed, which leaves its own result on the stack.
pub(crate) fn push_operand(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    operand: &Operand,
    fallback_ty: Option<ValueType>,
) -> Result<Step, RuntimeError> {
    match operand {
        Operand::Literal(lit) => {
            let ty = lit.ty.or(fallback_ty).unwrap_or(ValueType::I32);
            frame.push_result(Value::create(ty, lit.value.as_f64()));
            Ok(Step::Continue)
        }
        Operand::Nested(nested) => execute_instruction(frame, module, allocator, nested),
        Operand::Label(_) => Err(RuntimeError::NonNumericIndex),
    }
}

/// Extracts a `u32` out of an index operand, which must be a bare
/// `NumberLiteral` (folded sub-expressions are never valid here).
pub(crate) fn literal_u32(operand: &Operand) -> Result<u32, RuntimeError> {
    match operand {
        Operand::Literal(lit) => literal_as_u32(lit),
        Operand::Nested(_) | Operand::Label(_) => Err(RuntimeError::NonNumericIndex),
    }
}

fn literal_as_u32(lit: &NumberLiteral) -> Result<u32, RuntimeError> {
    lit.as_u32().ok_or(RuntimeError::NonNumericIndex)
}

/// Resolves a `br`/`br_if`/`br_table` target to a relative branch depth: a
/// numeric operand is the depth directly, while a named one is matched
/// against `frame.labels` from the innermost label outward, the way
/// `Index::Id` is resolved everywhere else in this crate.
pub(crate) fn resolve_branch_target(frame: &StackFrame, operand: &Operand) -> Result<u32, RuntimeError> {
    let index = match operand {
        Operand::Label(index) => index,
        _ => return Err(RuntimeError::NonNumericIndex),
    };
    match index {
        Index::Num(n) => n.as_u32().ok_or(RuntimeError::NonNumericIndex),
        Index::Id(id) => frame
            .labels
            .iter()
            .rev()
            .position(|label| label.name.as_deref() == Some(id.value.as_str()))
            .map(|depth| depth as u32)
            .ok_or_else(|| RuntimeError::UnresolvedIdentifier(id.value.clone())),
    }
}
