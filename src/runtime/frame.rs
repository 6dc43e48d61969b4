//! The stack frame and the executor protocol every instruction handler is
//! built on.

use crate::ast::{Index, Instruction, ValueType};
use crate::error::RuntimeError;
use crate::runtime::allocator::Allocator;
use crate::runtime::exec;
use crate::runtime::instance::ModuleInstance;
use crate::runtime::trap::Trap;
use crate::runtime::values::Value;

/// One active block/loop/if scope, tracked so `br`/`br_if`/`br_table` can
/// resolve a numeric depth or a named label to a target.
#[derive(Clone, Debug)]
pub struct Label {
    pub name: Option<String>,
    pub is_loop: bool,
}

/// What happened after running one instruction or one instruction
/// sequence: either execution should continue with the next instruction,
/// or a non-local exit is in flight.
pub enum Step {
    Continue,
    /// Unwind `depth` enclosing structured instructions (0 = the innermost).
    Branch(u32),
    Return,
    Trap(Trap),
}

/// What a whole frame's execution produced: a value (or none, for a
/// function with no result) or a trap. `RuntimeError` is a distinct,
/// always-fatal failure mode propagated via `?` instead — see module docs.
pub enum ExecutionOutcome {
    Value(Option<Value>),
    Trap(Trap),
}

/// A `StackFrame` holds the code being executed, the locals array, the
/// value stack, the label stack, and (indirectly, via `&ModuleInstance`/
/// `&mut Allocator` threaded through execution rather than stored as
/// fields) the originating module and the allocator — kept external to
/// `StackFrame` itself so multiple frames never fight over a `&mut
/// Allocator` at once; only one frame executes at a time.
pub struct StackFrame {
    pub code: Vec<Instruction>,
    pub locals: Vec<Value>,
    pub stack: Vec<Value>,
    pub labels: Vec<Label>,
}

/// `createStackFrame(code, locals)`.
pub fn create_stack_frame(code: Vec<Instruction>, locals: Vec<Value>) -> StackFrame {
    StackFrame {
        code,
        locals,
        stack: Vec::new(),
        labels: Vec::new(),
    }
}

impl StackFrame {
    pub fn pop1(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pops two operands, right-hand operand first (it was pushed last),
    /// and returns `(lhs, rhs)` in source order.
    pub fn pop2(&mut self) -> Result<(Value, Value), RuntimeError> {
        let rhs = self.pop1()?;
        let lhs = self.pop1()?;
        Ok((lhs, rhs))
    }

    pub fn pop_typed(&mut self, expected: ValueType) -> Result<Value, RuntimeError> {
        let value = self.pop1()?;
        if value.value_type() != expected {
            return Err(RuntimeError::TypeMismatch {
                expected: expected.name().to_string(),
                found: value.value_type().name().to_string(),
            });
        }
        Ok(value)
    }

    pub fn push_result(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// `castIntoStackLocalOfType`: applies the per-type `create_value`
    /// coercion to a raw host number, e.g. when a `NumberLiteral` operand
    /// or a `set_local` argument needs to become a typed stack/local value.
    pub fn cast_into_stack_local_of_type(&self, ty: ValueType, raw: f64) -> Value {
        Value::create(ty, raw)
    }

    pub fn get_local_by_index(&self, index: u32) -> Result<Value, RuntimeError> {
        self.locals
            .get(index as usize)
            .copied()
            .ok_or(RuntimeError::UnknownLocal(index))
    }

    pub fn set_local_by_index(&mut self, index: u32, value: Value) -> Result<(), RuntimeError> {
        let slot = self
            .locals
            .get_mut(index as usize)
            .ok_or(RuntimeError::UnknownLocal(index))?;
        *slot = value;
        Ok(())
    }

    /// `isTrapped`: whether a child frame's outcome was a trap.
    pub fn is_trapped(outcome: &ExecutionOutcome) -> bool {
        matches!(outcome, ExecutionOutcome::Trap(_))
    }
}

/// Resolves a `get_local`/`set_local`/`tee_local` index operand, which MUST
/// be a `NumberLiteral` (named locals are not resolved through the AST's
/// general `Index::Id` symbolic form — unlike `br`/`br_if`/`br_table`
/// targets, which do resolve named labels against the active label stack;
/// see `runtime::exec::resolve_branch_target`).
pub fn require_numeric_index(index: &Index) -> Result<u32, RuntimeError> {
    match index {
        Index::Num(n) => n.as_u32().ok_or(RuntimeError::NonNumericIndex),
        Index::Id(_) => Err(RuntimeError::NonNumericIndex),
    }
}

/// `executeStackFrame(frame)`: walks `frame.code` in order, dispatching
/// each instruction through the executor table. A trapped instruction
/// stops the frame immediately; `Return`/`Branch` unwinding past the end
/// of the function body (an out-of-range branch) also yields a trap,
/// since no separate validation pass rejects it ahead of time.
pub fn execute_stack_frame(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
) -> Result<ExecutionOutcome, RuntimeError> {
    let code = std::mem::take(&mut frame.code);
    let step = exec::execute_sequence(frame, module, allocator, &code)?;
    frame.code = code;

    match step {
        Step::Continue | Step::Return => Ok(ExecutionOutcome::Value(frame.stack.pop())),
        Step::Branch(_) => Ok(ExecutionOutcome::Trap(Trap::new("branch index out of range"))),
        Step::Trap(trap) => Ok(ExecutionOutcome::Trap(trap)),
    }
}

/// `createAndExecuteChildStackFrame(parent, code) -> value | Trap`: used
/// for `call`/`call_indirect` (fresh locals from the callee's arguments)
/// and for evaluating a folded `set_local`/`tee_local` initializer or a
/// constant expression (empty locals, parent's allocator/module shared).
pub fn create_and_execute_child_stack_frame(
    code: Vec<Instruction>,
    locals: Vec<Value>,
    module: &ModuleInstance,
    allocator: &mut Allocator,
) -> Result<ExecutionOutcome, RuntimeError> {
    let mut child = create_stack_frame(code, locals);
    execute_stack_frame(&mut child, module, allocator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop2_returns_lhs_then_rhs() {
        let mut frame = create_stack_frame(Vec::new(), Vec::new());
        frame.push_result(Value::I32(1));
        frame.push_result(Value::I32(2));
        let (lhs, rhs) = frame.pop2().unwrap();
        assert_eq!(lhs, Value::I32(1));
        assert_eq!(rhs, Value::I32(2));
    }

    #[test]
    fn pop_typed_rejects_a_mismatched_type() {
        let mut frame = create_stack_frame(Vec::new(), Vec::new());
        frame.push_result(Value::F32(1.0));
        assert!(frame.pop_typed(ValueType::I32).is_err());
    }

    #[test]
    fn get_local_by_index_reports_unknown_locals() {
        let frame = create_stack_frame(Vec::new(), vec![Value::I32(1)]);
        assert!(frame.get_local_by_index(1).is_err());
        assert_eq!(frame.get_local_by_index(0).unwrap(), Value::I32(1));
    }
}
