//! Structured control flow (`block`/`loop`/`if`), branches, calls, and the
//! remaining stack-shuffling ops (`drop`/`select`/`return`).
//!
//! `block`/`loop`/`if` recurse on the *same* `StackFrame` — sharing its
//! locals and value stack, only pushing/popping a [`Label`] — rather than
//! spawning a child frame with a fresh locals array. A literal child frame
//! per structured instruction would silently lose any local mutated inside
//! it, which real WebAssembly scoping does not do; `call`/`call_indirect`
//! are the only instructions that genuinely need fresh locals, via
//! [`create_and_execute_child_stack_frame`].

use crate::ast::{
    BlockInstruction, CallIndirectInstruction, CallInstruction, IfInstruction, Instr,
    LoopInstruction, Operand, ValueType,
};
use crate::error::RuntimeError;
use crate::runtime::allocator::{Allocator, FunctionInstance};
use crate::runtime::exec::{self, push_operand, resolve_branch_target};
use crate::runtime::frame::{
    create_and_execute_child_stack_frame, ExecutionOutcome, Label, Step, StackFrame,
};
use crate::runtime::instance::ModuleInstance;
use crate::runtime::values::Value;

pub fn execute_block(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    block: &BlockInstruction,
) -> Result<Step, RuntimeError> {
    frame.labels.push(Label {
        name: Some(block.label.value.clone()),
        is_loop: false,
    });
    let step = exec::execute_sequence(frame, module, allocator, &block.instr);
    frame.labels.pop();
    unwind_block(step?)
}

pub fn execute_loop(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    lp: &LoopInstruction,
) -> Result<Step, RuntimeError> {
    loop {
        frame.labels.push(Label {
            name: Some(lp.label.value.clone()),
            is_loop: true,
        });
        let step = exec::execute_sequence(frame, module, allocator, &lp.instr);
        frame.labels.pop();
        match step? {
            Step::Branch(0) => continue,
            Step::Branch(n) => return Ok(Step::Branch(n - 1)),
            other => return Ok(other),
        }
    }
}

pub fn execute_if(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    iff: &IfInstruction,
) -> Result<Step, RuntimeError> {
    match exec::execute_sequence(frame, module, allocator, &iff.test)? {
        Step::Continue => {}
        other => return Ok(other),
    }
    let condition = frame.pop_typed(ValueType::I32)?;
    let taken = matches!(condition, Value::I32(c) if c != 0);

    frame.labels.push(Label {
        name: Some(iff.label.value.clone()),
        is_loop: false,
    });
    let body = if taken { &iff.consequent } else { &iff.alternate };
    let step = exec::execute_sequence(frame, module, allocator, body);
    frame.labels.pop();
    unwind_block(step?)
}

fn unwind_block(step: Step) -> Result<Step, RuntimeError> {
    match step {
        Step::Branch(0) => Ok(Step::Continue),
        Step::Branch(n) => Ok(Step::Branch(n - 1)),
        other => Ok(other),
    }
}

pub fn execute_drop(frame: &mut StackFrame) -> Result<Step, RuntimeError> {
    frame.pop1()?;
    Ok(Step::Continue)
}

pub fn execute_select(frame: &mut StackFrame) -> Result<Step, RuntimeError> {
    let condition = frame.pop_typed(ValueType::I32)?;
    let if_false = frame.pop1()?;
    let if_true = frame.pop1()?;
    let selected = match condition {
        Value::I32(c) if c != 0 => if_true,
        _ => if_false,
    };
    frame.push_result(selected);
    Ok(Step::Continue)
}

/// `return`'s operand, when written as a folded sub-expression, evaluates
/// and leaves its result on top of the stack, which `execute_stack_frame`
/// then pops as the frame's final value.
pub fn execute_return(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
) -> Result<Step, RuntimeError> {
    if let Some(operand) = instr.args.first() {
        match push_operand(frame, module, allocator, operand, instr.object)? {
            Step::Continue => {}
            other => return Ok(other),
        }
    }
    Ok(Step::Return)
}

pub fn execute_br(frame: &StackFrame, instr: &Instr) -> Result<Step, RuntimeError> {
    let depth = resolve_branch_target(
        frame,
        instr
            .args
            .first()
            .ok_or_else(|| RuntimeError::MissingArgument(instr.id.clone()))?,
    )?;
    Ok(Step::Branch(depth))
}

pub fn execute_br_if(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
) -> Result<Step, RuntimeError> {
    let depth = resolve_branch_target(
        frame,
        instr
            .args
            .first()
            .ok_or_else(|| RuntimeError::MissingArgument(instr.id.clone()))?,
    )?;
    if let Some(operand) = instr.args.get(1) {
        match push_operand(frame, module, allocator, operand, Some(ValueType::I32))? {
            Step::Continue => {}
            other => return Ok(other),
        }
    }
    let condition = frame.pop_typed(ValueType::I32)?;
    match condition {
        Value::I32(c) if c != 0 => Ok(Step::Branch(depth)),
        _ => Ok(Step::Continue),
    }
}

pub fn execute_br_table(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
) -> Result<Step, RuntimeError> {
    if instr.args.is_empty() {
        return Err(RuntimeError::MissingArgument(instr.id.clone()));
    }
    let (labels, selector_operand) = match instr.args.last() {
        Some(Operand::Label(_)) => (&instr.args[..], None),
        Some(operand) => (&instr.args[..instr.args.len() - 1], Some(operand)),
        None => unreachable!("checked non-empty above"),
    };
    if let Some(operand) = selector_operand {
        match push_operand(frame, module, allocator, operand, Some(ValueType::I32))? {
            Step::Continue => {}
            other => return Ok(other),
        }
    }

    let selector = frame.pop_typed(ValueType::I32)?;
    let index = match selector {
        Value::I32(v) => v as u32 as usize,
        _ => unreachable!("pop_typed enforced i32"),
    };
    let (targets, default) = labels.split_at(labels.len() - 1);
    let depth = match targets.get(index) {
        Some(operand) => resolve_branch_target(frame, operand)?,
        None => resolve_branch_target(frame, &default[0])?,
    };
    Ok(Step::Branch(depth))
}

pub fn execute_call(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    call: &CallInstruction,
) -> Result<Step, RuntimeError> {
    let addr = module.resolve_func(&call.index)?;
    let function = allocator.function(addr)?.clone();
    let signature_len = function.signature().params.len();

    let folded = evaluate_folded_args(frame, module, allocator, &call.instr_args)?;
    let values = match folded {
        ArgsOrStep::Step(step) => return Ok(step),
        ArgsOrStep::Values(values) => values,
    };
    let values = if call.instr_args.is_empty() && signature_len > 0 {
        pop_n(frame, signature_len)?
    } else {
        values
    };

    if values.len() != signature_len {
        return Err(RuntimeError::ArityMismatch {
            expected: signature_len,
            found: values.len(),
        });
    }
    invoke(frame, function, values, module, allocator)
}

pub fn execute_call_indirect(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    ci: &CallIndirectInstruction,
) -> Result<Step, RuntimeError> {
    let signature = module.resolve_signature(&ci.signature)?;

    let folded = evaluate_folded_args(frame, module, allocator, &ci.instr_args)?;
    let mut values = match folded {
        ArgsOrStep::Step(step) => return Ok(step),
        ArgsOrStep::Values(values) => values,
    };

    let table_index_value = if ci.instr_args.is_empty() {
        frame.pop_typed(ValueType::I32)?
    } else {
        values.pop().ok_or_else(|| RuntimeError::MissingArgument("call_indirect".to_string()))?
    };
    let table_index = match table_index_value {
        Value::I32(v) => v as u32,
        other => {
            return Err(RuntimeError::TypeMismatch {
                expected: "i32".to_string(),
                found: other.value_type().name().to_string(),
            })
        }
    };

    let args = if ci.instr_args.is_empty() && !signature.params.is_empty() {
        pop_n(frame, signature.params.len())?
    } else {
        values
    };
    if args.len() != signature.params.len() {
        return Err(RuntimeError::ArityMismatch {
            expected: signature.params.len(),
            found: args.len(),
        });
    }

    let table_addr = module.tableaddrs.first().copied().ok_or(RuntimeError::UnknownTable(0))?;
    let func_addr = allocator
        .table(table_addr)?
        .elements
        .get(table_index as usize)
        .copied()
        .flatten()
        .ok_or(RuntimeError::UnknownFunction(table_index))?;
    let function = allocator.function(func_addr)?.clone();
    invoke(frame, function, args, module, allocator)
}

enum ArgsOrStep {
    Values(Vec<Value>),
    Step(Step),
}

/// Evaluates each folded trailing instruction of a `call`/`call_indirect`
/// (including, for `call_indirect`, the table-index expression as the last
/// one), leaving one popped value per instruction in source order.
fn evaluate_folded_args(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr_args: &[crate::ast::Instruction],
) -> Result<ArgsOrStep, RuntimeError> {
    let mut values = Vec::with_capacity(instr_args.len());
    for instr in instr_args {
        match exec::execute_instruction(frame, module, allocator, instr)? {
            Step::Continue => {}
            other => return Ok(ArgsOrStep::Step(other)),
        }
        values.push(frame.pop1()?);
    }
    Ok(ArgsOrStep::Values(values))
}

fn pop_n(frame: &mut StackFrame, n: usize) -> Result<Vec<Value>, RuntimeError> {
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(frame.pop1()?);
    }
    values.reverse();
    Ok(values)
}

fn invoke(
    frame: &mut StackFrame,
    function: FunctionInstance,
    args: Vec<Value>,
    module: &ModuleInstance,
    allocator: &mut Allocator,
) -> Result<Step, RuntimeError> {
    match function {
        FunctionInstance::External { callable, .. } => match callable(&args) {
            Ok(Some(value)) => {
                frame.push_result(value);
                Ok(Step::Continue)
            }
            Ok(None) => Ok(Step::Continue),
            Err(trap) => Ok(Step::Trap(trap)),
        },
        FunctionInstance::Local { body, .. } => {
            match create_and_execute_child_stack_frame(body, args, module, allocator)? {
                ExecutionOutcome::Trap(trap) => Ok(Step::Trap(trap)),
                ExecutionOutcome::Value(Some(value)) => {
                    frame.push_result(value);
                    Ok(Step::Continue)
                }
                ExecutionOutcome::Value(None) => Ok(Step::Continue),
            }
        }
    }
}
