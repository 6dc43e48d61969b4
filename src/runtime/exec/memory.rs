//! Local/global accessors and linear-memory load/store executors.

use std::collections::BTreeMap;

use crate::ast::{Instr, NumberLiteral, Operand, ValueType};
use crate::error::RuntimeError;
use crate::runtime::allocator::{Allocator, Memory};
use crate::runtime::exec::literal_u32;
use crate::runtime::frame::{
    create_and_execute_child_stack_frame, ExecutionOutcome, Step, StackFrame,
};
use crate::runtime::instance::ModuleInstance;
use crate::runtime::trap::Trap;
use crate::runtime::values::Value;

pub fn execute_get_local(frame: &mut StackFrame, instr: &Instr) -> Result<Step, RuntimeError> {
    let index = literal_u32(first_arg(instr)?)?;
    let value = frame.get_local_by_index(index)?;
    frame.push_result(value);
    Ok(Step::Continue)
}

/// `set_local`/`tee_local`: the second operand, when present as a nested
/// folded instruction, is evaluated in its own child frame (per the
/// execution model's two-form rule); a literal second operand is coerced
/// directly; with no second operand the new value is popped off the stack.
/// `tee_local` additionally leaves the assigned value on the stack.
pub fn execute_set_local(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
    tee: bool,
) -> Result<Step, RuntimeError> {
    let index = literal_u32(first_arg(instr)?)?;

    let value = match instr.args.get(1) {
        Some(Operand::Nested(nested)) => {
            let outcome = create_and_execute_child_stack_frame(
                vec![(**nested).clone()],
                frame.locals.clone(),
                module,
                allocator,
            )?;
            match outcome {
                ExecutionOutcome::Trap(trap) => return Ok(Step::Trap(trap)),
                ExecutionOutcome::Value(Some(value)) => value,
                ExecutionOutcome::Value(None) => {
                    return Err(RuntimeError::MissingArgument(instr.id.clone()))
                }
            }
        }
        Some(Operand::Literal(lit)) => {
            frame.cast_into_stack_local_of_type(lit.ty.unwrap_or(ValueType::I32), lit.value.as_f64())
        }
        Some(Operand::Label(_)) => return Err(RuntimeError::NonNumericIndex),
        None => frame.pop1()?,
    };

    frame.set_local_by_index(index, value)?;
    if tee {
        frame.push_result(value);
    }
    Ok(Step::Continue)
}

pub fn execute_get_global(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
) -> Result<Step, RuntimeError> {
    let index = literal_u32(first_arg(instr)?)?;
    let addr = module
        .globaladdrs
        .get(index as usize)
        .copied()
        .ok_or(RuntimeError::UnknownGlobal(index))?;
    frame.push_result(allocator.global(addr)?.value);
    Ok(Step::Continue)
}

pub fn execute_set_global(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
) -> Result<Step, RuntimeError> {
    let index = literal_u32(first_arg(instr)?)?;
    let addr = module
        .globaladdrs
        .get(index as usize)
        .copied()
        .ok_or(RuntimeError::UnknownGlobal(index))?;
    let value = frame.pop1()?;
    allocator.global_mut(addr)?.value = value;
    Ok(Step::Continue)
}

fn first_arg(instr: &Instr) -> Result<&Operand, RuntimeError> {
    instr
        .args
        .first()
        .ok_or_else(|| RuntimeError::MissingArgument(instr.id.clone()))
}

pub fn is_load_store(id: &str) -> bool {
    matches!(
        id,
        "load"
            | "load8_s"
            | "load8_u"
            | "load16_s"
            | "load16_u"
            | "load32_s"
            | "load32_u"
            | "store"
            | "store8"
            | "store16"
            | "store32"
    )
}

/// Runs a load or a store. The address operand was already pushed onto the
/// stack by [`super::push_stack_args`] (and, for stores, the value operand
/// ahead of it); this just pops them back off in the right order.
pub fn execute_load_store(
    frame: &mut StackFrame,
    module: &ModuleInstance,
    allocator: &mut Allocator,
    instr: &Instr,
) -> Result<Step, RuntimeError> {
    let object = instr.object.ok_or_else(|| RuntimeError::UnsupportedOperation {
        object: "?".to_string(),
        op: instr.id.clone(),
    })?;
    let offset = named_u32(&instr.named_args, "offset").unwrap_or(0);
    let memory_addr = module.memaddrs.first().copied().ok_or(RuntimeError::UnknownMemory(0))?;

    if instr.id.starts_with("store") {
        let value = frame.pop1()?;
        let address = as_u32(frame.pop_typed(ValueType::I32)?)?;
        let bytes = match encode_store_value(object, &instr.id, value) {
            Ok(bytes) => bytes,
            Err(trap) => return Ok(Step::Trap(trap)),
        };
        let memory = allocator.memory_mut(memory_addr)?;
        match memory.write(address.wrapping_add(offset), &bytes) {
            Ok(()) => Ok(Step::Continue),
            Err(trap) => Ok(Step::Trap(trap)),
        }
    } else {
        let address = as_u32(frame.pop_typed(ValueType::I32)?)?;
        let memory = allocator.memory(memory_addr)?;
        match decode_load_value(memory, object, &instr.id, address.wrapping_add(offset)) {
            Ok(value) => {
                frame.push_result(value);
                Ok(Step::Continue)
            }
            Err(trap) => Ok(Step::Trap(trap)),
        }
    }
}

fn as_u32(value: Value) -> Result<u32, RuntimeError> {
    match value {
        Value::I32(v) => Ok(v as u32),
        other => Err(RuntimeError::TypeMismatch {
            expected: "i32".to_string(),
            found: other.value_type().name().to_string(),
        }),
    }
}

fn named_u32(named: &BTreeMap<String, NumberLiteral>, key: &str) -> Option<u32> {
    named.get(key).and_then(NumberLiteral::as_u32)
}

fn decode_load_value(memory: &Memory, object: ValueType, id: &str, addr: u32) -> Result<Value, Trap> {
    use ValueType::*;
    let value = match (object, id) {
        (I32, "load") => Value::I32(i32::from_le_bytes(memory.read(addr, 4)?.try_into().unwrap())),
        (I32, "load8_s") => Value::I32(memory.read(addr, 1)?[0] as i8 as i32),
        (I32, "load8_u") => Value::I32(memory.read(addr, 1)?[0] as i32),
        (I32, "load16_s") => {
            Value::I32(i16::from_le_bytes(memory.read(addr, 2)?.try_into().unwrap()) as i32)
        }
        (I32, "load16_u") => {
            Value::I32(u16::from_le_bytes(memory.read(addr, 2)?.try_into().unwrap()) as i32)
        }
        (I64, "load") => Value::I64(i64::from_le_bytes(memory.read(addr, 8)?.try_into().unwrap())),
        (I64, "load8_s") => Value::I64(memory.read(addr, 1)?[0] as i8 as i64),
        (I64, "load8_u") => Value::I64(memory.read(addr, 1)?[0] as i64),
        (I64, "load16_s") => {
            Value::I64(i16::from_le_bytes(memory.read(addr, 2)?.try_into().unwrap()) as i64)
        }
        (I64, "load16_u") => {
            Value::I64(u16::from_le_bytes(memory.read(addr, 2)?.try_into().unwrap()) as i64)
        }
        (I64, "load32_s") => {
            Value::I64(i32::from_le_bytes(memory.read(addr, 4)?.try_into().unwrap()) as i64)
        }
        (I64, "load32_u") => {
            Value::I64(u32::from_le_bytes(memory.read(addr, 4)?.try_into().unwrap()) as i64)
        }
        (F32, "load") => Value::F32(f32::from_le_bytes(memory.read(addr, 4)?.try_into().unwrap())),
        (F64, "load") => Value::F64(f64::from_le_bytes(memory.read(addr, 8)?.try_into().unwrap())),
        _ => return Err(Trap::new(format!("unsupported load '{}.{}'", object.name(), id))),
    };
    Ok(value)
}

fn encode_store_value(object: ValueType, id: &str, value: Value) -> Result<Vec<u8>, Trap> {
    use ValueType::*;
    let bytes = match (object, id, value) {
        (I32, "store", Value::I32(v)) => v.to_le_bytes().to_vec(),
        (I32, "store8", Value::I32(v)) => vec![v as u8],
        (I32, "store16", Value::I32(v)) => (v as u16).to_le_bytes().to_vec(),
        (I64, "store", Value::I64(v)) => v.to_le_bytes().to_vec(),
        (I64, "store8", Value::I64(v)) => vec![v as u8],
        (I64, "store16", Value::I64(v)) => (v as u16).to_le_bytes().to_vec(),
        (I64, "store32", Value::I64(v)) => (v as u32).to_le_bytes().to_vec(),
        (F32, "store", Value::F32(v)) => v.to_le_bytes().to_vec(),
        (F64, "store", Value::F64(v)) => v.to_le_bytes().to_vec(),
        (_, _, v) => {
            return Err(Trap::new(format!(
                "unsupported store '{}.{}' for a {} value",
                object.name(),
                id,
                v.value_type().name()
            )))
        }
    };
    Ok(bytes)
}
