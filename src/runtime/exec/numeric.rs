//! `*.const` and the binary/unary numeric operators, dispatched through the
//! same opcode signature table the parser uses to decide operand arity.

use crate::ast::Instr;
use crate::error::RuntimeError;
use crate::parser::signatures::{self, Arity};
use crate::runtime::frame::{Step, StackFrame};
use crate::runtime::values;

pub fn execute_const(frame: &mut StackFrame, instr: &Instr) -> Result<Step, RuntimeError> {
    let operand = instr
        .args
        .first()
        .ok_or_else(|| RuntimeError::MissingArgument(instr.id.clone()))?;
    let lit = match operand {
        crate::ast::Operand::Literal(lit) => lit,
        crate::ast::Operand::Nested(_) | crate::ast::Operand::Label(_) => {
            return Err(RuntimeError::NonNumericIndex)
        }
    };
    let ty = instr.object.ok_or_else(|| RuntimeError::UnsupportedOperation {
        object: "?".to_string(),
        op: instr.id.clone(),
    })?;
    frame.push_result(values::Value::create(ty, lit.value.as_f64()));
    Ok(Step::Continue)
}

/// Pops the operands a binop/unop declares in the signature table and
/// applies [`values::binop`]/[`values::unop`].
pub fn execute_numeric(frame: &mut StackFrame, instr: &Instr) -> Result<Step, RuntimeError> {
    let object = instr.object.ok_or_else(|| RuntimeError::UnsupportedOperation {
        object: "?".to_string(),
        op: instr.id.clone(),
    })?;
    let signature = signatures::lookup(Some(object), &instr.id).ok_or_else(|| {
        RuntimeError::UnsupportedOperation {
            object: object.name().to_string(),
            op: instr.id.clone(),
        }
    })?;

    match signature.arity {
        Arity::Stack(2) => {
            let (lhs, rhs) = frame.pop2()?;
            match values::binop(&instr.id, lhs, rhs)? {
                Ok(value) => {
                    frame.push_result(value);
                    Ok(Step::Continue)
                }
                Err(trap) => Ok(Step::Trap(trap)),
            }
        }
        Arity::Stack(1) => {
            let operand = frame.pop1()?;
            match values::unop(&instr.id, operand)? {
                Ok(value) => {
                    frame.push_result(value);
                    Ok(Step::Continue)
                }
                Err(trap) => Ok(Step::Trap(trap)),
            }
        }
        _ => Err(RuntimeError::UnsupportedOperation {
            object: object.name().to_string(),
            op: instr.id.clone(),
        }),
    }
}
