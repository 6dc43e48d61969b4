//! Typed runtime values and the numeric operator table the instruction
//! executors dispatch into.
//!
//! A `Value` is always tagged with its type by construction (unlike the
//! AST's `NumberLiteral`, whose `ty` is optional until the parser's
//! signature table assigns one) — there is no untyped runtime number.

use crate::ast::ValueType;
use crate::error::RuntimeError;
use crate::runtime::trap::Trap;

/// A typed runtime value. `label`, the fifth value kind the interpreter's
/// value model names, never appears here: this crate represents label
/// bookkeeping as a separate stack of `Label` entries on the frame rather
/// than as a tagged stack value (see `runtime::frame`), since a
/// tree-walking executor resolves branches by control signal, not by
/// scanning the operand stack for markers. Recorded as a design decision
/// in DESIGN.md.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn value_type(self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// `<ty>.create_value(x)`: wraps integers modulo 2^32/2^64, truncating
    /// any fractional part; floats pass through unchanged.
    pub fn create(ty: ValueType, x: f64) -> Value {
        match ty {
            ValueType::I32 => Value::I32(create_i32(x)),
            ValueType::I64 => Value::I64(create_i64(x)),
            ValueType::F32 => Value::F32(x as f32),
            ValueType::F64 => Value::F64(x),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Value::I32(i) => i as f64,
            Value::I64(i) => i as f64,
            Value::F32(f) => f as f64,
            Value::F64(f) => f,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Value::I32(i) => i == 0,
            Value::I64(i) => i == 0,
            Value::F32(f) => f == 0.0,
            Value::F64(f) => f == 0.0,
        }
    }
}

fn create_i32(x: f64) -> i32 {
    let modulus = 1i128 << 32;
    let wrapped = (((x.trunc() as i128) % modulus) + modulus) % modulus;
    wrapped as u32 as i32
}

fn create_i64(x: f64) -> i64 {
    let modulus = 1i128 << 64;
    let wrapped = (((x.trunc() as i128) % modulus) + modulus) % modulus;
    wrapped as u64 as i64
}

fn type_name(v: Value) -> String {
    v.value_type().name().to_string()
}

fn unsupported(object: ValueType, op: &str) -> RuntimeError {
    RuntimeError::UnsupportedOperation {
        object: object.name().to_string(),
        op: op.to_string(),
    }
}

/// `lhs <op> rhs`, dispatching on `lhs`'s runtime type (both operands are
/// required to already share a type — the parser's signature table and
/// the opcode's `object` prefix guarantee this for well-formed input; a
/// mismatch here is a producer bug, not a user-facing trap).
pub fn binop(op: &str, lhs: Value, rhs: Value) -> Result<Result<Value, Trap>, RuntimeError> {
    use Value::*;

    let object = lhs.value_type();
    if rhs.value_type() != object {
        return Err(RuntimeError::TypeMismatch {
            expected: type_name(lhs),
            found: type_name(rhs),
        });
    }

    macro_rules! int_only {
        ($f:expr) => {
            match (lhs, rhs) {
                (I32(a), I32(b)) => Ok(Value::I32($f(a, b) as i32)),
                (I64(a), I64(b)) => Ok(Value::I64($f(a as i64, b as i64) as i64)),
                _ => Err(unsupported(object, op)),
            }
        };
    }

    let ok = |v: Value| Ok(Ok(v));

    match op {
        "add" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(a.wrapping_add(b))),
            (I64(a), I64(b)) => ok(I64(a.wrapping_add(b))),
            (F32(a), F32(b)) => ok(F32(a + b)),
            (F64(a), F64(b)) => ok(F64(a + b)),
            _ => Err(unsupported(object, op)),
        },
        "sub" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(a.wrapping_sub(b))),
            (I64(a), I64(b)) => ok(I64(a.wrapping_sub(b))),
            (F32(a), F32(b)) => ok(F32(a - b)),
            (F64(a), F64(b)) => ok(F64(a - b)),
            _ => Err(unsupported(object, op)),
        },
        "mul" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(a.wrapping_mul(b))),
            (I64(a), I64(b)) => ok(I64(a.wrapping_mul(b))),
            (F32(a), F32(b)) => ok(F32(a * b)),
            (F64(a), F64(b)) => ok(F64(a * b)),
            _ => Err(unsupported(object, op)),
        },
        "div" => match (lhs, rhs) {
            (F32(a), F32(b)) => ok(F32(a / b)),
            (F64(a), F64(b)) => ok(F64(a / b)),
            _ => Err(unsupported(object, op)),
        },
        "div_s" => match (lhs, rhs) {
            (I32(_), I32(0)) | (I64(_), I64(0)) => Ok(Err(Trap::new("integer divide by zero"))),
            (I32(a), I32(b)) => {
                if a == i32::MIN && b == -1 {
                    Ok(Err(Trap::new("integer overflow")))
                } else {
                    ok(I32(a / b))
                }
            }
            (I64(a), I64(b)) => {
                if a == i64::MIN && b == -1 {
                    Ok(Err(Trap::new("integer overflow")))
                } else {
                    ok(I64(a / b))
                }
            }
            _ => Err(unsupported(object, op)),
        },
        "div_u" => match (lhs, rhs) {
            (I32(_), I32(0)) | (I64(_), I64(0)) => Ok(Err(Trap::new("integer divide by zero"))),
            (I32(a), I32(b)) => ok(I32(((a as u32) / (b as u32)) as i32)),
            (I64(a), I64(b)) => ok(I64(((a as u64) / (b as u64)) as i64)),
            _ => Err(unsupported(object, op)),
        },
        "rem_s" => match (lhs, rhs) {
            (I32(_), I32(0)) | (I64(_), I64(0)) => Ok(Err(Trap::new("integer divide by zero"))),
            (I32(a), I32(b)) => ok(I32(if a == i32::MIN && b == -1 { 0 } else { a % b })),
            (I64(a), I64(b)) => ok(I64(if a == i64::MIN && b == -1 { 0 } else { a % b })),
            _ => Err(unsupported(object, op)),
        },
        "rem_u" => match (lhs, rhs) {
            (I32(_), I32(0)) | (I64(_), I64(0)) => Ok(Err(Trap::new("integer divide by zero"))),
            (I32(a), I32(b)) => ok(I32(((a as u32) % (b as u32)) as i32)),
            (I64(a), I64(b)) => ok(I64(((a as u64) % (b as u64)) as i64)),
            _ => Err(unsupported(object, op)),
        },
        "and" => int_only!(|a: i64, b: i64| a & b),
        "or" => int_only!(|a: i64, b: i64| a | b),
        "xor" => int_only!(|a: i64, b: i64| a ^ b),
        "shl" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(a.wrapping_shl(b as u32))),
            (I64(a), I64(b)) => ok(I64(a.wrapping_shl(b as u32))),
            _ => Err(unsupported(object, op)),
        },
        "shr_s" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(a.wrapping_shr(b as u32))),
            (I64(a), I64(b)) => ok(I64(a.wrapping_shr(b as u32))),
            _ => Err(unsupported(object, op)),
        },
        "shr_u" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32((a as u32).wrapping_shr(b as u32) as i32)),
            (I64(a), I64(b)) => ok(I64((a as u64).wrapping_shr(b as u32) as i64)),
            _ => Err(unsupported(object, op)),
        },
        "rotl" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32((a as u32).rotate_left(b as u32) as i32)),
            (I64(a), I64(b)) => ok(I64((a as u64).rotate_left(b as u32) as i64)),
            _ => Err(unsupported(object, op)),
        },
        "rotr" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32((a as u32).rotate_right(b as u32) as i32)),
            (I64(a), I64(b)) => ok(I64((a as u64).rotate_right(b as u32) as i64)),
            _ => Err(unsupported(object, op)),
        },
        "min" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(a.min(b))),
            (I64(a), I64(b)) => ok(I64(a.min(b))),
            (F32(a), F32(b)) => ok(F32(float_min(a, b))),
            (F64(a), F64(b)) => ok(F64(float_min(a, b))),
            _ => Err(unsupported(object, op)),
        },
        "max" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(a.max(b))),
            (I64(a), I64(b)) => ok(I64(a.max(b))),
            (F32(a), F32(b)) => ok(F32(float_max(a, b))),
            (F64(a), F64(b)) => ok(F64(float_max(a, b))),
            _ => Err(unsupported(object, op)),
        },
        "copysign" => match (lhs, rhs) {
            (F32(a), F32(b)) => ok(F32(a.copysign(b))),
            (F64(a), F64(b)) => ok(F64(a.copysign(b))),
            _ => Err(unsupported(object, op)),
        },
        "eq" => ok(I32(bool_i32(values_eq(lhs, rhs)))),
        "ne" => ok(I32(bool_i32(!values_eq(lhs, rhs)))),
        "lt" => match (lhs, rhs) {
            (F32(a), F32(b)) => ok(I32(bool_i32(a < b))),
            (F64(a), F64(b)) => ok(I32(bool_i32(a < b))),
            _ => Err(unsupported(object, op)),
        },
        "gt" => match (lhs, rhs) {
            (F32(a), F32(b)) => ok(I32(bool_i32(a > b))),
            (F64(a), F64(b)) => ok(I32(bool_i32(a > b))),
            _ => Err(unsupported(object, op)),
        },
        "le" => match (lhs, rhs) {
            (F32(a), F32(b)) => ok(I32(bool_i32(a <= b))),
            (F64(a), F64(b)) => ok(I32(bool_i32(a <= b))),
            _ => Err(unsupported(object, op)),
        },
        "ge" => match (lhs, rhs) {
            (F32(a), F32(b)) => ok(I32(bool_i32(a >= b))),
            (F64(a), F64(b)) => ok(I32(bool_i32(a >= b))),
            _ => Err(unsupported(object, op)),
        },
        "lt_s" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(bool_i32(a < b))),
            (I64(a), I64(b)) => ok(I32(bool_i32(a < b))),
            _ => Err(unsupported(object, op)),
        },
        "lt_u" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(bool_i32((a as u32) < (b as u32)))),
            (I64(a), I64(b)) => ok(I32(bool_i32((a as u64) < (b as u64)))),
            _ => Err(unsupported(object, op)),
        },
        "gt_s" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(bool_i32(a > b))),
            (I64(a), I64(b)) => ok(I32(bool_i32(a > b))),
            _ => Err(unsupported(object, op)),
        },
        "gt_u" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(bool_i32((a as u32) > (b as u32)))),
            (I64(a), I64(b)) => ok(I32(bool_i32((a as u64) > (b as u64)))),
            _ => Err(unsupported(object, op)),
        },
        "le_s" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(bool_i32(a <= b))),
            (I64(a), I64(b)) => ok(I32(bool_i32(a <= b))),
            _ => Err(unsupported(object, op)),
        },
        "le_u" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(bool_i32((a as u32) <= (b as u32)))),
            (I64(a), I64(b)) => ok(I32(bool_i32((a as u64) <= (b as u64)))),
            _ => Err(unsupported(object, op)),
        },
        "ge_s" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(bool_i32(a >= b))),
            (I64(a), I64(b)) => ok(I32(bool_i32(a >= b))),
            _ => Err(unsupported(object, op)),
        },
        "ge_u" => match (lhs, rhs) {
            (I32(a), I32(b)) => ok(I32(bool_i32((a as u32) >= (b as u32)))),
            (I64(a), I64(b)) => ok(I32(bool_i32((a as u64) >= (b as u64)))),
            _ => Err(unsupported(object, op)),
        },
        _ => Err(unsupported(object, op)),
    }
}

/// `<op> operand`, dispatching on `operand`'s runtime type.
pub fn unop(op: &str, operand: Value) -> Result<Result<Value, Trap>, RuntimeError> {
    use Value::*;

    let object = operand.value_type();
    let ok = |v: Value| Ok(Ok(v));

    match op {
        "eqz" => match operand {
            I32(a) => ok(I32(bool_i32(a == 0))),
            I64(a) => ok(I32(bool_i32(a == 0))),
            _ => Err(unsupported(object, op)),
        },
        "clz" => match operand {
            I32(a) => ok(I32(a.leading_zeros() as i32)),
            I64(a) => ok(I64(a.leading_zeros() as i64)),
            _ => Err(unsupported(object, op)),
        },
        "ctz" => match operand {
            I32(a) => ok(I32(a.trailing_zeros() as i32)),
            I64(a) => ok(I64(a.trailing_zeros() as i64)),
            _ => Err(unsupported(object, op)),
        },
        "popcnt" => match operand {
            I32(a) => ok(I32(a.count_ones() as i32)),
            I64(a) => ok(I64(a.count_ones() as i64)),
            _ => Err(unsupported(object, op)),
        },
        "abs" => match operand {
            F32(a) => ok(F32(a.abs())),
            F64(a) => ok(F64(a.abs())),
            _ => Err(unsupported(object, op)),
        },
        "neg" => match operand {
            F32(a) => ok(F32(-a)),
            F64(a) => ok(F64(-a)),
            _ => Err(unsupported(object, op)),
        },
        "sqrt" => match operand {
            F32(a) => ok(F32(a.sqrt())),
            F64(a) => ok(F64(a.sqrt())),
            _ => Err(unsupported(object, op)),
        },
        "ceil" => match operand {
            F32(a) => ok(F32(a.ceil())),
            F64(a) => ok(F64(a.ceil())),
            _ => Err(unsupported(object, op)),
        },
        "floor" => match operand {
            F32(a) => ok(F32(a.floor())),
            F64(a) => ok(F64(a.floor())),
            _ => Err(unsupported(object, op)),
        },
        "trunc" => match operand {
            F32(a) => ok(F32(a.trunc())),
            F64(a) => ok(F64(a.trunc())),
            _ => Err(unsupported(object, op)),
        },
        "nearest" => match operand {
            F32(a) => ok(F32(round_ties_even_f32(a))),
            F64(a) => ok(F64(round_ties_even_f64(a))),
            _ => Err(unsupported(object, op)),
        },
        "wrap_i64" => match operand {
            I64(a) => ok(I32(a as i32)),
            _ => Err(unsupported(object, op)),
        },
        "extend_i32_s" => match operand {
            I32(a) => ok(I64(a as i64)),
            _ => Err(unsupported(object, op)),
        },
        "extend_i32_u" => match operand {
            I32(a) => ok(I64((a as u32) as i64)),
            _ => Err(unsupported(object, op)),
        },
        "convert_i32_s" => match (object, operand) {
            (ValueType::F32, I32(a)) => ok(F32(a as f32)),
            (ValueType::F64, I32(a)) => ok(F64(a as f64)),
            _ => Err(unsupported(object, op)),
        },
        "convert_i32_u" => match (object, operand) {
            (ValueType::F32, I32(a)) => ok(F32((a as u32) as f32)),
            (ValueType::F64, I32(a)) => ok(F64((a as u32) as f64)),
            _ => Err(unsupported(object, op)),
        },
        "convert_i64_s" => match (object, operand) {
            (ValueType::F32, I64(a)) => ok(F32(a as f32)),
            (ValueType::F64, I64(a)) => ok(F64(a as f64)),
            _ => Err(unsupported(object, op)),
        },
        "convert_i64_u" => match (object, operand) {
            (ValueType::F32, I64(a)) => ok(F32((a as u64) as f32)),
            (ValueType::F64, I64(a)) => ok(F64((a as u64) as f64)),
            _ => Err(unsupported(object, op)),
        },
        "demote_f64" => match operand {
            F64(a) => ok(F32(a as f32)),
            _ => Err(unsupported(object, op)),
        },
        "promote_f32" => match operand {
            F32(a) => ok(F64(a as f64)),
            _ => Err(unsupported(object, op)),
        },
        "trunc_f32_s" | "trunc_f64_s" => match operand {
            F32(a) => trunc_to_int(a as f64, object, op),
            F64(a) => trunc_to_int(a, object, op),
            _ => Err(unsupported(object, op)),
        },
        "trunc_f32_u" | "trunc_f64_u" => match operand {
            F32(a) => trunc_to_uint(a as f64, object, op),
            F64(a) => trunc_to_uint(a, object, op),
            _ => Err(unsupported(object, op)),
        },
        "reinterpret" => match operand {
            I32(a) => ok(F32(f32::from_bits(a as u32))),
            I64(a) => ok(F64(f64::from_bits(a as u64))),
            F32(a) => ok(I32(a.to_bits() as i32)),
            F64(a) => ok(I64(a.to_bits() as i64)),
        },
        _ => Err(unsupported(object, op)),
    }
}

fn trunc_to_int(x: f64, target: ValueType, op: &str) -> Result<Result<Value, Trap>, RuntimeError> {
    if x.is_nan() {
        return Ok(Err(Trap::new("invalid conversion to integer")));
    }
    let t = x.trunc();
    match target {
        ValueType::I32 if (i32::MIN as f64..=i32::MAX as f64).contains(&t) => {
            Ok(Ok(Value::I32(t as i32)))
        }
        ValueType::I64 if (i64::MIN as f64..=i64::MAX as f64).contains(&t) => {
            Ok(Ok(Value::I64(t as i64)))
        }
        ValueType::I32 | ValueType::I64 => Ok(Err(Trap::new("integer overflow"))),
        _ => Err(unsupported(target, op)),
    }
}

fn trunc_to_uint(x: f64, target: ValueType, op: &str) -> Result<Result<Value, Trap>, RuntimeError> {
    if x.is_nan() {
        return Ok(Err(Trap::new("invalid conversion to integer")));
    }
    let t = x.trunc();
    match target {
        ValueType::I32 if (0.0..=u32::MAX as f64).contains(&t) => Ok(Ok(Value::I32(t as u32 as i32))),
        ValueType::I64 if (0.0..=u64::MAX as f64).contains(&t) => Ok(Ok(Value::I64(t as u64 as i64))),
        ValueType::I32 | ValueType::I64 => Ok(Err(Trap::new("integer overflow"))),
        _ => Err(unsupported(target, op)),
    }
}

fn bool_i32(b: bool) -> i32 {
    if b {
        1
    } else {
        0
    }
}

fn values_eq(lhs: Value, rhs: Value) -> bool {
    match (lhs, rhs) {
        (Value::I32(a), Value::I32(b)) => a == b,
        (Value::I64(a), Value::I64(b)) => a == b,
        (Value::F32(a), Value::F32(b)) => a == b,
        (Value::F64(a), Value::F64(b)) => a == b,
        _ => false,
    }
}

/// `min`, preserving the sign of zero (`min(+0,-0) = -0`) and propagating
/// NaN, per IEEE-754 and this crate's testable invariants.
fn float_min(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_negative() || b.is_sign_negative() {
            -0.0
        } else {
            0.0
        }
    } else {
        a.min(b)
    }
}

fn float_max(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_positive() || b.is_sign_positive() {
            0.0
        } else {
            -0.0
        }
    } else {
        a.max(b)
    }
}

fn round_ties_even_f32(a: f32) -> f32 {
    let rounded = a.round();
    if (a - a.trunc()).abs() == 0.5 && (rounded as i64) % 2 != 0 {
        rounded - a.signum()
    } else {
        rounded
    }
}

fn round_ties_even_f64(a: f64) -> f64 {
    let rounded = a.round();
    if (a - a.trunc()).abs() == 0.5 && (rounded as i64) % 2 != 0 {
        rounded - a.signum()
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_i32_wraps_modulo_2_32() {
        assert_eq!(create_i32(4294967296.0 + 5.0), 5);
        assert_eq!(create_i32(-1.0), -1);
        assert_eq!(Value::create(ValueType::I32, 3.7).value_type(), ValueType::I32);
    }

    #[test]
    fn float_min_max_preserve_signed_zero() {
        assert_eq!(float_min(0.0, -0.0).is_sign_negative(), true);
        assert_eq!(float_max(0.0, -0.0).is_sign_negative(), false);
    }

    #[test]
    fn float_min_max_propagate_nan() {
        assert!(float_min(f32::NAN, 1.0).is_nan());
        assert!(float_max(f32::NAN, 1.0).is_nan());
    }

    #[test]
    fn add_wraps_on_overflow() {
        let result = binop("add", Value::I32(i32::MAX), Value::I32(1)).unwrap().unwrap();
        assert_eq!(result, Value::I32(i32::MIN));
    }

    #[test]
    fn div_s_traps_on_division_by_zero() {
        let result = binop("div_s", Value::I32(1), Value::I32(0)).unwrap();
        assert!(result.is_err());
    }
}
