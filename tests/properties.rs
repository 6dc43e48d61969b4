//! Property-based checks for the quantified invariants: wrap arithmetic,
//! signed-zero/NaN float min/max, and unique-name monotonicity.

use quickcheck_macros::quickcheck;

use wast_kernel::ast::{Identifier, UniqueNameGenerator, ValueType};
use wast_kernel::runtime::values::binop;
use wast_kernel::runtime::Value;

#[quickcheck]
fn i32_create_value_wraps_modulo_2_32(n: i64) -> bool {
    // Clamped to stay exactly representable as `f64` (< 2^53); `create_value`
    // takes a host f64, so precision loss above that is expected, not a wrap
    // bug, and would make this property's own arithmetic lie.
    let n = n % (1i64 << 40);
    let expected = (n as i128).rem_euclid(1i128 << 32) as u32 as i32;
    matches!(Value::create(ValueType::I32, n as f64), Value::I32(v) if v == expected)
}

#[quickcheck]
fn i64_create_value_is_a_no_op_for_values_already_in_range(n: i32) -> bool {
    matches!(Value::create(ValueType::I64, n as f64), Value::I64(v) if v == n as i64)
}

#[quickcheck]
fn float_min_is_commutative_away_from_zero_and_nan(a: i16, b: i16) -> bool {
    let (a, b) = (a as f32, b as f32);
    if a == 0.0 || b == 0.0 {
        return true;
    }
    let ab = binop("min", Value::F32(a), Value::F32(b)).unwrap().unwrap();
    let ba = binop("min", Value::F32(b), Value::F32(a)).unwrap().unwrap();
    ab == ba
}

#[test]
fn float_min_prefers_negative_zero() {
    let result = binop("min", Value::F32(0.0), Value::F32(-0.0)).unwrap().unwrap();
    match result {
        Value::F32(v) => assert!(v.is_sign_negative()),
        _ => panic!("expected f32"),
    }
}

#[test]
fn float_max_prefers_positive_zero() {
    let result = binop("max", Value::F32(0.0), Value::F32(-0.0)).unwrap().unwrap();
    match result {
        Value::F32(v) => assert!(v.is_sign_positive()),
        _ => panic!("expected f32"),
    }
}

#[quickcheck]
fn float_min_and_max_propagate_nan(a: i16) -> bool {
    let a = a as f32;
    let min_nan = binop("min", Value::F32(f32::NAN), Value::F32(a)).unwrap().unwrap();
    let max_nan = binop("max", Value::F32(a), Value::F32(f32::NAN)).unwrap().unwrap();
    matches!(min_nan, Value::F32(v) if v.is_nan()) && matches!(max_nan, Value::F32(v) if v.is_nan())
}

#[quickcheck]
fn unique_names_never_repeat_within_a_kind(count: u8) -> bool {
    let count = (count % 64) as u32;
    let mut generator = UniqueNameGenerator::new();
    let names: Vec<Identifier> = (0..count).map(|_| generator.generate("func")).collect();
    let mut seen = std::collections::HashSet::new();
    names.iter().all(|id| seen.insert(id.value.clone()))
}
