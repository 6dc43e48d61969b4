//! End-to-end scenarios spanning lexing, parsing, instantiation, and
//! execution together, rather than exercising any one layer in isolation.

use std::collections::HashMap;

use wast_kernel::ast::{Module, TopLevel};
use wast_kernel::runtime::{create_allocator, create_instance_from_module, FunctionInstance};
use wast_kernel::{create_and_execute_child_stack_frame, parse_str, ExecutionOutcome, Value};

fn text_module(source: &str) -> wast_kernel::ast::TextModule {
    let program = parse_str(source).expect("source parses");
    match program.body.into_iter().next() {
        Some(TopLevel::Module(Module::Text(m))) => m,
        other => panic!("expected a single text module, got {other:?}"),
    }
}

#[test]
fn parses_an_empty_module() {
    let module = text_module("(module)");
    assert!(module.fields.is_empty());
}

#[test]
fn parses_memory_func_and_export_fields() {
    let module = text_module(
        r#"(module
             (memory $m 1)
             (func $get (export "get") (result i32) (i32.const 7))
           )"#,
    );
    assert_eq!(module.fields.len(), 3);
}

#[test]
fn flushes_an_inline_export_shorthand_into_its_own_field() {
    let module = text_module(r#"(module (func $f (export "f") (result i32) (i32.const 0)))"#);
    let export_count = module
        .fields
        .iter()
        .filter(|f| matches!(f, wast_kernel::ast::ModuleField::Export(_)))
        .count();
    assert_eq!(export_count, 1, "the shorthand export must surface as its own field");
}

#[test]
fn parses_a_data_segment() {
    let module = text_module(r#"(module (memory 1) (data 0 (i32.const 0) "hi"))"#);
    let has_data = module
        .fields
        .iter()
        .any(|f| matches!(f, wast_kernel::ast::ModuleField::Data(_)));
    assert!(has_data);
}

fn run_exported(module_src: &str, func_name: &str, args: Vec<Value>) -> ExecutionOutcome {
    let module = text_module(module_src);
    let mut allocator = create_allocator();
    let instance = create_instance_from_module(&mut allocator, &Module::Text(module), &HashMap::new())
        .expect("instantiates");
    let export = instance
        .exports
        .iter()
        .find(|e| e.name == func_name)
        .unwrap_or_else(|| panic!("no export named {func_name}"));
    let function = allocator.function(export.addr).unwrap().clone();
    let body = match function {
        FunctionInstance::Local { body, .. } => body,
        FunctionInstance::External { .. } => panic!("{func_name} is not a local function"),
    };
    create_and_execute_child_stack_frame(body, args, &instance, &mut allocator).unwrap()
}

#[test]
fn get_local_and_i32_add_yield_two() {
    let outcome = run_exported(
        r#"(module (func $add (export "add") (param $a i32) (param $b i32) (result i32)
              (i32.add (get_local 0) (get_local 1))))"#,
        "add",
        vec![Value::I32(1), Value::I32(1)],
    );
    match outcome {
        ExecutionOutcome::Value(Some(Value::I32(2))) => {}
        ExecutionOutcome::Trap(trap) => panic!("unexpected trap: {trap}"),
        _ => panic!("expected Value(I32(2))"),
    }
}

#[test]
fn f32_min_preserves_signed_zero() {
    let outcome = run_exported(
        r#"(module (func $m (export "m") (result f32)
              (f32.min (f32.const -0.0) (f32.const 0.0))))"#,
        "m",
        vec![],
    );
    match outcome {
        ExecutionOutcome::Value(Some(Value::F32(v))) => assert!(v.is_sign_negative()),
        _ => panic!("expected a negative-zero f32 result"),
    }
}

#[test]
fn f32_min_propagates_nan() {
    let outcome = run_exported(
        r#"(module (func $m (export "m") (result f32)
              (f32.min (f32.const nan) (f32.const 1.0))))"#,
        "m",
        vec![],
    );
    match outcome {
        ExecutionOutcome::Value(Some(Value::F32(v))) => assert!(v.is_nan()),
        _ => panic!("expected a NaN f32 result"),
    }
}

#[test]
fn recursive_call_computes_fibonacci() {
    let outcome = run_exported(
        r#"(module
             (func $fib (export "fib") (param $n i32) (result i32)
               (if (i32.lt_s (get_local 0) (i32.const 2))
                 (then (return (get_local 0)))
                 (else
                   (return
                     (i32.add
                       (call $fib (i32.sub (get_local 0) (i32.const 1)))
                       (call $fib (i32.sub (get_local 0) (i32.const 2)))))))))"#,
        "fib",
        vec![Value::I32(7)],
    );
    match outcome {
        ExecutionOutcome::Value(Some(Value::I32(13))) => {}
        _ => panic!("expected fib(7) == 13"),
    }
}

#[test]
fn division_by_zero_traps_instead_of_erroring() {
    let outcome = run_exported(
        r#"(module (func $d (export "d") (result i32)
              (i32.div_s (i32.const 1) (i32.const 0))))"#,
        "d",
        vec![],
    );
    assert!(matches!(outcome, ExecutionOutcome::Trap(_)));
}

#[test]
fn br_with_a_named_label_exits_the_matching_enclosing_block() {
    let outcome = run_exported(
        r#"(module (func $f (export "f") (result i32)
              (block $outer (result i32)
                (block $inner
                  (i32.const 1)
                  (br $outer))
                (i32.const 0))))"#,
        "f",
        vec![],
    );
    match outcome {
        ExecutionOutcome::Value(Some(Value::I32(1))) => {}
        ExecutionOutcome::Trap(trap) => panic!("unexpected trap: {trap}"),
        _ => panic!("expected Value(I32(1)), the outer block's const, not the inner block's"),
    }
}

#[test]
fn br_table_with_named_targets_dispatches_to_the_matching_label() {
    let source = r#"(module (func $pick (export "pick") (param $sel i32) (result i32)
        (block $two (result i32)
          (block $one
            (block $zero
              (br_table $zero $one $two (get_local 0)))
            (return (i32.const 100)))
          (return (i32.const 200)))
        (i32.const 300)))"#;

    for (sel, expected) in [(0, 100), (1, 200), (2, 300), (99, 300)] {
        let outcome = run_exported(source, "pick", vec![Value::I32(sel)]);
        match outcome {
            ExecutionOutcome::Value(Some(Value::I32(v))) => {
                assert_eq!(v, expected, "selector {sel} should dispatch to {expected}")
            }
            ExecutionOutcome::Trap(trap) => panic!("unexpected trap for selector {sel}: {trap}"),
            _ => panic!("expected an i32 result for selector {sel}"),
        }
    }
}

#[test]
fn call_indirect_resolves_an_inline_table_elem_shorthand() {
    let source = r#"(module
        (func $double (param $x i32) (result i32) (i32.mul (get_local 0) (i32.const 2)))
        (func $square (param $x i32) (result i32) (i32.mul (get_local 0) (get_local 0)))
        (table $t (elem $double $square))
        (type $sig (func (param i32) (result i32)))
        (func $apply (export "apply") (param $which i32) (param $x i32) (result i32)
          (call_indirect (type $sig) (get_local 1) (get_local 0))))"#;

    let outcome = run_exported(source, "apply", vec![Value::I32(0), Value::I32(5)]);
    match outcome {
        ExecutionOutcome::Value(Some(Value::I32(10))) => {}
        ExecutionOutcome::Trap(trap) => panic!("unexpected trap: {trap}"),
        _ => panic!("expected $double(5) == 10 via the inline table shorthand"),
    }

    let outcome = run_exported(source, "apply", vec![Value::I32(1), Value::I32(5)]);
    match outcome {
        ExecutionOutcome::Value(Some(Value::I32(25))) => {}
        ExecutionOutcome::Trap(trap) => panic!("unexpected trap: {trap}"),
        _ => panic!("expected $square(5) == 25 via the inline table shorthand"),
    }
}

#[test]
fn out_of_bounds_store_traps() {
    let outcome = run_exported(
        r#"(module (memory 1)
             (func $s (export "s")
               (i32.store (i32.const 65536) (i32.const 1))))"#,
        "s",
        vec![],
    );
    assert!(matches!(outcome, ExecutionOutcome::Trap(_)));
}
