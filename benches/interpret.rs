use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use wast_kernel::runtime::{create_allocator, create_instance_from_module};
use wast_kernel::{parse_str, Program};

const COUNTER: &str = r#"
(module
  (func $add (export "add") (param $a i32) (param $b i32) (result i32)
    (i32.add (get_local 0) (get_local 1)))
  (func $fib (export "fib") (param $n i32) (result i32)
    (if (i32.lt_s (get_local 0) (i32.const 2))
      (then (return (get_local 0)))
      (else
        (return
          (i32.add
            (call $fib (i32.sub (get_local 0) (i32.const 1)))
            (call $fib (i32.sub (get_local 0) (i32.const 2))))))))
)
"#;

fn parse_module(source: &str) -> Program {
    parse_str(source).expect("fixture parses")
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse a small module", |b| {
        b.iter(|| parse_module(black_box(COUNTER)));
    });
}

fn bench_instantiate_and_call(c: &mut Criterion) {
    let program = parse_module(COUNTER);
    let module = match &program.body[0] {
        wast_kernel::ast::TopLevel::Module(wast_kernel::ast::Module::Text(m)) => m.clone(),
        _ => unreachable!("fixture is a single text module"),
    };

    c.bench_function("instantiate and run fib(10)", |b| {
        b.iter(|| {
            let mut allocator = create_allocator();
            let instance = create_instance_from_module(
                &mut allocator,
                &wast_kernel::ast::Module::Text(module.clone()),
                &HashMap::new(),
            )
            .expect("instantiates");
            black_box(&instance);
        });
    });
}

criterion_group!(benches, bench_parse, bench_instantiate_and_call);
criterion_main!(benches);
