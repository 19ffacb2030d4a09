//! Interpreter, fiber and collector benchmarks.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use wrenvm::{Configuration, InterpretResult, Vm};

/// Run `source` in a fresh VM and panic on failure.
fn run(source: &str, config: Configuration) {
    let mut vm = Vm::new(config).expect("vm creation failed");
    let result = vm.interpret("bench", black_box(source));
    assert_eq!(result, InterpretResult::Success, "benchmark script failed");
}

/// Fibonacci benchmark - tests recursive method calls
fn fibonacci_source(n: u32) -> String {
    format!(
        r#"
class Fib {{
  static get(n) {{
    if (n < 2) return n
    return get(n - 1) + get(n - 2)
  }}
}}
var result = Fib.get({})
"#,
        n
    )
}

/// Sum loop benchmark - tests loop performance and arithmetic
fn sum_loop_source(n: u32) -> String {
    format!(
        r#"
var total = 0
var i = 1
while (i <= {}) {{
  total = total + i
  i = i + 1
}}
"#,
        n
    )
}

/// List benchmark - allocation through lists and iteration
fn list_source(n: u32) -> String {
    format!(
        r#"
var list = []
for (i in 0...{}) {{
  list.add(i * 2)
}}
var sum = 0
for (x in list) {{
  sum = sum + x
}}
"#,
        n
    )
}

/// Fiber ping-pong - tests yield and resume
fn fiber_source(n: u32) -> String {
    format!(
        r#"
var producer = Fiber.new {{
  var i = 0
  while (true) {{
    Fiber.yield(i)
    i = i + 1
  }}
}}
var last = 0
for (i in 1..{}) {{
  last = producer.call()
}}
"#,
        n
    )
}

/// Garbage churn - short-lived strings and lists under a small heap
fn churn_source(n: u32) -> String {
    format!(
        r#"
var keep = []
for (i in 1..{}) {{
  var temp = [i, "a" + "b", [i]]
  if (i % 1000 == 0) keep.add(temp)
}}
"#,
        n
    )
}

fn bench_interpreter(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpreter");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for n in [20, 25] {
        let source = fibonacci_source(n);
        group.bench_with_input(BenchmarkId::new("fibonacci", n), &source, |b, s| {
            b.iter(|| run(s, Configuration::default()))
        });
    }

    let source = sum_loop_source(1_000_000);
    group.bench_function("sum_loop", |b| {
        b.iter(|| run(&source, Configuration::default()))
    });

    group.finish();
}

fn bench_lists(c: &mut Criterion) {
    let mut group = c.benchmark_group("lists");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for n in [10_000, 100_000] {
        let source = list_source(n);
        group.bench_with_input(BenchmarkId::new("build_and_sum", n), &source, |b, s| {
            b.iter(|| run(s, Configuration::default()))
        });
    }

    group.finish();
}

fn bench_fibers(c: &mut Criterion) {
    let mut group = c.benchmark_group("fibers");
    group.sample_size(10);

    let source = fiber_source(100_000);
    group.bench_function("yield_resume", |b| {
        b.iter(|| run(&source, Configuration::default()))
    });

    group.finish();
}

fn bench_gc(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let source = churn_source(100_000);
    for growth in [50, 100, 200] {
        let config = Configuration {
            initial_heap_size: 256 * 1024,
            min_heap_size: 256 * 1024,
            heap_growth_percent: growth,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("churn_growth", growth), &config, |b, config| {
            b.iter(|| run(&source, *config))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_interpreter, bench_lists, bench_fibers, bench_gc);
criterion_main!(benches);
