//! # Executor Benchmarks
//!
//! Measures the reference executor on loops of a fixed trip count.
//!
//! Run: `cargo bench --bench exec_bench`

use accir_core::{Executor, compile};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn countdown(n: i32) -> String {
    format!(
        "MOVER AREG, N\n\
         LOOP: SUB AREG, 1\n\
         MOVEM AREG, N\n\
         COMP AREG, 1\n\
         BC GE, LOOP\n\
         STOP\n\
         N DC {}\n",
        n
    )
}

fn bench_countdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("exec_countdown");

    for n in [10, 1_000, 100_000] {
        let module = compile(&countdown(n)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &module, |b, module| {
            b.iter(|| {
                black_box(
                    Executor::new(module)
                        .with_step_limit(usize::MAX)
                        .run()
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

fn bench_compile_and_run(c: &mut Criterion) {
    let source = countdown(100);
    c.bench_function("compile_and_run_100", |b| {
        b.iter(|| black_box(accir_core::execute(black_box(&source), 10_000).unwrap()))
    });
}

criterion_group!(benches, bench_countdown, bench_compile_and_run);
criterion_main!(benches);
