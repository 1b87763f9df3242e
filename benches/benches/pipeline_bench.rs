//! # Pipeline Benchmarks
//!
//! Measures each compilation phase (parse, plan + lower + normalize, print)
//! on generated programs of growing size.
//!
//! Run: `cargo bench --bench pipeline_bench`

use accir_core::{Compiler, compile, parse};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Straight-line blocks joined by labelled loops
fn generate_program(blocks: usize) -> String {
    let mut source = String::from("START 100\n");
    for i in 0..blocks {
        source.push_str(&format!("L{}: MOVER AREG, X\n", i));
        source.push_str("ADD AREG, ONE\n");
        source.push_str("MULT AREG, 3\n");
        source.push_str("MOVEM AREG, X\n");
        source.push_str("COMP AREG, LIMIT\n");
        source.push_str(&format!("BC GE, L{}\n", i / 2));
    }
    source.push_str("STOP\nX DC 0\nONE DC 1\nLIMIT DC 1000\nEND\n");
    source
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for blocks in [10, 100, 1000] {
        let source = generate_program(blocks);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &source, |b, source| {
            b.iter(|| black_box(parse(source).unwrap()))
        });
    }

    group.finish();
}

fn bench_lower(c: &mut Criterion) {
    let mut group = c.benchmark_group("lower");
    let compiler = Compiler::new();

    for blocks in [10, 100, 1000] {
        let program = parse(&generate_program(blocks)).unwrap();
        group.throughput(Throughput::Elements(program.instructions().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &program, |b, program| {
            b.iter(|| black_box(compiler.lower(program).unwrap()))
        });
    }

    group.finish();
}

fn bench_print(c: &mut Criterion) {
    let mut group = c.benchmark_group("print");

    for blocks in [10, 100, 1000] {
        let module = compile(&generate_program(blocks)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &module, |b, module| {
            b.iter(|| black_box(module.to_string()))
        });
    }

    group.bench_function("json_100", |b| {
        let module = compile(&generate_program(100)).unwrap();
        b.iter(|| black_box(module.to_json().unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_lower, bench_print);
criterion_main!(benches);
