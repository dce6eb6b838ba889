//! Datalog fixed-point evaluation throughput over synthetic points-to
//! chains of increasing length.

use anteater::datalog::rules::default_rules;
use anteater::datalog::DatalogEngine;
use anteater::facts::FactExtractor;
use anteater::ir::builders::CfgBuilder;
use anteater::ir::{FileIr, FunctionIr, Value};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

/// A straight-line function allocating `n` objects and copying each into
/// the next variable, producing an `n`-long `VarPointsTo` derivation
/// chain once `CopyRule` is applied to a fixed point.
fn synthetic_file(n: u32) -> FileIr {
    let mut b = CfgBuilder::new("bench_fn");
    let entry = b.entry();
    b.assign(entry, "v0", Value::NewObject { ty: "Widget".to_string(), ctor: None, args: vec![] });
    for i in 1..n {
        b.assign(entry, format!("v{i}"), Value::var(format!("v{}", i - 1)));
    }
    b.ret(entry, None);
    let function = FunctionIr {
        qualified_name: "bench_fn".to_string(),
        cfg: b.build(),
        parameters: vec![],
        source_file: "bench.dart".to_string(),
        start_offset: 0,
        end_offset: n as usize,
    };
    let mut file = FileIr::new("bench.dart");
    file.functions.push(function);
    file
}

fn bench_points_to_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("points_to_chain");
    for size in [100u32, 1_000, 5_000] {
        let file = synthetic_file(size);
        let mut extractor = FactExtractor::new();
        let facts = extractor.extract_file(&file);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut engine = DatalogEngine::new(default_rules());
                engine.load_facts(facts.clone());
                engine.run();
                engine.query("VarPointsTo").len()
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));
    targets = bench_points_to_chain
}
criterion_main!(benches);
