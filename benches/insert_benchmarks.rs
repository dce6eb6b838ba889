//! Abstract-interpretation worklist throughput over synthetic loop CFGs
//! of increasing size, exercising the interval lattice's widen/narrow path.

use anteater::absint::lattice::Interval;
use anteater::absint::{AnalysisState, Solver};
use anteater::ir::builders::CfgBuilder;
use anteater::ir::{BinaryOperator, Value};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

/// A chain of `n` back-to-back loop headers, each incrementing a counter
/// and branching back on itself before falling through to the next — forces
/// the solver to widen at every header rather than converging in one pass.
fn synthetic_loop_chain(n: u32) -> anteater::ir::ControlFlowGraph {
    let mut b = CfgBuilder::new("loop_fn");
    let entry = b.entry();
    b.assign(entry, "i", Value::int(0));
    let mut prev = entry;
    for _ in 0..n {
        let header = b.block();
        let body = b.block();
        let exit = b.block();
        b.jump(prev, header);
        b.branch(header, Value::var("i"), body, exit);
        b.assign(body, "i", Value::BinaryOp { op: BinaryOperator::Add, left: Box::new(Value::var("i")), right: Box::new(Value::int(1)) });
        b.jump(body, header);
        prev = exit;
    }
    b.ret(prev, Some(Value::var("i")));
    b.build()
}

fn bench_interval_worklist(c: &mut Criterion) {
    let mut group = c.benchmark_group("interval_worklist");
    for size in [10u32, 50, 200] {
        let cfg = synthetic_loop_chain(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let solver = Solver::new();
                let result = solver.analyze::<Interval>(&cfg, AnalysisState::empty());
                result.exit_states.len()
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
    targets = bench_interval_worklist
}
criterion_main!(benches);
