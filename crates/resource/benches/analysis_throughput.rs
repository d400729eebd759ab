// Analysis throughput benchmarks.
//
// Measures graph discovery, closure expansion and cycle detection on
// synthetic benches: a long strong chain (worst case for closure passes)
// and a wide fan-out of steps sharing a handful of instruments.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use taplock_resource::testing::{TestResource, TestStep};
use taplock_resource::{DependencyAnalyzer, Reflect, Root};

fn chain(len: usize) -> Vec<Root> {
    let resources: Vec<_> = (0..len)
        .map(|i| TestResource::new(format!("R{i}")))
        .collect();
    for pair in resources.windows(2) {
        pair[0].depends_on("Next", &pair[1].handle());
    }
    vec![Root::from(resources[0].handle())]
}

fn fan_out(steps: usize, instruments: usize) -> Vec<Root> {
    let instruments: Vec<_> = (0..instruments)
        .map(|i| TestResource::new(format!("Inst{i}")))
        .collect();
    (0..steps)
        .map(|i| {
            let step = TestStep::new("Measure")
                .with_resource("Dmm", Some(instruments[i % instruments.len()].handle()))
                .with_resource("Psu", None);
            let object: Arc<dyn Reflect> = Arc::new(step);
            Root::from(object)
        })
        .collect()
}

fn strong_chain(c: &mut Criterion) {
    let analyzer = DependencyAnalyzer::default();
    let mut group = c.benchmark_group("strong_chain");
    for len in [8, 32, 128] {
        let roots = chain(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &roots, |b, roots| {
            b.iter(|| black_box(analyzer.analyze(roots)));
        });
    }
    group.finish();
}

fn step_fan_out(c: &mut Criterion) {
    let analyzer = DependencyAnalyzer::default();
    let roots = fan_out(1_000, 8);
    c.bench_function("step_fan_out_1000x8", |b| {
        b.iter(|| black_box(analyzer.analyze(&roots)));
    });
}

criterion_group!(benches, strong_chain, step_fan_out);
criterion_main!(benches);
