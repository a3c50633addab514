//! Criterion benchmarks for the closed-loop simulation step.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use reacher::run::{SimConfig, Simulation};
use reacher::target::Ellipse;

fn make_sim(units: usize, seed: u64) -> Simulation {
    let cfg = SimConfig::with_size(units, 200)
        .with_trials(40, 50)
        .with_seed(seed);
    Simulation::new(cfg, &Ellipse::default()).expect("valid bench config")
}

/// Benchmark step() with varying reservoir sizes.
fn bench_step_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_size");

    for units in [64, 128, 256, 512].iter() {
        group.throughput(Throughput::Elements(*units as u64));

        group.bench_with_input(BenchmarkId::new("training", units), units, |b, &units| {
            let mut sim = make_sim(units, 42);

            b.iter(|| {
                if sim.is_complete() {
                    sim = make_sim(units, 42);
                }
                sim.step().unwrap();
                black_box(sim.traces().beta())
            });
        });
    }

    group.finish();
}

/// Benchmark a complete bootstrap/training/testing run at a small size.
fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    group.sample_size(10);

    group.bench_function("units_128", |b| {
        b.iter(|| {
            let cfg = SimConfig::with_size(128, 100).with_trials(8, 10).with_seed(7);
            let mut sim = Simulation::new(cfg, &Ellipse::default()).unwrap();
            sim.run().unwrap();
            black_box(sim.record().len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_step_sizes, bench_full_run);
criterion_main!(benches);
