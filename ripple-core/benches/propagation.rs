//! Propagation benchmarks: fan-out, chains, and suppressed writes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ripple_core::reactive::{Computed, Signal, Subscription};

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for listeners in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &listeners, |b, &n| {
            let signal = Signal::new(0u64);
            let _subs: Vec<Subscription> = (0..n)
                .map(|_| signal.subscribe(|v| {
                    black_box(*v);
                }))
                .collect();
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                signal.set(next);
            });
        });
    }
    group.finish();
}

fn chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    for depth in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let base = Signal::new(0u64);
            let mut levels: Vec<Computed<u64>> = Vec::with_capacity(depth);
            for level in 0..depth {
                let computed = match levels.last() {
                    Some(prev) => Computed::new(&[prev], {
                        let prev = prev.clone();
                        move || prev.get() + 1
                    }),
                    None => Computed::new(&[&base], {
                        let base = base.clone();
                        move || base.get() + level as u64
                    }),
                };
                levels.push(computed);
            }
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                base.set(next);
            });
        });
    }
    group.finish();
}

fn suppressed_writes(c: &mut Criterion) {
    let signal = Signal::new(42u64);
    let _sub = signal.subscribe(|v| {
        black_box(*v);
    });
    c.bench_function("suppressed_write", |b| b.iter(|| signal.set(black_box(42))));
}

criterion_group!(benches, fan_out, chain, suppressed_writes);
criterion_main!(benches);
