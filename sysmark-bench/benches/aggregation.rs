// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Aggregation and percentile micro-benchmarks.
//!
//! The harness aggregates after every (workload, unit count) pair; this keeps
//! that step cheap relative to the trials it summarizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sysmark_bench::aggregate::{percentile, Aggregator};
use sysmark_bench::Trial;
use sysmark_core::{Category, ItemUnit, ScalingMode, UnitKind, WorkloadError, WorkloadId, WorkloadSpec};

fn spec() -> WorkloadSpec {
    WorkloadSpec::new(
        WorkloadId::new("bench.aggregate").expect("valid id"),
        Category::Cpu,
        ScalingMode::ThreadScaled,
        1_000,
        ItemUnit::Operations,
    )
}

fn trials(n: usize) -> Vec<Trial> {
    (0..n)
        .map(|i| {
            let failed = i % 10 == 9;
            Trial {
                elapsed_seconds: 0.05 + (i % 17) as f64 * 0.001,
                items_processed: if failed { 0 } else { 1_000 + i as u64 },
                unit_count: 4,
                size: 1_000,
                failed,
                error: failed.then(|| WorkloadError::runtime("synthetic")),
            }
        })
        .collect()
}

/// Aggregating trial sets of increasing length.
fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let spec = spec();

    for n in [3usize, 10, 100, 1_000] {
        let input = trials(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("finish", n), &input, |b, input| {
            b.iter(|| {
                let mut agg = Aggregator::new(&spec, 4, UnitKind::Thread, 1_000);
                for trial in input {
                    agg.push(trial.clone());
                }
                black_box(agg.finish())
            });
        });
    }

    group.finish();
}

/// Percentile lookups on a sorted sample.
fn bench_percentile(c: &mut Criterion) {
    let mut group = c.benchmark_group("percentile");
    let mut samples: Vec<f64> = (0..10_000).map(|i| ((i * 7919) % 10_007) as f64).collect();
    samples.sort_by(f64::total_cmp);

    for p in [50.0, 95.0, 99.0] {
        group.bench_with_input(BenchmarkId::new("p", p as u32), &p, |b, &p| {
            b.iter(|| black_box(percentile(black_box(&samples), p)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_percentile);
criterion_main!(benches);
