// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Trial aggregation.
//!
//! Failed trials only count towards `failure_count`. Throughput is pooled
//! (total items over total time) rather than averaged per trial, so a short
//! trial cannot dominate the rate.

use sysmark_core::{UnitKind, WorkloadSpec};

use crate::metrics::{LatencyPercentiles, MetricSummary};
use crate::runner::Trial;

/// Percentile of an ascending slice, by linear interpolation between
/// nearest ranks. Returns 0.0 for an empty slice.
pub fn percentile(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (percentile / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;
            sorted[lower] + fraction * (sorted[upper] - sorted[lower])
        }
    }
}

/// Collects the trials of one (workload, unit count) pair.
#[derive(Debug, Clone)]
pub struct Aggregator {
    spec: WorkloadSpec,
    unit_count: usize,
    unit_kind: UnitKind,
    size: u64,
    trials: Vec<Trial>,
}

impl Aggregator {
    pub fn new(spec: &WorkloadSpec, unit_count: usize, unit_kind: UnitKind, size: u64) -> Self {
        Self {
            spec: spec.clone(),
            unit_count,
            unit_kind,
            size,
            trials: Vec::new(),
        }
    }

    pub fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    pub fn finish(self) -> MetricSummary {
        let mut elapsed: Vec<f64> = Vec::with_capacity(self.trials.len());
        let mut total_items: u64 = 0;
        let mut failure_count = 0u32;
        let mut error_kind = None;

        for trial in &self.trials {
            if trial.failed {
                failure_count += 1;
                if error_kind.is_none() {
                    error_kind = trial.error_kind();
                }
            } else {
                elapsed.push(trial.elapsed_seconds);
                total_items = total_items.saturating_add(trial.items_processed);
            }
        }

        let success_count = elapsed.len() as u32;
        let total_seconds: f64 = elapsed.iter().sum();
        let throughput = if total_seconds > 0.0 {
            total_items as f64 / total_seconds
        } else {
            0.0
        };

        elapsed.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let timed = !elapsed.is_empty();
        let stat = |value: f64| timed.then_some(value);

        MetricSummary {
            workload: self.spec.id.clone(),
            unit_count: self.unit_count,
            unit_kind: self.unit_kind,
            metric: self.spec.metric,
            unit: self.spec.unit,
            size: self.size,
            throughput,
            total_items,
            mean_seconds: stat(total_seconds / elapsed.len().max(1) as f64),
            median_seconds: stat(percentile(&elapsed, 50.0)),
            min_seconds: elapsed.first().copied(),
            max_seconds: elapsed.last().copied(),
            latency: timed.then(|| LatencyPercentiles {
                p50: percentile(&elapsed, 50.0),
                p95: percentile(&elapsed, 95.0),
                p99: percentile(&elapsed, 99.0),
            }),
            success_count,
            failure_count,
            error_kind,
        }
    }
}
