// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Result types produced by a measurement session.
//!
//! Everything here is plain serializable data: the harness builds it, the
//! display layer and the JSON reporter consume it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sysmark_core::{Category, ErrorKind, ItemUnit, MetricKind, UnitKind, WorkloadId};

use crate::info::InfoSnapshot;

/// Percentiles of successful trial durations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Aggregate of every trial for one (workload, unit count) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub workload: WorkloadId,
    pub unit_count: usize,
    pub unit_kind: UnitKind,
    pub metric: MetricKind,
    pub unit: ItemUnit,
    /// Size parameter after any floor escalation.
    pub size: u64,
    /// Pooled items per second over successful trials; zero if none succeeded.
    pub throughput: f64,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyPercentiles>,
    pub success_count: u32,
    pub failure_count: u32,
    /// Kind of the first failing trial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl MetricSummary {
    pub fn trial_count(&self) -> u32 {
        self.success_count + self.failure_count
    }

    pub fn all_failed(&self) -> bool {
        self.success_count == 0 && self.failure_count > 0
    }

    /// The primary figure as text: a rate for throughput workloads, the
    /// median for latency workloads.
    pub fn headline(&self) -> String {
        if self.all_failed() {
            return "failed".to_string();
        }
        match self.metric {
            MetricKind::Throughput => format_rate(self.throughput, self.unit),
            MetricKind::Latency => self
                .median_seconds
                .map(format_seconds)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// What happened to a workload as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadOutcome {
    /// At least one trial succeeded.
    Completed,
    /// Every trial failed.
    Failed,
    /// Not run, or cut short, because the category deadline passed.
    Skipped,
}

/// One workload's summaries, in ascending unit-count order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub workload: WorkloadId,
    pub description: String,
    pub outcome: WorkloadOutcome,
    pub summaries: Vec<MetricSummary>,
    /// Throughput at the largest successful unit count over throughput at
    /// one unit. `None` when not applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling: Option<f64>,
}

impl WorkloadReport {
    pub fn skipped(workload: WorkloadId, description: impl Into<String>) -> Self {
        Self {
            workload,
            description: description.into(),
            outcome: WorkloadOutcome::Skipped,
            summaries: Vec::new(),
            scaling: None,
        }
    }
}

/// Overall status of a category run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Complete,
    PartialFailure,
    Aborted,
}

impl CategoryStatus {
    /// `Aborted` iff every workload failed, `PartialFailure` iff some failed
    /// or any was skipped, otherwise `Complete`.
    pub fn from_outcomes(outcomes: &[WorkloadOutcome]) -> Self {
        let failed = outcomes
            .iter()
            .filter(|o| **o == WorkloadOutcome::Failed)
            .count();
        let skipped = outcomes.contains(&WorkloadOutcome::Skipped);

        if !outcomes.is_empty() && failed == outcomes.len() {
            Self::Aborted
        } else if failed > 0 || skipped {
            Self::PartialFailure
        } else {
            Self::Complete
        }
    }
}

impl std::fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryStatus::Complete => write!(f, "complete"),
            CategoryStatus::PartialFailure => write!(f, "partial failure"),
            CategoryStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Result of running one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub session_id: Uuid,
    pub category: Category,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub info: InfoSnapshot,
    pub workloads: Vec<WorkloadReport>,
    pub total_seconds: f64,
    pub status: CategoryStatus,
}

impl CategoryReport {
    pub fn count(&self, outcome: WorkloadOutcome) -> usize {
        self.workloads
            .iter()
            .filter(|w| w.outcome == outcome)
            .count()
    }
}

/// Format a duration in seconds (auto-selects ns/μs/ms/s).
pub fn format_seconds(seconds: f64) -> String {
    let ns = seconds * 1_000_000_000.0;
    if ns < 1_000.0 {
        format!("{:.0}ns", ns)
    } else if ns < 1_000_000.0 {
        format!("{:.2}μs", ns / 1_000.0)
    } else if ns < 1_000_000_000.0 {
        format!("{:.2}ms", ns / 1_000_000.0)
    } else {
        format!("{:.2}s", seconds)
    }
}

/// Format a per-second rate in the workload's item unit.
pub fn format_rate(per_sec: f64, unit: ItemUnit) -> String {
    match unit {
        ItemUnit::Bytes => {
            if per_sec < 1_000.0 {
                format!("{:.2} B/s", per_sec)
            } else if per_sec < 1_000_000.0 {
                format!("{:.2} KB/s", per_sec / 1_000.0)
            } else if per_sec < 1_000_000_000.0 {
                format!("{:.2} MB/s", per_sec / 1_000_000.0)
            } else {
                format!("{:.2} GB/s", per_sec / 1_000_000_000.0)
            }
        }
        other => {
            let (value, prefix) = if per_sec < 1_000.0 {
                (per_sec, "")
            } else if per_sec < 1_000_000.0 {
                (per_sec / 1_000.0, "K")
            } else {
                (per_sec / 1_000_000.0, "M")
            };
            format!("{:.2} {}{}/s", value, prefix, other.suffix())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(success: u32, failure: u32) -> MetricSummary {
        MetricSummary {
            workload: WorkloadId::new("test.summary").unwrap(),
            unit_count: 1,
            unit_kind: UnitKind::Thread,
            metric: MetricKind::Throughput,
            unit: ItemUnit::Bytes,
            size: 1,
            throughput: 2_500_000.0,
            total_items: 0,
            mean_seconds: None,
            median_seconds: None,
            min_seconds: None,
            max_seconds: None,
            latency: None,
            success_count: success,
            failure_count: failure,
            error_kind: None,
        }
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.000_000_5), "500ns");
        assert_eq!(format_seconds(0.000_001_5), "1.50μs");
        assert_eq!(format_seconds(0.001_5), "1.50ms");
        assert_eq!(format_seconds(1.5), "1.50s");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(500.0, ItemUnit::Bytes), "500.00 B/s");
        assert_eq!(format_rate(2_500_000.0, ItemUnit::Bytes), "2.50 MB/s");
        assert_eq!(format_rate(1_500.0, ItemUnit::Operations), "1.50 Kops/s");
        assert_eq!(format_rate(12.0, ItemUnit::Files), "12.00 files/s");
    }

    #[test]
    fn test_headline() {
        assert_eq!(summary(3, 0).headline(), "2.50 MB/s");
        assert_eq!(summary(0, 3).headline(), "failed");
    }

    #[test]
    fn test_status_rules() {
        use WorkloadOutcome::*;
        assert_eq!(CategoryStatus::from_outcomes(&[]), CategoryStatus::Complete);
        assert_eq!(
            CategoryStatus::from_outcomes(&[Completed, Completed]),
            CategoryStatus::Complete
        );
        assert_eq!(
            CategoryStatus::from_outcomes(&[Completed, Failed]),
            CategoryStatus::PartialFailure
        );
        assert_eq!(
            CategoryStatus::from_outcomes(&[Completed, Skipped]),
            CategoryStatus::PartialFailure
        );
        assert_eq!(
            CategoryStatus::from_outcomes(&[Failed, Failed]),
            CategoryStatus::Aborted
        );
        assert_eq!(
            CategoryStatus::from_outcomes(&[Failed, Skipped]),
            CategoryStatus::PartialFailure
        );
    }

    #[test]
    fn test_summary_serialization_omits_empty_timing() {
        let json = serde_json::to_string_pretty(&summary(0, 3)).unwrap();
        assert!(json.contains("\"failure_count\": 3"));
        assert!(!json.contains("mean_seconds"));
    }
}
