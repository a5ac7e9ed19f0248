// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Category orchestration.
//!
//! The coordinator drives one category at a time through the session state
//! machine: plan each workload, run its trials per unit count, aggregate,
//! and fold the outcomes into a [`CategoryReport`]. Workload failures are
//! data; only detection failures end a run with `Err`.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use sysmark_core::{
    Category, SessionConfig, SessionState, SessionStateMachine, SysmarkError, SysmarkResult,
    Workload, WorkloadRegistry,
};

use crate::aggregate::Aggregator;
use crate::clock::Timer;
use crate::info::InfoProvider;
use crate::metrics::{
    CategoryReport, CategoryStatus, MetricSummary, WorkloadOutcome, WorkloadReport,
};
use crate::plan::{ConcurrencyPlan, HardwareConcurrency};
use crate::process::ProcessLauncher;
use crate::runner::TrialRunner;

/// Everything a session needs, passed explicitly.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub config: SessionConfig,
    pub hardware: HardwareConcurrency,
    pub launcher: Option<ProcessLauncher>,
}

impl SessionContext {
    pub fn new(config: SessionConfig, hardware: HardwareConcurrency) -> Self {
        Self {
            config,
            hardware,
            launcher: None,
        }
    }

    /// Build a context for this host. Fails if core counts cannot be detected.
    pub fn detect(config: SessionConfig) -> SysmarkResult<Self> {
        Ok(Self::new(config, HardwareConcurrency::detect()?))
    }

    pub fn with_launcher(mut self, launcher: ProcessLauncher) -> Self {
        self.launcher = Some(launcher);
        self
    }
}

/// Runs categories of workloads and produces their reports.
pub struct SessionCoordinator {
    config: SessionConfig,
    hardware: HardwareConcurrency,
    runner: TrialRunner,
    info: Box<dyn InfoProvider>,
}

impl SessionCoordinator {
    pub fn new(context: SessionContext, info: Box<dyn InfoProvider>) -> SysmarkResult<Self> {
        let mut runner = TrialRunner::new(&context.config);
        if let Some(launcher) = context.launcher {
            runner = runner.with_launcher(launcher)?;
        }

        Ok(Self {
            config: context.config,
            hardware: context.hardware,
            runner,
            info,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn hardware(&self) -> HardwareConcurrency {
        self.hardware
    }

    /// Run every workload of `category` in order.
    pub fn run_category(
        &self,
        category: Category,
        workloads: &[Arc<dyn Workload>],
    ) -> SysmarkResult<CategoryReport> {
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Timer::start();
        let mut machine = SessionStateMachine::new(category);

        let info = self
            .info
            .snapshot(category)
            .map_err(|e| SysmarkError::InfoSnapshot {
                category,
                reason: e.to_string(),
            })?;

        let deadline = timer.started_at() + self.config.category_timeout;

        tracing::info!(
            category = %category,
            session = %session_id,
            workloads = workloads.len(),
            timeout_s = self.config.category_timeout.as_secs_f64(),
            "Category started"
        );

        let mut reports = Vec::with_capacity(workloads.len());
        let mut expired = false;

        for workload in workloads {
            let spec = workload.spec();
            if expired || Instant::now() >= deadline {
                expired = true;
                tracing::warn!(workload = %spec.id, "Category deadline passed, skipping");
                reports.push(WorkloadReport::skipped(
                    spec.id.clone(),
                    spec.description.clone(),
                ));
                continue;
            }

            machine.advance()?;
            let report = self.run_workload(&mut machine, workload, deadline)?;
            expired = report.outcome == WorkloadOutcome::Skipped;
            reports.push(report);
        }

        let outcomes: Vec<WorkloadOutcome> = reports.iter().map(|r| r.outcome).collect();
        let status = CategoryStatus::from_outcomes(&outcomes);
        machine.transition_to(match status {
            CategoryStatus::Complete => SessionState::Complete,
            CategoryStatus::PartialFailure => SessionState::PartialFailure,
            CategoryStatus::Aborted => SessionState::Aborted,
        })?;

        let report = CategoryReport {
            session_id,
            category,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at,
            info,
            workloads: reports,
            total_seconds: timer.stop(),
            status,
        };

        tracing::info!(
            category = %category,
            status = %report.status,
            completed = report.count(WorkloadOutcome::Completed),
            failed = report.count(WorkloadOutcome::Failed),
            skipped = report.count(WorkloadOutcome::Skipped),
            elapsed_s = report.total_seconds,
            "Category finished"
        );

        Ok(report)
    }

    /// Run the registered workloads of one category.
    pub fn run_registered(
        &self,
        registry: &WorkloadRegistry,
        category: Category,
    ) -> SysmarkResult<CategoryReport> {
        self.run_category(category, &registry.for_category(category))
    }

    /// Run CPU, RAM, Disk and Network in order, pausing between categories.
    /// `on_report` sees each report as soon as its category finishes.
    pub fn run_all<F>(
        &self,
        registry: &WorkloadRegistry,
        mut on_report: F,
    ) -> SysmarkResult<Vec<CategoryReport>>
    where
        F: FnMut(&CategoryReport),
    {
        let mut reports = Vec::with_capacity(Category::ALL.len());
        for (i, category) in Category::ALL.into_iter().enumerate() {
            if i > 0 && !self.config.category_pause.is_zero() {
                tracing::debug!(
                    pause_s = self.config.category_pause.as_secs_f64(),
                    "Pausing between categories"
                );
                thread::sleep(self.config.category_pause);
            }
            let report = self.run_registered(registry, category)?;
            on_report(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    fn run_workload(
        &self,
        machine: &mut SessionStateMachine,
        workload: &Arc<dyn Workload>,
        deadline: Instant,
    ) -> SysmarkResult<WorkloadReport> {
        let spec = workload.spec();
        machine.transition_to(SessionState::PlanningConcurrency)?;

        let plan = ConcurrencyPlan::for_scaling(
            spec.scaling,
            self.hardware,
            &self.config,
            self.runner.has_process_units(),
        );
        let size = self.config.size_for(spec);
        let repeats = self.config.repeats_for(spec);

        tracing::info!(
            workload = %spec.id,
            units = ?plan.unit_counts(),
            kind = %plan.unit_kind(),
            size = size,
            repeats = repeats,
            "Measuring workload"
        );

        let mut summaries = Vec::with_capacity(plan.unit_counts().len());
        for &units in plan.unit_counts() {
            machine.transition_to(SessionState::Trialing)?;
            let series = self.runner.run_series(
                workload,
                units,
                plan.unit_kind(),
                repeats,
                size,
                Some(deadline),
            );
            if series.category_expired {
                return Ok(WorkloadReport {
                    workload: spec.id.clone(),
                    description: spec.description.clone(),
                    outcome: WorkloadOutcome::Skipped,
                    summaries,
                    scaling: None,
                });
            }

            machine.transition_to(SessionState::Aggregating)?;
            let mut aggregator = Aggregator::new(spec, units, plan.unit_kind(), series.final_size);
            for trial in series.trials {
                aggregator.push(trial);
            }
            summaries.push(aggregator.finish());
        }

        let outcome = if summaries.iter().all(|s| s.success_count == 0) {
            WorkloadOutcome::Failed
        } else {
            WorkloadOutcome::Completed
        };
        let scaling = if plan.scaling_applicable() {
            scaling_speedup(&summaries)
        } else {
            None
        };

        Ok(WorkloadReport {
            workload: spec.id.clone(),
            description: spec.description.clone(),
            outcome,
            summaries,
            scaling,
        })
    }
}

/// Throughput at the largest successful unit count over the single-unit
/// baseline, if both exist and differ.
pub fn scaling_speedup(summaries: &[MetricSummary]) -> Option<f64> {
    let baseline = summaries
        .iter()
        .find(|s| s.unit_count == 1 && s.success_count > 0 && s.throughput > 0.0)?;
    let widest = summaries
        .iter()
        .filter(|s| s.unit_count > 1 && s.success_count > 0)
        .max_by_key(|s| s.unit_count)?;
    Some(widest.throughput / baseline.throughput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sysmark_core::{
        ItemUnit, ScalingMode, UnitContext, UnitKind, WorkloadError, WorkloadId, WorkloadSpec,
    };

    use crate::info::{InfoError, InfoSnapshot};

    struct FixedInfo;

    impl InfoProvider for FixedInfo {
        fn snapshot(&self, _category: Category) -> Result<InfoSnapshot, InfoError> {
            Ok(InfoSnapshot::new().label("OS", "test"))
        }
    }

    struct NoInfo;

    impl InfoProvider for NoInfo {
        fn snapshot(&self, _category: Category) -> Result<InfoSnapshot, InfoError> {
            Err(InfoError::Unavailable { what: "CPU" })
        }
    }

    struct Noop {
        spec: WorkloadSpec,
        fail: bool,
    }

    impl Workload for Noop {
        fn spec(&self) -> &WorkloadSpec {
            &self.spec
        }

        fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
            if self.fail && !ctx.is_warmup() {
                return Err(WorkloadError::runtime("always fails"));
            }
            Ok(size)
        }
    }

    fn noop(id: &str, fail: bool) -> Arc<dyn Workload> {
        Arc::new(Noop {
            spec: WorkloadSpec::new(
                WorkloadId::new(id).unwrap(),
                Category::Cpu,
                ScalingMode::FixedSingle,
                1,
                ItemUnit::Operations,
            ),
            fail,
        })
    }

    fn coordinator(info: Box<dyn InfoProvider>) -> SessionCoordinator {
        let config = SessionConfig {
            repeat_count: 2,
            cooldown: Duration::ZERO,
            min_trial: Duration::ZERO,
            category_pause: Duration::ZERO,
            ..SessionConfig::default()
        };
        let hardware = HardwareConcurrency::new(2, 4).unwrap();
        SessionCoordinator::new(SessionContext::new(config, hardware), info).unwrap()
    }

    fn summary(units: usize, throughput: f64, success: u32) -> MetricSummary {
        MetricSummary {
            workload: WorkloadId::new("test.scale").unwrap(),
            unit_count: units,
            unit_kind: UnitKind::Thread,
            metric: sysmark_core::MetricKind::Throughput,
            unit: ItemUnit::Operations,
            size: 1,
            throughput,
            total_items: 0,
            mean_seconds: None,
            median_seconds: None,
            min_seconds: None,
            max_seconds: None,
            latency: None,
            success_count: success,
            failure_count: 0,
            error_kind: None,
        }
    }

    #[test]
    fn test_empty_category_is_complete() {
        let report = coordinator(Box::new(FixedInfo))
            .run_category(Category::Cpu, &[])
            .unwrap();
        assert_eq!(report.status, CategoryStatus::Complete);
        assert!(report.workloads.is_empty());
        assert_eq!(report.info.get_label("OS"), Some("test"));
    }

    #[test]
    fn test_mixed_outcomes_partial_failure() {
        let report = coordinator(Box::new(FixedInfo))
            .run_category(Category::Cpu, &[noop("a", false), noop("b", true)])
            .unwrap();
        assert_eq!(report.status, CategoryStatus::PartialFailure);
        assert_eq!(report.workloads[0].outcome, WorkloadOutcome::Completed);
        assert_eq!(report.workloads[1].outcome, WorkloadOutcome::Failed);
        assert_eq!(report.workloads[1].summaries[0].failure_count, 2);
    }

    #[test]
    fn test_all_failed_aborts() {
        let report = coordinator(Box::new(FixedInfo))
            .run_category(Category::Cpu, &[noop("a", true), noop("b", true)])
            .unwrap();
        assert_eq!(report.status, CategoryStatus::Aborted);
    }

    #[test]
    fn test_info_failure_is_fatal() {
        let err = coordinator(Box::new(NoInfo))
            .run_category(Category::Cpu, &[noop("a", false)])
            .unwrap_err();
        assert!(matches!(err, SysmarkError::InfoSnapshot { .. }));
    }

    #[test]
    fn test_scaling_speedup() {
        let summaries = [
            summary(1, 100.0, 3),
            summary(2, 180.0, 3),
            summary(4, 320.0, 3),
        ];
        assert_eq!(scaling_speedup(&summaries), Some(3.2));

        let widest_failed = [
            summary(1, 100.0, 3),
            summary(2, 180.0, 3),
            summary(4, 0.0, 0),
        ];
        assert_eq!(scaling_speedup(&widest_failed), Some(1.8));

        let no_baseline = [summary(1, 0.0, 0), summary(2, 180.0, 3)];
        assert_eq!(scaling_speedup(&no_baseline), None);
        assert_eq!(scaling_speedup(&[summary(1, 100.0, 3)]), None);
    }
}
