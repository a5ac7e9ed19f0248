// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Trial execution.
//!
//! One trial runs a workload on `unit_count` parallel units: each unit warms
//! up untimed, then all are released together and the clock covers only the
//! measured pass. Unit errors become data on the [`Trial`]; nothing here
//! aborts the session.

use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sysmark_core::{
    CancelToken, ErrorKind, MetricKind, SessionConfig, SysmarkError, SysmarkResult, UnitContext,
    UnitKind, UnitPhase, Workload, WorkloadError,
};

use crate::clock::{Deadline, DeadlineSource, Timer};
use crate::process::{ProcessLauncher, ProcessUnits};

/// Bounds of the size multiplier applied when a trial is under the floor.
const MIN_ESCALATION_FACTOR: u64 = 2;
const MAX_ESCALATION_FACTOR: u64 = 16;
/// How long cancelled thread units get to exit before the trial returns.
const UNIT_REAP_GRACE: Duration = Duration::from_secs(5);
const UNIT_REAP_POLL: Duration = Duration::from_millis(5);

/// Result of one timed execution of a workload.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    /// Measured-pass wall time; never includes warm-up.
    pub elapsed_seconds: f64,
    /// Items summed over all units; zero for a failed trial.
    pub items_processed: u64,
    pub unit_count: usize,
    /// Size parameter actually passed to the units.
    pub size: u64,
    pub failed: bool,
    pub error: Option<WorkloadError>,
}

impl Trial {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(WorkloadError::kind)
    }

    fn succeeded(elapsed: Duration, items: u64, unit_count: usize, size: u64) -> Self {
        Self {
            elapsed_seconds: elapsed.as_secs_f64(),
            items_processed: items,
            unit_count,
            size,
            failed: false,
            error: None,
        }
    }

    fn failed(elapsed: Duration, error: WorkloadError, unit_count: usize, size: u64) -> Self {
        Self {
            elapsed_seconds: elapsed.as_secs_f64(),
            items_processed: 0,
            unit_count,
            size,
            failed: true,
            error: Some(error),
        }
    }
}

/// Outcome of attempting one trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Completed(Trial),
    /// The category deadline passed before the trial finished.
    CategoryExpired,
}

/// All trials of one (workload, unit count) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialSeries {
    pub trials: Vec<Trial>,
    /// Size in effect after any floor escalation.
    pub final_size: u64,
    pub escalations: u32,
    pub category_expired: bool,
}

/// What a set of units reported, before it is shaped into a [`Trial`].
#[derive(Debug)]
pub(crate) enum UnitsRun {
    Finished {
        elapsed: Duration,
        items: u64,
        error: Option<WorkloadError>,
    },
    CategoryExpired,
}

impl UnitsRun {
    pub(crate) fn failed(elapsed: Duration, error: WorkloadError) -> Self {
        Self::Finished {
            elapsed,
            items: 0,
            error: Some(error),
        }
    }

    /// The units did not report before `deadline`.
    pub(crate) fn missed(deadline: &Deadline, timeout: Duration, elapsed: Duration) -> Self {
        match deadline.source() {
            DeadlineSource::Category => Self::CategoryExpired,
            DeadlineSource::Trial => Self::failed(
                elapsed,
                WorkloadError::Timeout {
                    after_ms: timeout.as_millis() as u64,
                },
            ),
        }
    }
}

/// Map a failure to create a unit onto the workload error taxonomy.
pub(crate) fn unit_spawn_error(e: std::io::Error) -> WorkloadError {
    match WorkloadError::from(e) {
        err @ WorkloadError::ResourceExhaustion { .. } => err,
        other => WorkloadError::setup(other.detail()),
    }
}

/// Executes trials for the session coordinator.
pub struct TrialRunner {
    per_trial_timeout: Duration,
    min_trial: Duration,
    max_escalations: u32,
    cooldown: Duration,
    scratch_dir: Option<PathBuf>,
    processes: Option<ProcessUnits>,
}

impl TrialRunner {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            per_trial_timeout: config.per_trial_timeout,
            min_trial: config.min_trial,
            max_escalations: config.max_escalations,
            cooldown: config.cooldown,
            scratch_dir: config.scratch_dir.clone(),
            processes: None,
        }
    }

    /// Enable process units, spawned through `launcher`.
    pub fn with_launcher(mut self, launcher: ProcessLauncher) -> SysmarkResult<Self> {
        let units = ProcessUnits::new(launcher).map_err(|source| SysmarkError::Io {
            context: "building process unit runtime",
            source,
        })?;
        self.processes = Some(units);
        Ok(self)
    }

    pub fn has_process_units(&self) -> bool {
        self.processes.is_some()
    }

    /// Run every repeat of one (workload, unit count) pair, escalating the
    /// size of throughput trials that finish under the floor.
    pub fn run_series(
        &self,
        workload: &Arc<dyn Workload>,
        unit_count: usize,
        unit_kind: UnitKind,
        repeats: u32,
        size: u64,
        category_deadline: Option<Instant>,
    ) -> TrialSeries {
        let rescale = workload.spec().metric == MetricKind::Throughput;
        let mut series = TrialSeries {
            trials: Vec::with_capacity(repeats as usize),
            final_size: size,
            escalations: 0,
            category_expired: false,
        };

        while series.trials.len() < repeats as usize {
            let trial = match self.run_trial(
                workload,
                unit_count,
                unit_kind,
                series.final_size,
                category_deadline,
            ) {
                TrialOutcome::Completed(trial) => trial,
                TrialOutcome::CategoryExpired => {
                    series.category_expired = true;
                    break;
                }
            };
            self.cool_down();

            let elapsed = Duration::from_secs_f64(trial.elapsed_seconds);
            if rescale
                && !trial.failed
                && elapsed < self.min_trial
                && series.escalations < self.max_escalations
            {
                let factor = escalation_factor(self.min_trial, elapsed);
                let escalated = series.final_size.saturating_mul(factor);
                tracing::debug!(
                    workload = %workload.id(),
                    units = unit_count,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    from = series.final_size,
                    to = escalated,
                    "Trial under floor, escalating size"
                );
                series.final_size = escalated;
                series.escalations += 1;
                continue;
            }

            series.trials.push(trial);
        }

        series
    }

    /// Run a single trial with a fresh set of units.
    pub fn run_trial(
        &self,
        workload: &Arc<dyn Workload>,
        unit_count: usize,
        unit_kind: UnitKind,
        size: u64,
        category_deadline: Option<Instant>,
    ) -> TrialOutcome {
        let unit_count = unit_count.max(1);
        let run = match (unit_kind, &self.processes) {
            (UnitKind::Process, Some(processes)) => processes.run(
                workload.id(),
                size,
                unit_count,
                self.per_trial_timeout,
                category_deadline,
            ),
            (UnitKind::None, _) => self.run_threads(workload, 1, size, category_deadline),
            _ => self.run_threads(workload, unit_count, size, category_deadline),
        };

        let trial = match run {
            UnitsRun::CategoryExpired => {
                tracing::info!(workload = %workload.id(), units = unit_count, "Category deadline reached mid-trial");
                return TrialOutcome::CategoryExpired;
            }
            UnitsRun::Finished {
                elapsed,
                error: Some(error),
                ..
            } => Trial::failed(elapsed, error, unit_count, size),
            UnitsRun::Finished { elapsed, items, .. }
                if workload.spec().metric == MetricKind::Latency && items != 1 =>
            {
                let error = WorkloadError::runtime(format!(
                    "latency sample reported {} items, expected 1",
                    items
                ));
                Trial::failed(elapsed, error, unit_count, size)
            }
            UnitsRun::Finished { elapsed, items, .. } => {
                Trial::succeeded(elapsed, items, unit_count, size)
            }
        };

        match &trial.error {
            Some(err) => tracing::warn!(
                workload = %workload.id(),
                units = unit_count,
                kind = %err.kind(),
                error = %err,
                "Trial failed"
            ),
            None => tracing::debug!(
                workload = %workload.id(),
                units = unit_count,
                elapsed_ms = trial.elapsed_seconds * 1000.0,
                items = trial.items_processed,
                "Trial completed"
            ),
        }

        TrialOutcome::Completed(trial)
    }

    fn cool_down(&self) {
        if !self.cooldown.is_zero() {
            thread::sleep(self.cooldown);
        }
    }

    fn run_threads(
        &self,
        workload: &Arc<dyn Workload>,
        unit_count: usize,
        size: u64,
        category_deadline: Option<Instant>,
    ) -> UnitsRun {
        let cancel = CancelToken::new();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), WorkloadError>>();
        let (done_tx, done_rx) = mpsc::channel::<Result<u64, WorkloadError>>();
        let mut releases = Vec::with_capacity(unit_count);
        let mut handles = Vec::with_capacity(unit_count);

        for index in 0..unit_count {
            let (go_tx, go_rx) = mpsc::channel::<()>();
            let workload = Arc::clone(workload);
            let ctx = UnitContext::new(
                index,
                UnitPhase::WarmUp,
                cancel.clone(),
                self.scratch_dir.clone(),
            );
            let ready_tx = ready_tx.clone();
            let done_tx = done_tx.clone();

            let spawned = thread::Builder::new()
                .name(format!("sysmark-unit-{}", index))
                .spawn(move || {
                    if let Err(err) = workload.run(size, &ctx) {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));
                    if go_rx.recv().is_err() {
                        return;
                    }
                    let _ = done_tx.send(workload.run(size, &ctx.measured()));
                });

            match spawned {
                Ok(handle) => {
                    releases.push(go_tx);
                    handles.push(handle);
                }
                Err(e) => {
                    drop(releases);
                    reap_units(&cancel, handles);
                    return UnitsRun::failed(Duration::ZERO, unit_spawn_error(e));
                }
            }
        }
        drop(ready_tx);
        drop(done_tx);

        let warmup = Deadline::earliest(self.per_trial_timeout, category_deadline);
        let mut first_error = None;
        for _ in 0..unit_count {
            match ready_rx.recv_timeout(warmup.remaining()) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(RecvTimeoutError::Timeout) => {
                    drop(releases);
                    reap_units(&cancel, handles);
                    return UnitsRun::missed(&warmup, self.per_trial_timeout, Duration::ZERO);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    first_error
                        .get_or_insert_with(|| WorkloadError::runtime("unit exited during warm-up"));
                    break;
                }
            }
        }
        if let Some(err) = first_error {
            drop(releases);
            reap_units(&cancel, handles);
            return UnitsRun::failed(Duration::ZERO, err);
        }

        let measured = Deadline::earliest(self.per_trial_timeout, category_deadline);
        let timer = Timer::start();
        for go in &releases {
            let _ = go.send(());
        }

        let mut items: u64 = 0;
        let mut first_error = None;
        for _ in 0..unit_count {
            match done_rx.recv_timeout(measured.remaining()) {
                Ok(Ok(n)) => items = items.saturating_add(n),
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(RecvTimeoutError::Timeout) => {
                    let elapsed = timer.elapsed();
                    reap_units(&cancel, handles);
                    return match first_error {
                        Some(err) => UnitsRun::failed(elapsed, err),
                        None => UnitsRun::missed(&measured, self.per_trial_timeout, elapsed),
                    };
                }
                Err(RecvTimeoutError::Disconnected) => {
                    first_error.get_or_insert_with(|| {
                        WorkloadError::runtime("unit exited without reporting")
                    });
                    break;
                }
            }
        }
        let elapsed = timer.elapsed();

        for handle in handles {
            let _ = handle.join();
        }

        UnitsRun::Finished {
            elapsed,
            items: if first_error.is_some() { 0 } else { items },
            error: first_error,
        }
    }
}

/// Cancel `handles` and join them, waiting at most [`UNIT_REAP_GRACE`].
///
/// Units stuck in a call that never observes cancellation are left running
/// and reported at warn.
fn reap_units(cancel: &CancelToken, handles: Vec<JoinHandle<()>>) {
    cancel.cancel();
    let grace = Deadline::earliest(UNIT_REAP_GRACE, None);
    let mut pending = handles;

    while !pending.is_empty() && !grace.expired() {
        let (finished, running): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|h| h.is_finished());
        for handle in finished {
            let _ = handle.join();
        }
        pending = running;
        if !pending.is_empty() {
            thread::sleep(UNIT_REAP_POLL.min(grace.remaining()));
        }
    }

    if !pending.is_empty() {
        tracing::warn!(
            units = pending.len(),
            grace_ms = UNIT_REAP_GRACE.as_millis() as u64,
            "Cancelled units still running after grace period"
        );
    } else {
        tracing::debug!("Cancelled units exited");
    }
}

/// `ceil(floor / elapsed)` clamped to the escalation bounds.
fn escalation_factor(floor: Duration, elapsed: Duration) -> u64 {
    if elapsed.is_zero() {
        return MAX_ESCALATION_FACTOR;
    }
    let ratio = (floor.as_secs_f64() / elapsed.as_secs_f64()).ceil() as u64;
    ratio.clamp(MIN_ESCALATION_FACTOR, MAX_ESCALATION_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use sysmark_core::{Category, ItemUnit, ScalingMode, WorkloadId, WorkloadSpec};

    /// Sleeps `size` microseconds in the measured pass, polling cancellation.
    struct Sleeper {
        spec: WorkloadSpec,
        fail_from_unit: Option<usize>,
        fail_warmup: bool,
    }

    impl Sleeper {
        fn new(id: &str) -> Self {
            Self {
                spec: WorkloadSpec::new(
                    WorkloadId::new(id).unwrap(),
                    Category::Cpu,
                    ScalingMode::ThreadScaled,
                    1_000,
                    ItemUnit::Operations,
                ),
                fail_from_unit: None,
                fail_warmup: false,
            }
        }
    }

    impl Workload for Sleeper {
        fn spec(&self) -> &WorkloadSpec {
            &self.spec
        }

        fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
            if ctx.is_warmup() {
                return if self.fail_warmup {
                    Err(WorkloadError::setup("no scratch space"))
                } else {
                    Ok(0)
                };
            }
            if let Some(from) = self.fail_from_unit {
                if ctx.unit_index() >= from {
                    return Err(WorkloadError::runtime("unit refused"));
                }
            }
            let until = Instant::now() + Duration::from_micros(size);
            while Instant::now() < until {
                if ctx.is_cancelled() {
                    return Err(WorkloadError::runtime("cancelled"));
                }
                thread::sleep(Duration::from_millis(1));
            }
            Ok(size)
        }
    }

    fn runner(config: SessionConfig) -> TrialRunner {
        TrialRunner::new(&SessionConfig {
            cooldown: Duration::ZERO,
            ..config
        })
    }

    fn shared(w: Sleeper) -> Arc<dyn Workload> {
        Arc::new(w)
    }

    #[test]
    fn test_items_summed_across_units() {
        let runner = runner(SessionConfig::default());
        let workload = shared(Sleeper::new("test.sum"));
        match runner.run_trial(&workload, 4, UnitKind::Thread, 2_000, None) {
            TrialOutcome::Completed(trial) => {
                assert!(!trial.failed);
                assert_eq!(trial.items_processed, 8_000);
                assert_eq!(trial.unit_count, 4);
                assert!(trial.elapsed_seconds >= 0.002);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unit_error_fails_trial_with_zero_items() {
        let runner = runner(SessionConfig::default());
        let mut w = Sleeper::new("test.partial");
        w.fail_from_unit = Some(1);
        let workload = shared(w);
        match runner.run_trial(&workload, 2, UnitKind::Thread, 1_000, None) {
            TrialOutcome::Completed(trial) => {
                assert!(trial.failed);
                assert_eq!(trial.items_processed, 0);
                assert_eq!(trial.error_kind(), Some(ErrorKind::WorkloadRuntimeError));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_warmup_failure_is_recorded() {
        let runner = runner(SessionConfig::default());
        let mut w = Sleeper::new("test.warmup");
        w.fail_warmup = true;
        let workload = shared(w);
        match runner.run_trial(&workload, 1, UnitKind::None, 1_000, None) {
            TrialOutcome::Completed(trial) => {
                assert_eq!(trial.error_kind(), Some(ErrorKind::WorkloadSetupError));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_trial_timeout() {
        let runner = runner(SessionConfig {
            per_trial_timeout: Duration::from_millis(50),
            ..SessionConfig::default()
        });
        let workload = shared(Sleeper::new("test.slow"));
        match runner.run_trial(&workload, 1, UnitKind::Thread, 2_000_000, None) {
            TrialOutcome::Completed(trial) => {
                assert!(trial.failed);
                assert_eq!(trial.error_kind(), Some(ErrorKind::WorkloadTimeout));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_category_deadline_expires_trial() {
        let runner = runner(SessionConfig::default());
        let workload = shared(Sleeper::new("test.expire"));
        let deadline = Instant::now() + Duration::from_millis(50);
        let outcome = runner.run_trial(&workload, 1, UnitKind::Thread, 2_000_000, Some(deadline));
        assert_eq!(outcome, TrialOutcome::CategoryExpired);
    }

    #[test]
    fn test_floor_escalation_carries_size() {
        let runner = runner(SessionConfig {
            min_trial: Duration::from_millis(20),
            ..SessionConfig::default()
        });
        let workload = shared(Sleeper::new("test.fast"));
        let series = runner.run_series(&workload, 1, UnitKind::Thread, 3, 1_000, None);

        assert_eq!(series.trials.len(), 3);
        assert!(series.escalations >= 1);
        assert!(series.final_size > 1_000);
        assert!(series.trials.iter().all(|t| t.size == series.final_size));
    }

    #[test]
    fn test_escalation_bounded() {
        let runner = runner(SessionConfig {
            min_trial: Duration::from_secs(10),
            max_escalations: 2,
            ..SessionConfig::default()
        });
        let workload = shared(Sleeper::new("test.bounded"));
        let series = runner.run_series(&workload, 1, UnitKind::Thread, 1, 100, None);

        assert_eq!(series.escalations, 2);
        assert_eq!(series.trials.len(), 1);
        assert_eq!(series.final_size, 100 * 16 * 16);
    }

    #[test]
    fn test_latency_workloads_never_rescaled() {
        let runner = runner(SessionConfig {
            min_trial: Duration::from_secs(10),
            ..SessionConfig::default()
        });
        let mut w = Sleeper::new("test.latency");
        w.spec = w.spec.latency();
        let workload = shared(w);
        let series = runner.run_series(&workload, 1, UnitKind::None, 2, 1, None);

        assert_eq!(series.escalations, 0);
        assert_eq!(series.final_size, 1);
        assert_eq!(series.trials.len(), 2);
        assert!(series.trials.iter().all(|t| !t.failed && t.items_processed == 1));
    }

    #[test]
    fn test_latency_trial_must_report_one_item() {
        let runner = runner(SessionConfig::default());
        let mut w = Sleeper::new("test.batched_latency");
        w.spec = w.spec.latency();
        let workload = shared(w);
        match runner.run_trial(&workload, 1, UnitKind::None, 5, None) {
            TrialOutcome::Completed(trial) => {
                assert!(trial.failed);
                assert_eq!(trial.items_processed, 0);
                assert_eq!(trial.error_kind(), Some(ErrorKind::WorkloadRuntimeError));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    /// Blocks for `size` milliseconds without polling cancellation.
    struct Stubborn {
        spec: WorkloadSpec,
        live: Arc<AtomicUsize>,
    }

    impl Workload for Stubborn {
        fn spec(&self) -> &WorkloadSpec {
            &self.spec
        }

        fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
            if ctx.is_warmup() {
                return Ok(0);
            }
            self.live.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(size));
            self.live.fetch_sub(1, Ordering::SeqCst);
            Ok(size)
        }
    }

    #[test]
    fn test_timed_out_units_are_joined_before_return() {
        let runner = runner(SessionConfig {
            per_trial_timeout: Duration::from_millis(100),
            ..SessionConfig::default()
        });
        let live = Arc::new(AtomicUsize::new(0));
        let workload: Arc<dyn Workload> = Arc::new(Stubborn {
            spec: Sleeper::new("test.stubborn").spec,
            live: Arc::clone(&live),
        });

        match runner.run_trial(&workload, 4, UnitKind::Thread, 800, None) {
            TrialOutcome::Completed(trial) => {
                assert_eq!(trial.error_kind(), Some(ErrorKind::WorkloadTimeout));
                assert!(trial.elapsed_seconds < 0.8);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_escalation_factor_bounds() {
        let floor = Duration::from_millis(50);
        assert_eq!(escalation_factor(floor, Duration::from_millis(40)), 2);
        assert_eq!(escalation_factor(floor, Duration::from_millis(10)), 5);
        assert_eq!(escalation_factor(floor, Duration::from_micros(1)), 16);
        assert_eq!(escalation_factor(floor, Duration::ZERO), 16);
    }

    #[test]
    fn test_process_kind_without_launcher_uses_threads() {
        let runner = runner(SessionConfig::default());
        assert!(!runner.has_process_units());
        let workload = shared(Sleeper::new("test.fallback"));
        match runner.run_trial(&workload, 2, UnitKind::Process, 1_000, None) {
            TrialOutcome::Completed(trial) => assert_eq!(trial.items_processed, 2_000),
            other => panic!("unexpected {:?}", other),
        }
    }
}
