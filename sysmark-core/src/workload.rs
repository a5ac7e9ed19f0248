// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! The workload capability set.
//!
//! A workload is an opaque, timeable unit of work. The harness only ever
//! sees its [`WorkloadSpec`] and calls [`Workload::run`]; the body of the
//! work is the workload's own business.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::WorkloadError;
use crate::types::{Category, ItemUnit, MetricKind, ScalingMode, WorkloadId};

/// Immutable description of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub id: WorkloadId,
    pub category: Category,
    pub scaling: ScalingMode,
    /// Default size/intensity parameter passed to `run`.
    pub size: u64,
    pub metric: MetricKind,
    pub unit: ItemUnit,
    /// One-line description shown by the display layer.
    pub description: String,
}

impl WorkloadSpec {
    /// Build a throughput spec. Use [`WorkloadSpec::latency`] to switch the primary view.
    pub fn new(
        id: WorkloadId,
        category: Category,
        scaling: ScalingMode,
        size: u64,
        unit: ItemUnit,
    ) -> Self {
        Self {
            id,
            category,
            scaling,
            size,
            metric: MetricKind::Throughput,
            unit,
            description: String::new(),
        }
    }

    /// Mark this workload as latency-oriented.
    pub fn latency(mut self) -> Self {
        self.metric = MetricKind::Latency;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Phase a unit is executing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPhase {
    /// Discarded pass that primes caches, allocations and connections.
    WarmUp,
    /// The timed pass.
    Measured,
}

/// Cooperative cancellation flag shared by all units of one trial.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-unit execution context handed to [`Workload::run`].
#[derive(Debug, Clone)]
pub struct UnitContext {
    unit_index: usize,
    phase: UnitPhase,
    cancel: CancelToken,
    scratch_dir: Option<PathBuf>,
}

impl UnitContext {
    pub fn new(
        unit_index: usize,
        phase: UnitPhase,
        cancel: CancelToken,
        scratch_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            unit_index,
            phase,
            cancel,
            scratch_dir,
        }
    }

    /// Context for a standalone invocation outside any trial.
    pub fn detached(phase: UnitPhase) -> Self {
        Self::new(0, phase, CancelToken::new(), None)
    }

    /// Zero-based index of this unit within its trial.
    pub fn unit_index(&self) -> usize {
        self.unit_index
    }

    pub fn phase(&self) -> UnitPhase {
        self.phase
    }

    pub fn is_warmup(&self) -> bool {
        self.phase == UnitPhase::WarmUp
    }

    /// True once the trial's deadline has passed. Long-running bodies should poll this.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Directory for temporary files; `None` means the system temp dir.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    pub(crate) fn with_phase(mut self, phase: UnitPhase) -> Self {
        self.phase = phase;
        self
    }

    /// The same unit, moved to the measured phase.
    pub fn measured(self) -> Self {
        self.with_phase(UnitPhase::Measured)
    }
}

/// An opaque unit of work.
///
/// Implementations must be shareable across threads: every unit of a trial
/// calls `run` on the same instance concurrently.
pub trait Workload: Send + Sync {
    fn spec(&self) -> &WorkloadSpec;

    /// Perform `size` worth of work and return the number of items processed.
    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError>;

    fn id(&self) -> &WorkloadId {
        &self.spec().id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        spec: WorkloadSpec,
    }

    impl Workload for Counter {
        fn spec(&self) -> &WorkloadSpec {
            &self.spec
        }

        fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
            if ctx.is_cancelled() {
                return Err(WorkloadError::runtime("cancelled"));
            }
            Ok(size)
        }
    }

    fn counter() -> Counter {
        Counter {
            spec: WorkloadSpec::new(
                WorkloadId::new("test.counter").unwrap(),
                Category::Cpu,
                ScalingMode::FixedSingle,
                10,
                ItemUnit::Operations,
            ),
        }
    }

    #[test]
    fn test_spec_builders() {
        let spec = counter().spec.clone().latency().describe("sample");
        assert_eq!(spec.metric, MetricKind::Latency);
        assert_eq!(spec.description, "sample");
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let ctx = UnitContext::new(3, UnitPhase::WarmUp, token.clone(), None);
        assert!(ctx.is_warmup());
        assert_eq!(ctx.unit_index(), 3);

        let workload = counter();
        assert_eq!(workload.run(7, &ctx).unwrap(), 7);

        token.cancel();
        assert!(workload.run(7, &ctx).is_err());
        assert!(!ctx.measured().is_warmup());
    }
}
