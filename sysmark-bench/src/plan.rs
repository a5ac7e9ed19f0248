// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Concurrency planning.
//!
//! A plan is derived once per workload from the hardware concurrency that
//! was detected at session start, and is never changed afterwards.

use serde::{Deserialize, Serialize};

use sysmark_core::{ScalingMode, SessionConfig, SysmarkError, SysmarkResult, UnitKind};

/// Physical and logical core counts of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareConcurrency {
    physical: usize,
    logical: usize,
}

impl HardwareConcurrency {
    /// Build from explicit counts. Physical is clamped to logical.
    pub fn new(physical: usize, logical: usize) -> SysmarkResult<Self> {
        if logical == 0 || physical == 0 {
            return Err(SysmarkError::HardwareDetection {
                reason: format!(
                    "reported {} physical / {} logical cores",
                    physical, logical
                ),
            });
        }
        Ok(Self {
            physical: physical.min(logical),
            logical,
        })
    }

    /// Detect the host's core counts.
    pub fn detect() -> SysmarkResult<Self> {
        let logical = num_cpus::get();
        let physical = num_cpus::get_physical();
        let detected = Self::new(physical, logical)?;

        tracing::info!(
            physical = detected.physical,
            logical = detected.logical,
            "Hardware concurrency detected"
        );

        Ok(detected)
    }

    pub fn physical(&self) -> usize {
        self.physical
    }

    pub fn logical(&self) -> usize {
        self.logical
    }
}

/// Unit counts to trial for one workload, and the kind of unit to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyPlan {
    unit_counts: Vec<usize>,
    unit_kind: UnitKind,
}

impl ConcurrencyPlan {
    /// Derive the plan for a scaling mode.
    ///
    /// `process_units` says whether a process launcher is configured; without
    /// one, process-scaled workloads fall back to thread units.
    pub fn for_scaling(
        scaling: ScalingMode,
        hardware: HardwareConcurrency,
        config: &SessionConfig,
        process_units: bool,
    ) -> Self {
        match scaling {
            ScalingMode::FixedSingle => Self {
                unit_counts: vec![1],
                unit_kind: UnitKind::None,
            },
            ScalingMode::ThreadScaled => Self::core_scaled(hardware, UnitKind::Thread),
            ScalingMode::ProcessScaled if process_units => {
                Self::core_scaled(hardware, UnitKind::Process)
            }
            ScalingMode::ProcessScaled => {
                tracing::warn!("No process launcher configured; scaling with threads instead");
                Self::core_scaled(hardware, UnitKind::Thread)
            }
            ScalingMode::IoBound => {
                let mut unit_counts: Vec<usize> = config
                    .io_concurrency_levels
                    .iter()
                    .copied()
                    .filter(|&n| n >= 1 && n <= config.max_io_units)
                    .collect();
                unit_counts.sort_unstable();
                unit_counts.dedup();
                if unit_counts.is_empty() {
                    unit_counts.push(1);
                }
                Self {
                    unit_counts,
                    unit_kind: UnitKind::Thread,
                }
            }
        }
    }

    /// `[1, physical, logical]`, deduplicated and ascending.
    fn core_scaled(hardware: HardwareConcurrency, unit_kind: UnitKind) -> Self {
        let mut unit_counts = vec![1, hardware.physical(), hardware.logical()];
        unit_counts.sort_unstable();
        unit_counts.dedup();
        Self {
            unit_counts,
            unit_kind,
        }
    }

    pub fn unit_counts(&self) -> &[usize] {
        &self.unit_counts
    }

    pub fn unit_kind(&self) -> UnitKind {
        self.unit_kind
    }

    /// Scaling is only meaningful when more than the single-unit baseline is measured.
    pub fn scaling_applicable(&self) -> bool {
        self.unit_counts.len() > 1
    }
}
