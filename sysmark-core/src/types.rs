// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers and enums shared by every crate in the workspace.
//!
//! All types validate their invariants at creation time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Validated workload identifier.
/// Must be non-empty, alphanumeric with `-`, `_` or `.`, max 64 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkloadId(String);

impl WorkloadId {
    /// Create a new WorkloadId with validation.
    pub fn new(id: impl Into<String>) -> Result<Self, HardValidationError> {
        let id = id.into();

        if id.is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "workload_id",
                value: id,
                reason: "Workload ID cannot be empty".to_string(),
            });
        }

        if id.len() > 64 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "workload_id",
                value: id.clone(),
                reason: format!("Workload ID too long: {} chars (max 64)", id.len()),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(HardValidationError::InvalidFieldValue {
                field: "workload_id",
                value: id,
                reason: "Workload ID must contain only alphanumeric characters, '-', '_' and '.'"
                    .to_string(),
            });
        }

        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for WorkloadId {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkloadId> for String {
    fn from(id: WorkloadId) -> Self {
        id.0
    }
}

/// Benchmark category. Categories are always measured one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cpu,
    Ram,
    Disk,
    Network,
}

impl Category {
    /// Every category in session order.
    pub const ALL: [Category; 4] = [Self::Cpu, Self::Ram, Self::Disk, Self::Network];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Ram => "ram",
            Self::Disk => "disk",
            Self::Network => "network",
        }
    }

    /// Title used by the menu and report headers.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Ram => "RAM",
            Self::Disk => "Disk",
            Self::Network => "Network",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = HardValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "ram" | "memory" => Ok(Self::Ram),
            "disk" | "storage" => Ok(Self::Disk),
            "network" | "net" => Ok(Self::Network),
            _ => Err(HardValidationError::InvalidFieldValue {
                field: "category",
                value: s.to_string(),
                reason: "Expected one of cpu, ram, disk, network".to_string(),
            }),
        }
    }
}

/// How a workload is scaled across execution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalingMode {
    /// Always a single unit (single-core compute, one DNS lookup).
    FixedSingle,
    /// One thread per unit, scaled with core counts.
    ThreadScaled,
    /// One OS process per unit, scaled with core counts.
    ProcessScaled,
    /// Scaled at fixed concurrency levels; the device is the bottleneck.
    IoBound,
}

/// Kind of execution unit a concurrency plan dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Thread,
    Process,
    /// A single dedicated unit with no scaling.
    None,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread => f.write_str("thread"),
            Self::Process => f.write_str("process"),
            Self::None => f.write_str("single"),
        }
    }
}

/// Which aggregate view a workload's category surfaces as primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Items per second, pooled across trials.
    Throughput,
    /// One item per trial; the elapsed time is the latency sample.
    Latency,
}

/// What a workload's items-processed count measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemUnit {
    Bytes,
    Operations,
    Requests,
    Files,
}

impl ItemUnit {
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Bytes => "B",
            Self::Operations => "ops",
            Self::Requests => "req",
            Self::Files => "files",
        }
    }
}
