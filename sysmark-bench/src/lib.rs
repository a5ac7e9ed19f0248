// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! sysmark Measurement Harness
//!
//! Runs opaque workloads under a concurrency plan, times each trial with a
//! monotonic clock, and aggregates the trials into per-category reports.
//!
//! # Pipeline
//!
//! - **Plan**: unit counts derived from the workload's scaling mode and the
//!   detected hardware concurrency
//! - **Trials**: thread or process units released together after warm-up,
//!   bounded by the per-trial and category deadlines
//! - **Aggregation**: pooled throughput, timing statistics and latency
//!   percentiles per (workload, unit count)
//! - **Reports**: one `CategoryReport` per category, optionally saved as JSON
//!
//! Built-in CPU, RAM, disk and network workloads live in [`workloads`].

pub mod aggregate;
pub mod clock;
pub mod info;
pub mod metrics;
pub mod plan;
pub mod process;
pub mod reporter;
pub mod runner;
pub mod session;
pub mod worker;
pub mod workloads;

pub use aggregate::Aggregator;
pub use clock::{Deadline, DeadlineSource, Timer};
pub use info::{InfoError, InfoProvider, InfoSnapshot, SysinfoProvider};
pub use metrics::{
    CategoryReport, CategoryStatus, LatencyPercentiles, MetricSummary, WorkloadOutcome,
    WorkloadReport,
};
pub use plan::{ConcurrencyPlan, HardwareConcurrency};
pub use process::ProcessLauncher;
pub use reporter::{JsonReporter, ReporterError};
pub use runner::{Trial, TrialOutcome, TrialRunner, TrialSeries};
pub use session::{scaling_speedup, SessionContext, SessionCoordinator};
pub use worker::{ProtocolError, WorkerMessage};
pub use workloads::builtin_registry;
