// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `sysmark worker` - Process-unit entry point.
//!
//! Started by the trial runner for process-scaled workloads. Speaks the
//! unit protocol on stdin/stdout; anything else goes to stderr.

use std::io::{self, BufWriter};

use anyhow::Context;
use sysmark_bench::{builtin_registry, worker};

pub fn execute(workload_id: &str, size: u64) -> anyhow::Result<()> {
    let registry = builtin_registry()?;
    let workload = registry
        .get_str(workload_id)
        .with_context(|| format!("resolving workload {}", workload_id))?;

    tracing::debug!(workload = %workload_id, size, pid = std::process::id(), "Worker started");

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    worker::serve(workload.as_ref(), size, stdin, stdout)
        .with_context(|| format!("worker protocol for {}", workload_id))?;
    Ok(())
}
