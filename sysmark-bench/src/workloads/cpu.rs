// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CPU workloads.

use std::hint::black_box;
use std::sync::{Arc, OnceLock};

use sysmark_core::{
    Category, ItemUnit, ScalingMode, SysmarkResult, UnitContext, Workload, WorkloadError,
    WorkloadSpec,
};

use super::{alloc_bytes, shared, spec, XorShift, KIB, MIB};

/// Square-root spin; polls for cancellation every this many iterations.
const SPIN_BATCH: u64 = 65_536;
/// Side of the square matrices multiplied by [`MatrixMultiply`].
const MATRIX_DIM: usize = 150;

pub fn workloads() -> SysmarkResult<Vec<Arc<dyn Workload>>> {
    Ok(vec![
        shared(SqrtSpin::new(spec(
            "cpu.single_core",
            Category::Cpu,
            ScalingMode::FixedSingle,
            2_000_000,
            ItemUnit::Operations,
            "Square-root spin on one core",
        )?)),
        shared(SqrtSpin::new(spec(
            "cpu.multi_thread",
            Category::Cpu,
            ScalingMode::ThreadScaled,
            2_000_000,
            ItemUnit::Operations,
            "Square-root spin on every core, one thread each",
        )?)),
        shared(SqrtSpin::new(spec(
            "cpu.multi_process",
            Category::Cpu,
            ScalingMode::ProcessScaled,
            2_000_000,
            ItemUnit::Operations,
            "Square-root spin on every core, one process each",
        )?)),
        shared(MatrixMultiply::new(spec(
            "cpu.matrix_multiply",
            Category::Cpu,
            ScalingMode::FixedSingle,
            4,
            ItemUnit::Operations,
            "150x150 f64 matrix multiply, counted in multiply-adds",
        )?)),
        shared(BlockFill::new(spec(
            "cpu.memory_bandwidth",
            Category::Cpu,
            ScalingMode::FixedSingle,
            50 * MIB,
            ItemUnit::Bytes,
            "1 KiB block fill and sum over a buffer",
        )?)),
    ])
}

/// `size` iterations of `sqrt(i * r)` with pseudo-random `r`.
pub struct SqrtSpin {
    spec: WorkloadSpec,
}

impl SqrtSpin {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }
}

impl Workload for SqrtSpin {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let mut rng = XorShift::for_unit(ctx);
        let mut acc = 0.0f64;
        let mut done = 0u64;

        while done < size {
            if ctx.is_cancelled() {
                return Err(WorkloadError::runtime("cancelled"));
            }
            let batch = SPIN_BATCH.min(size - done);
            for i in done..done + batch {
                let r = (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
                acc += black_box((i as f64 * r).sqrt());
            }
            done += batch;
        }

        black_box(acc);
        Ok(done)
    }
}

/// `size` repetitions of a dense `MATRIX_DIM`² multiply.
///
/// Inputs are generated once, on the first (warm-up) run.
pub struct MatrixMultiply {
    spec: WorkloadSpec,
    inputs: OnceLock<(Vec<f64>, Vec<f64>)>,
}

impl MatrixMultiply {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self {
            spec,
            inputs: OnceLock::new(),
        }
    }

    fn random_inputs(n: usize) -> (Vec<f64>, Vec<f64>) {
        let mut rng = XorShift::new(0x5EED_F00D);
        let mut random = || (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        let a = (0..n * n).map(|_| random()).collect();
        let b = (0..n * n).map(|_| random()).collect();
        (a, b)
    }

    fn multiply(a: &[f64], b: &[f64], out: &mut [f64], n: usize) {
        out.fill(0.0);
        for i in 0..n {
            for k in 0..n {
                let aik = a[i * n + k];
                let row = &b[k * n..(k + 1) * n];
                let dst = &mut out[i * n..(i + 1) * n];
                for (d, bkj) in dst.iter_mut().zip(row) {
                    *d += aik * bkj;
                }
            }
        }
    }
}

impl Workload for MatrixMultiply {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let n = MATRIX_DIM;
        let (a, b) = self.inputs.get_or_init(|| Self::random_inputs(n));
        let mut out = vec![0.0f64; n * n];

        for _ in 0..size {
            if ctx.is_cancelled() {
                return Err(WorkloadError::runtime("cancelled"));
            }
            Self::multiply(a, b, &mut out, n);
            black_box(&out);
        }

        let per_multiply = (n * n * n) as u64;
        Ok(size.saturating_mul(per_multiply))
    }
}

/// Fill a `size`-byte buffer in 1 KiB blocks, then sum it back.
pub struct BlockFill {
    spec: WorkloadSpec,
}

impl BlockFill {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }
}

impl Workload for BlockFill {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let mut data = alloc_bytes(size)?;

        let block = [b'1'; KIB as usize];
        for chunk in data.chunks_mut(KIB as usize) {
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
        if ctx.is_cancelled() {
            return Err(WorkloadError::runtime("cancelled"));
        }

        let total: u64 = data
            .chunks(KIB as usize)
            .map(|c| c.iter().map(|&b| b as u64).sum::<u64>())
            .sum();
        black_box(total);

        Ok(size.saturating_mul(2))
    }
}
