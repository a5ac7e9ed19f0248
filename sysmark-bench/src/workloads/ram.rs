// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Memory workloads.

use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use sysmark_core::{
    Category, ItemUnit, ScalingMode, SysmarkResult, UnitContext, Workload, WorkloadError,
    WorkloadSpec,
};

use super::{alloc_bytes, shared, spec, XorShift, KIB, MIB};

const ALLOCATION_BLOCKS: u64 = 10;
const RANDOM_READS: usize = 10_000;
/// Blocks a stress unit keeps alive at once.
const STRESS_RETAINED: usize = 4;
/// Entries in the pointer-chase ring (16 MiB of `u32`).
const CHASE_ENTRIES: usize = 4 * 1024 * 1024;

pub fn workloads() -> SysmarkResult<Vec<Arc<dyn Workload>>> {
    Ok(vec![
        shared(Allocation::new(spec(
            "ram.allocation",
            Category::Ram,
            ScalingMode::FixedSingle,
            100 * MIB,
            ItemUnit::Bytes,
            "Allocate ten blocks, fill with random bytes, sample reads",
        )?)),
        shared(Bandwidth::new(spec(
            "ram.bandwidth",
            Category::Ram,
            ScalingMode::FixedSingle,
            200 * MIB,
            ItemUnit::Bytes,
            "Sequential write then sequential read of one buffer",
        )?)),
        shared(Stress::new(spec(
            "ram.stress",
            Category::Ram,
            ScalingMode::ThreadScaled,
            24,
            ItemUnit::Operations,
            "Churn of 1-10 MiB blocks per thread",
        )?)),
        shared(PointerChase::new(
            spec(
                "ram.latency",
                Category::Ram,
                ScalingMode::FixedSingle,
                1,
                ItemUnit::Operations,
                "One dependent random load per sample over a 16 MiB ring",
            )?
            .latency(),
            CHASE_ENTRIES,
        )),
    ])
}

fn cancelled() -> WorkloadError {
    WorkloadError::runtime("cancelled")
}

/// Ten blocks totalling `size` bytes.
pub struct Allocation {
    spec: WorkloadSpec,
}

impl Allocation {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }
}

impl Workload for Allocation {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let mut rng = XorShift::for_unit(ctx);
        let block_size = (size / ALLOCATION_BLOCKS).max(1);
        let mut blocks = Vec::with_capacity(ALLOCATION_BLOCKS as usize);

        for _ in 0..ALLOCATION_BLOCKS {
            if ctx.is_cancelled() {
                return Err(cancelled());
            }
            let mut block = alloc_bytes(block_size)?;
            rng.fill(&mut block);
            blocks.push(block);
        }

        let mut sum = 0u64;
        for _ in 0..RANDOM_READS {
            let block = &blocks[rng.below(blocks.len() as u64) as usize];
            sum += block[rng.below(block.len() as u64) as usize] as u64;
        }
        black_box(sum);

        Ok(block_size * ALLOCATION_BLOCKS)
    }
}

/// Sequential write and read of a `size`-byte buffer.
pub struct Bandwidth {
    spec: WorkloadSpec,
}

impl Bandwidth {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }
}

impl Workload for Bandwidth {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let mut rng = XorShift::for_unit(ctx);
        let mut data = alloc_bytes(size)?;

        let mut pattern = [0u8; KIB as usize];
        rng.fill(&mut pattern);
        for chunk in data.chunks_mut(KIB as usize) {
            chunk.copy_from_slice(&pattern[..chunk.len()]);
        }
        if ctx.is_cancelled() {
            return Err(cancelled());
        }

        let total: u64 = data.iter().map(|&b| b as u64).sum();
        black_box(total);

        Ok(size.saturating_mul(2))
    }
}

/// `size` allocate-and-fill operations on 1-10 MiB blocks.
pub struct Stress {
    spec: WorkloadSpec,
}

impl Stress {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }
}

impl Workload for Stress {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let mut rng = XorShift::for_unit(ctx);
        let mut retained: Vec<Vec<u8>> = Vec::with_capacity(STRESS_RETAINED + 1);

        for _ in 0..size {
            if ctx.is_cancelled() {
                return Err(cancelled());
            }
            let len = MIB + rng.below(9 * MIB + 1);
            let mut block = alloc_bytes(len)?;
            rng.fill(&mut block);
            retained.push(block);
            if retained.len() > STRESS_RETAINED {
                retained.remove(0);
            }
        }

        black_box(&retained);
        Ok(size)
    }
}

/// Latency workload walking a random single-cycle permutation.
///
/// Each run is one sample of `size` dependent loads (1 by default) and reports
/// one item. Samples continue the walk where the previous one stopped, so
/// consecutive trials touch different parts of the ring.
pub struct PointerChase {
    spec: WorkloadSpec,
    entries: usize,
    ring: OnceLock<Vec<u32>>,
    cursor: AtomicUsize,
}

impl PointerChase {
    pub fn new(spec: WorkloadSpec, entries: usize) -> Self {
        Self {
            spec,
            entries: entries.clamp(2, u32::MAX as usize),
            ring: OnceLock::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Sattolo's shuffle: every index is visited before the walk repeats.
    fn build_ring(entries: usize) -> Vec<u32> {
        let mut ring: Vec<u32> = (0..entries as u32).collect();
        let mut rng = XorShift::new(0xC0FFEE);
        for i in (1..entries).rev() {
            let j = rng.below(i as u64) as usize;
            ring.swap(i, j);
        }
        ring
    }
}

impl Workload for PointerChase {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let ring = self.ring.get_or_init(|| Self::build_ring(self.entries));
        if ctx.is_cancelled() {
            return Err(cancelled());
        }

        let mut at = self.cursor.load(Ordering::Relaxed);
        for _ in 0..size.max(1) {
            at = ring[at] as usize;
        }
        self.cursor.store(black_box(at), Ordering::Relaxed);

        Ok(1)
    }
}
