// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Built-in workloads.
//!
//! The harness treats every body here as opaque; the only contract is
//! `run(size, ctx) -> items processed`.

use std::sync::Arc;

use tempfile::{NamedTempFile, TempDir};

use sysmark_core::{
    Category, ItemUnit, ScalingMode, SysmarkResult, UnitContext, Workload, WorkloadError,
    WorkloadId, WorkloadRegistry, WorkloadSpec,
};

pub mod cpu;
pub mod disk;
pub mod network;
pub mod ram;

pub(crate) const KIB: u64 = 1024;
pub(crate) const MIB: u64 = 1024 * 1024;

/// Registry with every built-in workload, in measurement order.
pub fn builtin_registry() -> SysmarkResult<WorkloadRegistry> {
    let mut registry = WorkloadRegistry::new();
    for workload in cpu::workloads()?
        .into_iter()
        .chain(ram::workloads()?)
        .chain(disk::workloads()?)
        .chain(network::workloads()?)
    {
        registry.register(workload)?;
    }
    Ok(registry)
}

pub(crate) fn spec(
    id: &str,
    category: Category,
    scaling: ScalingMode,
    size: u64,
    unit: ItemUnit,
    description: &str,
) -> SysmarkResult<WorkloadSpec> {
    Ok(
        WorkloadSpec::new(WorkloadId::new(id)?, category, scaling, size, unit)
            .describe(description),
    )
}

pub(crate) fn shared<W: Workload + 'static>(workload: W) -> Arc<dyn Workload> {
    Arc::new(workload)
}

/// xorshift64* generator for filling buffers and picking offsets.
#[derive(Debug, Clone)]
pub(crate) struct XorShift(u64);

impl XorShift {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    /// Seeded from the unit index so concurrent units differ.
    pub(crate) fn for_unit(ctx: &UnitContext) -> Self {
        Self::new(0x9E37_79B9_7F4A_7C15 ^ (ctx.unit_index() as u64 + 1))
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform-ish value in `0..bound`; `bound` must be non-zero.
    pub(crate) fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }

    pub(crate) fn fill(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// Zeroed buffer of `len` bytes; allocation failure is resource exhaustion.
pub(crate) fn alloc_bytes(len: u64) -> Result<Vec<u8>, WorkloadError> {
    let len = usize::try_from(len)
        .map_err(|_| WorkloadError::setup(format!("{} bytes exceeds address space", len)))?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|e| WorkloadError::ResourceExhaustion {
            reason: e.to_string(),
        })?;
    data.resize(len, 0u8);
    Ok(data)
}

/// Temporary file in the unit's scratch directory, removed on drop.
pub(crate) fn scratch_file(ctx: &UnitContext) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("sysmark-");
    match ctx.scratch_dir() {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

/// Temporary directory in the unit's scratch directory, removed on drop.
pub(crate) fn scratch_dir(ctx: &UnitContext) -> std::io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("sysmark-");
    match ctx.scratch_dir() {
        Some(dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysmark_core::{Category, UnitPhase};

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_registry().unwrap();
        for category in Category::ALL {
            assert!(
                !registry.for_category(category).is_empty(),
                "{} has no workloads",
                category
            );
        }
        assert!(registry.get_str("cpu.multi_process").is_ok());
        assert!(registry.get_str("disk.concurrent_io").is_ok());
    }

    #[test]
    fn test_registry_specs_consistent() {
        let registry = builtin_registry().unwrap();
        for category in Category::ALL {
            for workload in registry.for_category(category) {
                let spec = workload.spec();
                assert!(spec.id.as_str().starts_with(category.name()));
                assert!(spec.size > 0);
                assert!(!spec.description.is_empty());
            }
        }
    }

    #[test]
    fn test_xorshift_deterministic() {
        let mut a = XorShift::new(7);
        let mut b = XorShift::new(7);
        assert_eq!(a.next_u64(), b.next_u64());
        assert!(a.below(10) < 10);

        let mut buf = [0u8; 13];
        a.fill(&mut buf);
        assert!(buf.iter().any(|&x| x != 0));
    }

    #[test]
    fn test_scratch_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = UnitContext::new(
            0,
            UnitPhase::Measured,
            sysmark_core::CancelToken::new(),
            Some(dir.path().to_path_buf()),
        );
        let file = scratch_file(&ctx).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        drop(file);
        assert!(!path.exists());
    }
}
