// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Storage workloads.
//!
//! Every file lives in the unit's scratch directory and is removed when its
//! handle drops, on success and failure alike.

use std::collections::HashMap;
use std::fs;
use std::hint::black_box;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use sysmark_core::{
    Category, ItemUnit, ScalingMode, SysmarkResult, UnitContext, Workload, WorkloadError,
    WorkloadSpec,
};

use super::{scratch_dir, scratch_file, shared, spec, XorShift, KIB, MIB};

const CHUNK: usize = MIB as usize;
const RANDOM_FILE_LEN: u64 = 50 * MIB;
const SMALL_FILE_LEN: usize = KIB as usize;

pub fn workloads() -> SysmarkResult<Vec<Arc<dyn Workload>>> {
    Ok(vec![
        shared(SequentialWrite::new(spec(
            "disk.sequential_write",
            Category::Disk,
            ScalingMode::FixedSingle,
            100 * MIB,
            ItemUnit::Bytes,
            "Write a file in 1 MiB chunks and sync it",
        )?)),
        shared(SequentialRead::new(spec(
            "disk.sequential_read",
            Category::Disk,
            ScalingMode::FixedSingle,
            100 * MIB,
            ItemUnit::Bytes,
            "Read back a prepared file and verify its CRC32",
        )?)),
        shared(RandomAccess::new(spec(
            "disk.random_access",
            Category::Disk,
            ScalingMode::FixedSingle,
            1_000,
            ItemUnit::Operations,
            "1 KiB reads at random offsets of a 50 MiB file",
        )?)),
        shared(SmallFiles::new(spec(
            "disk.small_files",
            Category::Disk,
            ScalingMode::FixedSingle,
            500,
            ItemUnit::Files,
            "Create, read and delete 1 KiB files",
        )?)),
        shared(ConcurrentIo::new(spec(
            "disk.concurrent_io",
            Category::Disk,
            ScalingMode::IoBound,
            25 * MIB,
            ItemUnit::Bytes,
            "Per-unit file write and read back",
        )?)),
    ])
}

fn cancelled() -> WorkloadError {
    WorkloadError::runtime("cancelled")
}

/// Write `len` pseudo-random bytes in 1 MiB chunks. Returns the CRC32 of what was written.
fn write_random(
    file: &mut fs::File,
    len: u64,
    rng: &mut XorShift,
    ctx: &UnitContext,
) -> Result<u32, WorkloadError> {
    let mut chunk = vec![0u8; CHUNK];
    let mut hasher = crc32fast::Hasher::new();
    let mut remaining = len;

    while remaining > 0 {
        if ctx.is_cancelled() {
            return Err(cancelled());
        }
        let n = remaining.min(CHUNK as u64) as usize;
        rng.fill(&mut chunk[..n]);
        file.write_all(&chunk[..n])?;
        hasher.update(&chunk[..n]);
        remaining -= n as u64;
    }
    file.flush()?;
    Ok(hasher.finalize())
}

/// Read the whole file from the start in 1 MiB chunks. Returns bytes read and their CRC32.
fn read_all(file: &mut fs::File, ctx: &UnitContext) -> Result<(u64, u32), WorkloadError> {
    file.seek(SeekFrom::Start(0))?;
    let mut chunk = vec![0u8; CHUNK];
    let mut hasher = crc32fast::Hasher::new();
    let mut total = 0u64;

    loop {
        if ctx.is_cancelled() {
            return Err(cancelled());
        }
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        hasher.update(&chunk[..n]);
        total += n as u64;
    }
    Ok((total, hasher.finalize()))
}

/// A file written ahead of the measured pass.
struct PreparedFile {
    file: NamedTempFile,
    len: u64,
    crc: u32,
}

impl PreparedFile {
    fn create(len: u64, ctx: &UnitContext) -> Result<Self, WorkloadError> {
        let mut file = scratch_file(ctx)?;
        let mut rng = XorShift::for_unit(ctx);
        let crc = write_random(file.as_file_mut(), len, &mut rng, ctx)?;
        file.as_file().sync_all()?;
        Ok(Self { file, len, crc })
    }
}

/// Files prepared during warm-up, keyed by unit index.
///
/// Thread units share the workload instance and process units run warm-up and
/// measured pass in the same child, so the index identifies the file either way.
#[derive(Default)]
struct PreparedFiles {
    files: Mutex<HashMap<usize, PreparedFile>>,
}

impl PreparedFiles {
    fn prepare(&self, len: u64, ctx: &UnitContext) -> Result<(), WorkloadError> {
        let prepared = PreparedFile::create(len, ctx)?;
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(ctx.unit_index(), prepared);
        Ok(())
    }

    /// The unit's prepared file of `len` bytes, written now if warm-up left none.
    fn take(&self, len: u64, ctx: &UnitContext) -> Result<PreparedFile, WorkloadError> {
        let existing = self
            .files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&ctx.unit_index());
        match existing {
            Some(prepared) if prepared.len == len => Ok(prepared),
            _ => {
                tracing::debug!(unit = ctx.unit_index(), len, "Preparing read file inline");
                PreparedFile::create(len, ctx)
            }
        }
    }
}

/// Sequential write of `size` bytes followed by `sync_all`.
pub struct SequentialWrite {
    spec: WorkloadSpec,
}

impl SequentialWrite {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }
}

impl Workload for SequentialWrite {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let mut file = scratch_file(ctx)?;
        let mut rng = XorShift::for_unit(ctx);
        write_random(file.as_file_mut(), size, &mut rng, ctx)?;
        file.as_file().sync_all()?;
        Ok(size)
    }
}

/// Sequential read of a `size`-byte file written during warm-up.
pub struct SequentialRead {
    spec: WorkloadSpec,
    prepared: PreparedFiles,
}

impl SequentialRead {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self {
            spec,
            prepared: PreparedFiles::default(),
        }
    }
}

impl Workload for SequentialRead {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        if ctx.is_warmup() {
            self.prepared.prepare(size, ctx)?;
            return Ok(size);
        }

        let mut prepared = self.prepared.take(size, ctx)?;
        let (read, crc) = read_all(prepared.file.as_file_mut(), ctx)?;
        if read != prepared.len {
            return Err(WorkloadError::runtime(format!(
                "short read: {} of {} bytes",
                read, prepared.len
            )));
        }
        if crc != prepared.crc {
            return Err(WorkloadError::runtime(format!(
                "checksum mismatch: read {:08x}, wrote {:08x}",
                crc, prepared.crc
            )));
        }
        Ok(read)
    }
}

/// `size` 1 KiB reads at random offsets of a 50 MiB file written during warm-up.
pub struct RandomAccess {
    spec: WorkloadSpec,
    file_len: u64,
    prepared: PreparedFiles,
}

impl RandomAccess {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self::with_file_len(spec, RANDOM_FILE_LEN)
    }

    pub fn with_file_len(spec: WorkloadSpec, file_len: u64) -> Self {
        Self {
            spec,
            file_len: file_len.max(KIB),
            prepared: PreparedFiles::default(),
        }
    }
}

impl Workload for RandomAccess {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        if ctx.is_warmup() {
            self.prepared.prepare(self.file_len, ctx)?;
            return Ok(size);
        }

        let mut prepared = self.prepared.take(self.file_len, ctx)?;
        let file = prepared.file.as_file_mut();
        let mut rng = XorShift::for_unit(ctx);
        let mut buf = [0u8; KIB as usize];
        let span = self.file_len - KIB + 1;

        for i in 0..size {
            if i % 256 == 0 && ctx.is_cancelled() {
                return Err(cancelled());
            }
            file.seek(SeekFrom::Start(rng.below(span)))?;
            file.read_exact(&mut buf)?;
            black_box(&buf);
        }
        Ok(size)
    }
}

/// Create, read back and delete `size` 1 KiB files.
pub struct SmallFiles {
    spec: WorkloadSpec,
}

impl SmallFiles {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }
}

impl Workload for SmallFiles {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let dir = scratch_dir(ctx)?;
        let mut rng = XorShift::for_unit(ctx);
        let mut content = [0u8; SMALL_FILE_LEN];
        rng.fill(&mut content);

        let paths: Vec<_> = (0..size)
            .map(|i| dir.path().join(format!("file_{}.dat", i)))
            .collect();

        for path in &paths {
            if ctx.is_cancelled() {
                return Err(cancelled());
            }
            fs::write(path, content)?;
        }

        let mut read_back = Vec::with_capacity(SMALL_FILE_LEN);
        for path in &paths {
            read_back.clear();
            fs::File::open(path)?.read_to_end(&mut read_back)?;
            if read_back.len() != SMALL_FILE_LEN {
                return Err(WorkloadError::runtime(format!(
                    "{} holds {} bytes",
                    path.display(),
                    read_back.len()
                )));
            }
        }

        for path in &paths {
            fs::remove_file(path)?;
        }
        Ok(size)
    }
}

/// Write then read back a private `size`-byte file per unit.
pub struct ConcurrentIo {
    spec: WorkloadSpec,
}

impl ConcurrentIo {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }
}

impl Workload for ConcurrentIo {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let mut file = scratch_file(ctx)?;
        let mut rng = XorShift::for_unit(ctx);
        let written = write_random(file.as_file_mut(), size, &mut rng, ctx)?;
        file.as_file().sync_all()?;

        let (read, crc) = read_all(file.as_file_mut(), ctx)?;
        if read != size || crc != written {
            return Err(WorkloadError::runtime(
                "read-back does not match written data",
            ));
        }
        Ok(size.saturating_mul(2))
    }
}
