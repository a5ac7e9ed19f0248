// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Explicit workload registry.
//!
//! Workloads are registered once at startup, in the order they are measured
//! within their category. The registry is read-only after construction.

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::{HardValidationError, SysmarkError, SysmarkResult};
use crate::types::{Category, WorkloadId};
use crate::workload::Workload;

/// Ordered registry of workloads.
#[derive(Default)]
pub struct WorkloadRegistry {
    workloads: Vec<Arc<dyn Workload>>,
}

impl WorkloadRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workload.
    /// Returns `WorkloadAlreadyRegistered` if the id is taken.
    pub fn register(&mut self, workload: Arc<dyn Workload>) -> SysmarkResult<()> {
        let id = workload.id().clone();

        if self.contains(&id) {
            return Err(SysmarkError::WorkloadAlreadyRegistered(id));
        }

        tracing::debug!(workload = %id, category = %workload.spec().category, "Registered workload");
        self.workloads.push(workload);
        Ok(())
    }

    /// Look up a workload by id.
    pub fn get(&self, id: &WorkloadId) -> SysmarkResult<Arc<dyn Workload>> {
        self.workloads
            .iter()
            .find(|w| w.id() == id)
            .cloned()
            .ok_or_else(|| SysmarkError::WorkloadNotFound(id.clone()))
    }

    /// Look up a workload by raw string id (used by the worker entry point).
    pub fn get_str(&self, id: &str) -> SysmarkResult<Arc<dyn Workload>> {
        let id = WorkloadId::new(id)?;
        self.get(&id)
    }

    /// Workloads of one category, in registration order.
    pub fn for_category(&self, category: Category) -> Vec<Arc<dyn Workload>> {
        self.workloads
            .iter()
            .filter(|w| w.spec().category == category)
            .cloned()
            .collect()
    }

    /// Check if a workload exists.
    pub fn contains(&self, id: &WorkloadId) -> bool {
        self.workloads.iter().any(|w| w.id() == id)
    }

    pub fn len(&self) -> usize {
        self.workloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty()
    }

    /// All workload ids in registration order.
    pub fn ids(&self) -> Vec<WorkloadId> {
        self.workloads.iter().map(|w| w.id().clone()).collect()
    }

    /// Reject size overrides that name workloads this registry does not know.
    pub fn check_config(&self, config: &SessionConfig) -> SysmarkResult<()> {
        let mut unknown: Vec<&WorkloadId> = config
            .size_overrides
            .keys()
            .filter(|id| !self.contains(id))
            .collect();
        unknown.sort();

        match unknown.first() {
            Some(id) => Err(HardValidationError::UnknownWorkload { id: id.to_string() }.into()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for WorkloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadRegistry")
            .field("workloads", &self.ids())
            .finish()
    }
}
