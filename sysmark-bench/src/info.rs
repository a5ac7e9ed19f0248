// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Read-only system information.
//!
//! The coordinator asks for one snapshot per category, before any workload
//! runs, and attaches it to the report as metadata.

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, Networks, System};
use thiserror::Error;

use sysmark_core::Category;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Errors building an info snapshot.
#[derive(Debug, Error)]
pub enum InfoError {
    #[error("{what} information unavailable")]
    Unavailable { what: &'static str },
}

/// Descriptive labels and numeric facts about the host, for one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoSnapshot {
    /// Insertion-ordered text entries, e.g. `("Processor", "AMD Ryzen 7")`.
    pub labels: Vec<(String, String)>,
    /// Insertion-ordered numeric entries, e.g. `("memory_total_gb", 31.2)`.
    pub facts: Vec<(String, f64)>,
}

impl InfoSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    pub fn fact(mut self, key: impl Into<String>, value: f64) -> Self {
        self.facts.push((key.into(), value));
        self
    }

    pub fn get_label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_fact(&self, key: &str) -> Option<f64> {
        self.facts.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

/// Source of category info snapshots.
pub trait InfoProvider: Send + Sync {
    fn snapshot(&self, category: Category) -> Result<InfoSnapshot, InfoError>;
}

/// [`InfoProvider`] backed by `sysinfo`.
#[derive(Debug, Default)]
pub struct SysinfoProvider;

impl SysinfoProvider {
    pub fn new() -> Self {
        Self
    }

    fn os_labels(snapshot: InfoSnapshot) -> InfoSnapshot {
        let unknown = || "Unknown".to_string();
        snapshot
            .label("OS", System::name().unwrap_or_else(unknown))
            .label("OS version", System::os_version().unwrap_or_else(unknown))
            .label("Kernel", System::kernel_version().unwrap_or_else(unknown))
            .label("Hostname", System::host_name().unwrap_or_else(unknown))
    }

    fn cpu(snapshot: InfoSnapshot) -> Result<InfoSnapshot, InfoError> {
        let mut sys = System::new();
        sys.refresh_cpu();

        let cpus = sys.cpus();
        let first = cpus.first().ok_or(InfoError::Unavailable { what: "CPU" })?;
        let logical = cpus.len();
        let physical = sys.physical_core_count().unwrap_or(logical);
        let max_mhz = cpus.iter().map(|c| c.frequency()).max().unwrap_or(0);

        Ok(snapshot
            .label("Processor", first.brand().trim())
            .label("Vendor", first.vendor_id())
            .label("Architecture", System::cpu_arch().unwrap_or_default())
            .fact("physical_cores", physical as f64)
            .fact("logical_cores", logical as f64)
            .fact("frequency_mhz", max_mhz as f64))
    }

    fn memory(snapshot: InfoSnapshot) -> Result<InfoSnapshot, InfoError> {
        let mut sys = System::new();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(InfoError::Unavailable { what: "memory" });
        }
        let used = sys.used_memory();

        Ok(snapshot
            .fact("memory_total_gb", total as f64 / GIB)
            .fact("memory_available_gb", sys.available_memory() as f64 / GIB)
            .fact("memory_used_gb", used as f64 / GIB)
            .fact("memory_used_percent", used as f64 * 100.0 / total as f64)
            .fact("swap_total_gb", sys.total_swap() as f64 / GIB)
            .fact("swap_used_gb", sys.used_swap() as f64 / GIB))
    }

    fn disks(mut snapshot: InfoSnapshot) -> InfoSnapshot {
        let disks = Disks::new_with_refreshed_list();
        let mut total = 0u64;
        let mut available = 0u64;

        for disk in disks.list() {
            total += disk.total_space();
            available += disk.available_space();
            snapshot = snapshot.label(
                disk.mount_point().display().to_string(),
                format!(
                    "{} ({}, {:.2} GB free of {:.2} GB)",
                    disk.name().to_string_lossy(),
                    disk.file_system().to_string_lossy(),
                    disk.available_space() as f64 / GIB,
                    disk.total_space() as f64 / GIB,
                ),
            );
        }

        snapshot
            .fact("disk_count", disks.list().len() as f64)
            .fact("disk_total_gb", total as f64 / GIB)
            .fact("disk_free_gb", available as f64 / GIB)
    }

    fn networks(mut snapshot: InfoSnapshot) -> InfoSnapshot {
        let networks = Networks::new_with_refreshed_list();
        let mut received = 0u64;
        let mut transmitted = 0u64;
        let mut names: Vec<&String> = Vec::new();

        for (name, data) in &networks {
            received += data.total_received();
            transmitted += data.total_transmitted();
            names.push(name);
        }
        names.sort();
        for name in &names {
            snapshot = snapshot.label("Interface", name.as_str());
        }

        snapshot
            .fact("interface_count", names.len() as f64)
            .fact("bytes_received", received as f64)
            .fact("bytes_sent", transmitted as f64)
    }
}

impl InfoProvider for SysinfoProvider {
    fn snapshot(&self, category: Category) -> Result<InfoSnapshot, InfoError> {
        let snapshot = Self::os_labels(InfoSnapshot::new());
        let snapshot = match category {
            Category::Cpu => Self::cpu(snapshot)?,
            Category::Ram => Self::memory(snapshot)?,
            Category::Disk => Self::disks(snapshot),
            Category::Network => Self::networks(snapshot),
        };

        tracing::debug!(
            category = %category,
            labels = snapshot.labels.len(),
            facts = snapshot.facts.len(),
            "Info snapshot collected"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder() {
        let snapshot = InfoSnapshot::new()
            .label("Processor", "Test CPU")
            .fact("logical_cores", 8.0);
        assert_eq!(snapshot.get_label("Processor"), Some("Test CPU"));
        assert_eq!(snapshot.get_fact("logical_cores"), Some(8.0));
        assert_eq!(snapshot.get_fact("missing"), None);
    }

    #[test]
    fn test_cpu_snapshot() {
        let snapshot = SysinfoProvider::new().snapshot(Category::Cpu).unwrap();
        assert!(snapshot.get_label("OS").is_some());
        assert!(snapshot.get_fact("logical_cores").unwrap() >= 1.0);
    }

    #[test]
    fn test_memory_snapshot() {
        let snapshot = SysinfoProvider::new().snapshot(Category::Ram).unwrap();
        assert!(snapshot.get_fact("memory_total_gb").unwrap() > 0.0);
    }

    #[test]
    fn test_every_category_has_os_labels() {
        let provider = SysinfoProvider::new();
        for category in Category::ALL {
            let snapshot = provider.snapshot(category).unwrap();
            assert!(snapshot.get_label("Hostname").is_some());
        }
    }
}
