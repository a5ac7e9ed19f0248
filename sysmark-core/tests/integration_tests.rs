// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Integration tests for sysmark-core.
//!
//! These cover the flow from a configuration file on disk through the
//! registry checks and a full category walk of the session state machine.

use std::sync::Arc;
use std::time::Duration;

use sysmark_core::{
    Category, ConfigLoader, ConfigOverrides, HardValidationError, ItemUnit, ScalingMode,
    SessionState, SessionStateMachine, SysmarkError, UnitContext, Workload, WorkloadError,
    WorkloadId, WorkloadRegistry, WorkloadSpec,
};
use tempfile::TempDir;

struct Fixed(WorkloadSpec);

impl Workload for Fixed {
    fn spec(&self) -> &WorkloadSpec {
        &self.0
    }

    fn run(&self, size: u64, _ctx: &UnitContext) -> Result<u64, WorkloadError> {
        Ok(size)
    }
}

fn fixed(id: &str, category: Category) -> Arc<dyn Workload> {
    Arc::new(Fixed(WorkloadSpec::new(
        WorkloadId::new(id).unwrap(),
        category,
        ScalingMode::FixedSingle,
        10,
        ItemUnit::Operations,
    )))
}

#[test]
fn test_config_file_with_overrides() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("sysmark.yaml");
    std::fs::write(
        &path,
        r#"
repeatCount: 4
latencyRepeatCount: 20
perTrialTimeoutSeconds: 60
ioConcurrencyLevels: [1, 2, 4]
scratchDir: /var/tmp
workloads:
  cpu.single_core:
    size: 1000
"#,
    )
    .expect("Failed to write config");

    let overrides = ConfigOverrides {
        repeat_count: Some(2),
        io_concurrency_levels: Some(vec![8, 1]),
        ..ConfigOverrides::default()
    };
    let config = ConfigLoader::load_file_with(&path, &overrides).unwrap();

    assert_eq!(config.repeat_count, 2);
    assert_eq!(config.latency_repeat_count, 20);
    assert_eq!(config.per_trial_timeout, Duration::from_secs(60));
    assert_eq!(config.io_concurrency_levels, vec![1, 8]);
    assert_eq!(
        config.scratch_dir.as_deref(),
        Some(std::path::Path::new("/var/tmp"))
    );

    let mut registry = WorkloadRegistry::new();
    registry.register(fixed("cpu.single_core", Category::Cpu)).unwrap();
    let workload = registry.get_str("cpu.single_core").unwrap();
    assert_eq!(config.size_for(workload.spec()), 1000);
    assert_eq!(config.repeats_for(workload.spec()), 2);
    registry.check_config(&config).unwrap();
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = ConfigLoader::load_file(temp_dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, SysmarkError::ConfigNotFound { .. }));
}

#[test]
fn test_invalid_override_fails_fast() {
    let overrides = ConfigOverrides {
        repeat_count: Some(0),
        ..ConfigOverrides::default()
    };
    let err = ConfigLoader::from_overrides(&overrides).unwrap_err();
    assert!(matches!(
        err,
        SysmarkError::HardValidation(HardValidationError::InvalidFieldValue {
            field: "repeatCount",
            ..
        })
    ));
}

#[test]
fn test_unregistered_override_rejected() {
    let config = ConfigLoader::load_string(
        r#"
workloads:
  disk.unknown:
    size: 5
"#,
    )
    .unwrap();

    let mut registry = WorkloadRegistry::new();
    registry.register(fixed("disk.sequential_write", Category::Disk)).unwrap();
    assert!(registry.check_config(&config).is_err());
}

#[test]
fn test_registry_keeps_registration_order() {
    let mut registry = WorkloadRegistry::new();
    for (id, category) in [
        ("ram.b", Category::Ram),
        ("cpu.z", Category::Cpu),
        ("ram.a", Category::Ram),
    ] {
        registry.register(fixed(id, category)).unwrap();
    }

    let ram: Vec<String> = registry
        .for_category(Category::Ram)
        .iter()
        .map(|w| w.id().as_str().to_string())
        .collect();
    assert_eq!(ram, vec!["ram.b", "ram.a"]);
    assert!(registry.register(fixed("cpu.z", Category::Cpu)).is_err());
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_category_walk_through_state_machine() {
    let mut machine = SessionStateMachine::new(Category::Disk);

    // Workload 0: FixedSingle, one unit count.
    assert_eq!(machine.advance().unwrap(), 0);
    machine.transition_to(SessionState::PlanningConcurrency).unwrap();
    machine.transition_to(SessionState::Trialing).unwrap();
    machine.transition_to(SessionState::Aggregating).unwrap();

    // Workload 1: IO-bound, two levels.
    assert_eq!(machine.advance().unwrap(), 1);
    machine.transition_to(SessionState::PlanningConcurrency).unwrap();
    for _ in 0..2 {
        machine.transition_to(SessionState::Trialing).unwrap();
        machine.transition_to(SessionState::Aggregating).unwrap();
    }

    machine.transition_to(SessionState::PartialFailure).unwrap();
    assert!(machine.state().is_terminal());
    assert_eq!(machine.workload_index(), Some(1));
    assert!(machine.advance().is_err());
    assert!(machine.transition_to(SessionState::Complete).is_err());
}
