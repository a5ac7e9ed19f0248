// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML session configuration with strict validation.
//!
//! Every option has a default, so no file is required. Command-line
//! overrides are merged into the raw form before validation, so a value
//! from either source goes through the same checks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HardValidationError, SysmarkError, SysmarkResult};
use crate::types::WorkloadId;
use crate::workload::WorkloadSpec;

const MAX_REPEAT_COUNT: u32 = 1000;
const MAX_TIMEOUT_SECS: f64 = 24.0 * 3600.0;
const MAX_ESCALATIONS: u32 = 16;

/// Raw configuration as parsed from YAML (before validation).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawSessionConfig {
    #[serde(default = "default_repeat_count")]
    repeat_count: u32,
    #[serde(default = "default_latency_repeat_count")]
    latency_repeat_count: u32,
    #[serde(default = "default_per_trial_timeout")]
    per_trial_timeout_seconds: f64,
    #[serde(default = "default_category_timeout")]
    category_timeout_seconds: f64,
    #[serde(default = "default_io_levels")]
    io_concurrency_levels: Vec<usize>,
    #[serde(default = "default_max_io_units")]
    max_io_units: usize,
    #[serde(default = "default_min_trial_millis")]
    min_trial_millis: u64,
    #[serde(default = "default_max_escalations")]
    max_escalations: u32,
    #[serde(default = "default_cooldown_millis")]
    cooldown_millis: u64,
    #[serde(default = "default_category_pause")]
    category_pause_seconds: f64,
    #[serde(default)]
    scratch_dir: Option<String>,
    #[serde(default)]
    workloads: HashMap<String, RawWorkloadOverride>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWorkloadOverride {
    size: u64,
}

fn default_repeat_count() -> u32 {
    3
}

fn default_latency_repeat_count() -> u32 {
    10
}

fn default_per_trial_timeout() -> f64 {
    120.0
}

fn default_category_timeout() -> f64 {
    900.0
}

fn default_io_levels() -> Vec<usize> {
    vec![1, 4, 8]
}

fn default_max_io_units() -> usize {
    64
}

fn default_min_trial_millis() -> u64 {
    50
}

fn default_max_escalations() -> u32 {
    4
}

fn default_cooldown_millis() -> u64 {
    100
}

fn default_category_pause() -> f64 {
    3.0
}

impl Default for RawSessionConfig {
    fn default() -> Self {
        Self {
            repeat_count: default_repeat_count(),
            latency_repeat_count: default_latency_repeat_count(),
            per_trial_timeout_seconds: default_per_trial_timeout(),
            category_timeout_seconds: default_category_timeout(),
            io_concurrency_levels: default_io_levels(),
            max_io_units: default_max_io_units(),
            min_trial_millis: default_min_trial_millis(),
            max_escalations: default_max_escalations(),
            cooldown_millis: default_cooldown_millis(),
            category_pause_seconds: default_category_pause(),
            scratch_dir: None,
            workloads: HashMap::new(),
        }
    }
}

/// Overrides supplied on the command line. `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repeat_count: Option<u32>,
    pub per_trial_timeout_seconds: Option<f64>,
    pub category_timeout_seconds: Option<f64>,
    pub io_concurrency_levels: Option<Vec<usize>>,
    pub scratch_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    fn apply(&self, raw: &mut RawSessionConfig) {
        if let Some(v) = self.repeat_count {
            raw.repeat_count = v;
        }
        if let Some(v) = self.per_trial_timeout_seconds {
            raw.per_trial_timeout_seconds = v;
        }
        if let Some(v) = self.category_timeout_seconds {
            raw.category_timeout_seconds = v;
        }
        if let Some(v) = &self.io_concurrency_levels {
            raw.io_concurrency_levels = v.clone();
        }
        if let Some(v) = &self.scratch_dir {
            raw.scratch_dir = Some(v.to_string_lossy().into_owned());
        }
    }
}

/// Validated session configuration.
#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    /// Trials per (workload, unit count) for throughput workloads.
    pub repeat_count: u32,
    /// Trials per (workload, unit count) for latency workloads.
    pub latency_repeat_count: u32,
    pub per_trial_timeout: Duration,
    pub category_timeout: Duration,
    /// Concurrency levels for IO-bound workloads, strictly increasing.
    pub io_concurrency_levels: Vec<usize>,
    pub max_io_units: usize,
    /// Trials faster than this are re-run with a larger size.
    pub min_trial: Duration,
    pub max_escalations: u32,
    pub cooldown: Duration,
    pub category_pause: Duration,
    pub scratch_dir: Option<PathBuf>,
    pub size_overrides: HashMap<WorkloadId, u64>,
}

impl SessionConfig {
    /// Size parameter for a workload, honoring overrides.
    pub fn size_for(&self, spec: &WorkloadSpec) -> u64 {
        self.size_overrides
            .get(&spec.id)
            .copied()
            .unwrap_or(spec.size)
    }

    /// Trials per unit count for a workload.
    pub fn repeats_for(&self, spec: &WorkloadSpec) -> u32 {
        match spec.metric {
            crate::types::MetricKind::Throughput => self.repeat_count,
            crate::types::MetricKind::Latency => self.latency_repeat_count,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            repeat_count: default_repeat_count(),
            latency_repeat_count: default_latency_repeat_count(),
            per_trial_timeout: Duration::from_secs_f64(default_per_trial_timeout()),
            category_timeout: Duration::from_secs_f64(default_category_timeout()),
            io_concurrency_levels: default_io_levels(),
            max_io_units: default_max_io_units(),
            min_trial: Duration::from_millis(default_min_trial_millis()),
            max_escalations: default_max_escalations(),
            cooldown: Duration::from_millis(default_cooldown_millis()),
            category_pause: Duration::from_secs_f64(default_category_pause()),
            scratch_dir: None,
            size_overrides: HashMap::new(),
        }
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> SysmarkResult<SessionConfig> {
        Self::load_file_with(path, &ConfigOverrides::default())
    }

    /// Load a YAML file, apply overrides, then validate.
    pub fn load_file_with(
        path: impl AsRef<Path>,
        overrides: &ConfigOverrides,
    ) -> SysmarkResult<SessionConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SysmarkError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SysmarkError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string_with(&content, overrides)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> SysmarkResult<SessionConfig> {
        Self::load_string_with(content, &ConfigOverrides::default())
    }

    pub fn load_string_with(
        content: &str,
        overrides: &ConfigOverrides,
    ) -> SysmarkResult<SessionConfig> {
        let mut raw: RawSessionConfig = if content.trim().is_empty() {
            RawSessionConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| SysmarkError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?
        };

        overrides.apply(&mut raw);
        Self::validate(raw)
    }

    /// Defaults plus overrides, without a file.
    pub fn from_overrides(overrides: &ConfigOverrides) -> SysmarkResult<SessionConfig> {
        let mut raw = RawSessionConfig::default();
        overrides.apply(&mut raw);
        Self::validate(raw)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawSessionConfig) -> SysmarkResult<SessionConfig> {
        Self::check_count("repeatCount", raw.repeat_count)?;
        Self::check_count("latencyRepeatCount", raw.latency_repeat_count)?;

        let per_trial_timeout =
            Self::check_seconds("perTrialTimeoutSeconds", raw.per_trial_timeout_seconds)?;
        let category_timeout =
            Self::check_seconds("categoryTimeoutSeconds", raw.category_timeout_seconds)?;

        if !raw.category_pause_seconds.is_finite()
            || raw.category_pause_seconds < 0.0
            || raw.category_pause_seconds > MAX_TIMEOUT_SECS
        {
            return Err(HardValidationError::InvalidFieldValue {
                field: "categoryPauseSeconds",
                value: raw.category_pause_seconds.to_string(),
                reason: "Must be a non-negative number of seconds".to_string(),
            }
            .into());
        }

        if raw.max_io_units == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "maxIoUnits",
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            }
            .into());
        }

        let io_concurrency_levels =
            Self::validate_io_levels(raw.io_concurrency_levels, raw.max_io_units)?;

        if raw.min_trial_millis == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "minTrialMillis",
                value: "0".to_string(),
                reason: "Measurement floor must be greater than 0".to_string(),
            }
            .into());
        }

        if raw.max_escalations > MAX_ESCALATIONS {
            return Err(HardValidationError::InvalidFieldValue {
                field: "maxEscalations",
                value: raw.max_escalations.to_string(),
                reason: format!("Must not exceed {}", MAX_ESCALATIONS),
            }
            .into());
        }

        let mut size_overrides = HashMap::with_capacity(raw.workloads.len());
        for (id, over) in raw.workloads {
            let workload_id = WorkloadId::new(&id)?;
            if over.size == 0 {
                return Err(HardValidationError::InvalidFieldValue {
                    field: "workloads.size",
                    value: format!("{} = 0", id),
                    reason: "Size must be greater than 0".to_string(),
                }
                .into());
            }
            size_overrides.insert(workload_id, over.size);
        }

        Ok(SessionConfig {
            repeat_count: raw.repeat_count,
            latency_repeat_count: raw.latency_repeat_count,
            per_trial_timeout,
            category_timeout,
            io_concurrency_levels,
            max_io_units: raw.max_io_units,
            min_trial: Duration::from_millis(raw.min_trial_millis),
            max_escalations: raw.max_escalations,
            cooldown: Duration::from_millis(raw.cooldown_millis),
            category_pause: Duration::from_secs_f64(raw.category_pause_seconds),
            scratch_dir: raw.scratch_dir.map(PathBuf::from),
            size_overrides,
        })
    }

    fn check_count(field: &'static str, value: u32) -> SysmarkResult<()> {
        if value == 0 || value > MAX_REPEAT_COUNT {
            return Err(HardValidationError::InvalidFieldValue {
                field,
                value: value.to_string(),
                reason: format!("Must be between 1 and {}", MAX_REPEAT_COUNT),
            }
            .into());
        }
        Ok(())
    }

    fn check_seconds(field: &'static str, value: f64) -> SysmarkResult<Duration> {
        if !value.is_finite() || value <= 0.0 || value > MAX_TIMEOUT_SECS {
            return Err(HardValidationError::InvalidFieldValue {
                field,
                value: value.to_string(),
                reason: format!("Must be greater than 0 and at most {} seconds", MAX_TIMEOUT_SECS),
            }
            .into());
        }
        Ok(Duration::from_secs_f64(value))
    }

    /// Sort, deduplicate and bound the IO concurrency levels.
    fn validate_io_levels(mut levels: Vec<usize>, max_units: usize) -> SysmarkResult<Vec<usize>> {
        if levels.is_empty() {
            return Err(HardValidationError::SchemaValidation {
                message: "ioConcurrencyLevels must contain at least one level".to_string(),
            }
            .into());
        }

        if let Some(bad) = levels.iter().find(|&&l| l == 0 || l > max_units) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "ioConcurrencyLevels",
                value: bad.to_string(),
                reason: format!("Each level must be between 1 and maxIoUnits ({})", max_units),
            }
            .into());
        }

        levels.sort_unstable();
        levels.dedup();
        Ok(levels)
    }
}
