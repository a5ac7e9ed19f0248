// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for sysmark.
//!
//! Session-fatal errors and workload errors are kept apart: a `SysmarkError`
//! stops a session, a `WorkloadError` is recorded on a trial and never
//! escapes the harness as control flow.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Category, WorkloadId};

/// Top-level error type for a measurement session.
/// Every variant is fatal to the session that produced it.
#[derive(Debug, Error)]
pub enum SysmarkError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Session Errors
    // =========================================================================
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] StateTransitionError),

    #[error("Workload not found: {0}")]
    WorkloadNotFound(WorkloadId),

    #[error("Workload already registered: {0}")]
    WorkloadAlreadyRegistered(WorkloadId),

    // =========================================================================
    // Detection Errors - the only host failures that end a session
    // =========================================================================
    #[error("Cannot detect hardware concurrency: {reason}")]
    HardwareDetection { reason: String },

    #[error("Cannot build {category} info snapshot: {reason}")]
    InfoSnapshot { category: Category, reason: String },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors reject a configuration before any workload runs.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown workload in configuration: {id}")]
    UnknownWorkload { id: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// State transition errors for the session state machine.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition from {from} to {to} in {category} session")]
    InvalidTransition {
        category: Category,
        from: &'static str,
        to: &'static str,
    },

    #[error("{category} session is in terminal state: {state}")]
    TerminalState {
        category: Category,
        state: &'static str,
    },
}

/// Classification of a failed trial, surfaced per workload in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An execution unit could not be created (e.g. process spawn failure).
    WorkloadSetupError,
    /// A unit exceeded the per-trial deadline.
    WorkloadTimeout,
    /// The unit's work failed while running (disk full, unreachable host, ...).
    WorkloadRuntimeError,
    /// The host refused further concurrent units.
    ResourceExhaustion,
}

impl ErrorKind {
    /// Stable name used in reports and the worker protocol.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WorkloadSetupError => "WorkloadSetupError",
            Self::WorkloadTimeout => "WorkloadTimeout",
            Self::WorkloadRuntimeError => "WorkloadRuntimeError",
            Self::ResourceExhaustion => "ResourceExhaustion",
        }
    }

    /// Parse a name produced by [`ErrorKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "WorkloadSetupError" => Some(Self::WorkloadSetupError),
            "WorkloadTimeout" => Some(Self::WorkloadTimeout),
            "WorkloadRuntimeError" => Some(Self::WorkloadRuntimeError),
            "ResourceExhaustion" => Some(Self::ResourceExhaustion),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of a single execution unit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("Unit setup failed: {reason}")]
    Setup { reason: String },

    #[error("Unit exceeded deadline after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Workload failed: {reason}")]
    Runtime { reason: String },

    #[error("Host refused another unit: {reason}")]
    ResourceExhaustion { reason: String },
}

impl WorkloadError {
    /// Construct a runtime failure.
    pub fn runtime(reason: impl Into<String>) -> Self {
        Self::Runtime {
            reason: reason.into(),
        }
    }

    /// Construct a setup failure.
    pub fn setup(reason: impl Into<String>) -> Self {
        Self::Setup {
            reason: reason.into(),
        }
    }

    /// The report-level kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Setup { .. } => ErrorKind::WorkloadSetupError,
            Self::Timeout { .. } => ErrorKind::WorkloadTimeout,
            Self::Runtime { .. } => ErrorKind::WorkloadRuntimeError,
            Self::ResourceExhaustion { .. } => ErrorKind::ResourceExhaustion,
        }
    }

    /// Rebuild an error from its kind and message, as carried over the worker protocol.
    pub fn from_kind(kind: ErrorKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match kind {
            ErrorKind::WorkloadSetupError => Self::Setup { reason },
            ErrorKind::WorkloadTimeout => Self::Timeout {
                after_ms: reason.trim_end_matches("ms").parse().unwrap_or(0),
            },
            ErrorKind::WorkloadRuntimeError => Self::Runtime { reason },
            ErrorKind::ResourceExhaustion => Self::ResourceExhaustion { reason },
        }
    }

    /// The human-readable detail without the kind prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Setup { reason }
            | Self::Runtime { reason }
            | Self::ResourceExhaustion { reason } => reason.clone(),
            Self::Timeout { after_ms } => format!("{}ms", after_ms),
        }
    }
}

impl From<std::io::Error> for WorkloadError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::OutOfMemory | std::io::ErrorKind::WouldBlock => {
                Self::ResourceExhaustion {
                    reason: e.to_string(),
                }
            }
            std::io::ErrorKind::TimedOut => Self::Timeout { after_ms: 0 },
            _ => Self::Runtime {
                reason: e.to_string(),
            },
        }
    }
}

/// Result type alias using SysmarkError.
pub type SysmarkResult<T> = Result<T, SysmarkError>;
