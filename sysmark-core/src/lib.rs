//! sysmark Core Library
//!
//! Shared vocabulary of the sysmark harness: validated identifiers and
//! enums, the error taxonomy, session configuration, the session state
//! machine, the workload trait and the explicit workload registry.

pub mod config;
pub mod error;
pub mod registry;
pub mod state;
pub mod types;
pub mod workload;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigOverrides, SessionConfig};
pub use error::{
    ErrorKind, HardValidationError, StateTransitionError, SysmarkError, SysmarkResult,
    WorkloadError,
};
pub use registry::WorkloadRegistry;
pub use state::{SessionState, SessionStateMachine};
pub use types::{Category, ItemUnit, MetricKind, ScalingMode, UnitKind, WorkloadId};
pub use workload::{CancelToken, UnitContext, UnitPhase, Workload, WorkloadSpec};
