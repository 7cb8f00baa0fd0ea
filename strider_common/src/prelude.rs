//! Common re-exports: `use strider_common::prelude::*;`

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::robot::config::{
    ControlConfig, FusionConfig, ImuConfig, JointConfig, RobotConfig, RtConfig, SimulationConfig,
};

// ─── Runtime Types ──────────────────────────────────────────────────
pub use crate::robot::imu::{ImuSample, Quaternion, Vector3};
pub use crate::robot::state::{JointFault, JointState, SafetyState, TripCause};
pub use crate::robot::telemetry::{JointPosition, SafetyStatus, TelemetrySnapshot};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_FREQUENCY_HZ, MAX_IMUS, MAX_JOINTS};
