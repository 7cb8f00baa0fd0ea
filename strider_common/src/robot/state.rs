//! Runtime state types shared between the control unit and its host.

use std::fmt;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::AMBIENT_TEMPERATURE_C;

/// Measured state of one joint.
///
/// `timestamp` is the monotonic clock reading (time since clock origin)
/// at which the sample was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    /// Joint angle [rad].
    pub position: f64,
    /// Joint angular velocity [rad/s].
    pub velocity: f64,
    /// Joint torque [N·m].
    pub torque: f64,
    /// Winding temperature [°C].
    pub temperature: f64,
    /// Sample time since clock origin.
    pub timestamp: Duration,
}

impl Default for JointState {
    fn default() -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            torque: 0.0,
            temperature: AMBIENT_TEMPERATURE_C,
            timestamp: Duration::ZERO,
        }
    }
}

impl JointState {
    /// A resting joint at ambient temperature, stamped at `timestamp`.
    pub fn at_rest(timestamp: Duration) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }
}

bitflags! {
    /// Joint health violations detected by the safety predicate.
    ///
    /// Any set flag makes the joint unsafe and latches the safety monitor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JointFault: u8 {
        /// Temperature at or above `max_temperature`.
        const OVER_TEMPERATURE = 0x01;
        /// |velocity| at or above `max_velocity`.
        const OVER_VELOCITY    = 0x02;
        /// Position outside `[min_position, max_position]`.
        const OUT_OF_BOUNDS    = 0x04;
    }
}

impl Default for JointFault {
    fn default() -> Self {
        Self::empty()
    }
}

/// Global safety latch.
///
/// `Tripped` is terminal for the lifetime of a run: there is no transition
/// back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SafetyState {
    #[default]
    Normal,
    Tripped,
}

impl SafetyState {
    #[inline]
    pub const fn is_tripped(self) -> bool {
        matches!(self, Self::Tripped)
    }
}

/// Why the safety latch closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripCause {
    /// A joint controller failed its safety predicate.
    JointFault { joint: String, faults: JointFault },
    /// `trigger_emergency_stop` was called.
    EmergencyStop,
}

impl fmt::Display for TripCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JointFault { joint, faults } => {
                write!(f, "joint '{joint}' unsafe ({faults:?})")
            }
            Self::EmergencyStop => write!(f, "emergency stop requested"),
        }
    }
}
