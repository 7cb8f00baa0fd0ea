//! Periodic status snapshot handed to the host for logging or forwarding.

use std::fmt;

use heapless::{String as FixedString, Vec as FixedVec};
use serde::{Deserialize, Serialize};

use crate::consts::MAX_TELEMETRY_JOINTS;

/// Maximum joint name length carried in telemetry.
pub const TELEMETRY_NAME_LEN: usize = 32;

/// Coarse safety status as reported to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "EMERGENCY")]
    Emergency,
}

impl SafetyStatus {
    pub const fn from_safe(safe: bool) -> Self {
        if safe { Self::Ok } else { Self::Emergency }
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Emergency => f.write_str("EMERGENCY"),
        }
    }
}

/// Position of one selected joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointPosition {
    pub joint: FixedString<TELEMETRY_NAME_LEN>,
    /// [rad]
    pub position: f64,
}

impl JointPosition {
    /// Names longer than [`TELEMETRY_NAME_LEN`] are truncated.
    pub fn new(joint: &str, position: f64) -> Self {
        let mut name = FixedString::new();
        for c in joint.chars() {
            if name.push(c).is_err() {
                break;
            }
        }
        Self {
            joint: name,
            position,
        }
    }
}

/// `{timestamp, selected joint positions, balance estimate, safety status}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Seconds since clock origin.
    pub timestamp_s: f64,
    pub joints: FixedVec<JointPosition, MAX_TELEMETRY_JOINTS>,
    pub balance_estimate: f64,
    pub status: SafetyStatus,
}

impl TelemetrySnapshot {
    pub fn new(timestamp_s: f64, balance_estimate: f64, status: SafetyStatus) -> Self {
        Self {
            timestamp_s,
            joints: FixedVec::new(),
            balance_estimate,
            status,
        }
    }

    /// Add a joint position. Returns `false` once the snapshot is full.
    pub fn push_joint(&mut self, joint: &str, position: f64) -> bool {
        self.joints.push(JointPosition::new(joint, position)).is_ok()
    }

    /// Position of `joint`, if it was selected for this snapshot.
    pub fn position_of(&self, joint: &str) -> Option<f64> {
        self.joints
            .iter()
            .find(|j| j.joint.as_str() == joint)
            .map(|j| j.position)
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:.3}", self.timestamp_s)?;
        for j in &self.joints {
            write!(f, " {}={:.3}", j.joint, j.position)?;
        }
        write!(f, " balance={:.3} safety={}", self.balance_estimate, self.status)
    }
}
