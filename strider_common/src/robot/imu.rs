//! Inertial measurement types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::GRAVITY;

/// 3-vector `[x, y, z]`.
pub type Vector3 = [f64; 3];

/// Orientation quaternion stored as `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Euclidean norm of all four components.
    #[inline]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Rescale to unit norm in place. A zero (or non-finite) quaternion
    /// cannot be rescaled and is reset to identity.
    pub fn normalize(&mut self) {
        let n = self.norm();
        if n > 0.0 && n.is_finite() {
            self.x /= n;
            self.y /= n;
            self.z /= n;
            self.w /= n;
        } else {
            *self = Self::IDENTITY;
        }
    }

    /// Roll angle about the x axis [rad]:
    /// `atan2(2(w·x + y·z), 1 − 2(x² + y²))`.
    #[inline]
    pub fn roll(&self) -> f64 {
        let sinr = 2.0 * (self.w * self.x + self.y * self.z);
        let cosr = 1.0 - 2.0 * (self.x * self.x + self.y * self.y);
        sinr.atan2(cosr)
    }

    /// Unit quaternion for a pure rotation of `angle` radians about x.
    pub fn from_roll(angle: f64) -> Self {
        let half = 0.5 * angle;
        Self::new(half.sin(), 0.0, 0.0, half.cos())
    }
}

/// One IMU sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    /// Orientation, kept at unit norm.
    pub orientation: Quaternion,
    /// Angular velocity [rad/s].
    pub angular_velocity: Vector3,
    /// Linear acceleration [m/s²].
    pub linear_acceleration: Vector3,
    /// Sample time since clock origin.
    pub timestamp: Duration,
}

impl Default for ImuSample {
    fn default() -> Self {
        Self {
            orientation: Quaternion::IDENTITY,
            angular_velocity: [0.0; 3],
            linear_acceleration: [0.0, 0.0, GRAVITY],
            timestamp: Duration::ZERO,
        }
    }
}
