//! Simulated sensors.
//!
//! Two sensor variants share one capability set ([`Sensor`]): a joint
//! encoder/torque/temperature sensor and an IMU. Collections that mix both
//! use the closed [`SensorHandle`] enum instead of trait objects.

pub mod imu;
pub mod joint;
pub mod noise;

use std::sync::Arc;

pub use imu::ImuSensorSim;
pub use joint::JointSensorSim;
pub use noise::NoiseSequence;

/// Capability set common to every simulated sensor.
pub trait Sensor: Send + Sync {
    /// Sample type produced by [`Sensor::read`].
    type Sample: Copy;

    fn name(&self) -> &str;

    /// Whether the sensor is currently delivering data.
    fn is_connected(&self) -> bool;

    /// Advance the simulation by one sample and return it, stamped with the
    /// current clock time.
    fn read(&self) -> Self::Sample;

    /// Most recent sample without advancing the simulation.
    fn latest(&self) -> Self::Sample;
}

/// Sensor kind, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Joint,
    Imu,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Joint => "joint",
            Self::Imu => "IMU",
        })
    }
}

/// Shared handle to any simulated sensor.
#[derive(Debug, Clone)]
pub enum SensorHandle {
    Joint(Arc<JointSensorSim>),
    Imu(Arc<ImuSensorSim>),
}

impl SensorHandle {
    pub fn name(&self) -> &str {
        match self {
            Self::Joint(s) => s.name(),
            Self::Imu(s) => s.name(),
        }
    }

    pub fn is_connected(&self) -> bool {
        match self {
            Self::Joint(s) => s.is_connected(),
            Self::Imu(s) => s.is_connected(),
        }
    }

    pub const fn kind(&self) -> SensorKind {
        match self {
            Self::Joint(_) => SensorKind::Joint,
            Self::Imu(_) => SensorKind::Imu,
        }
    }
}

impl From<Arc<JointSensorSim>> for SensorHandle {
    fn from(sensor: Arc<JointSensorSim>) -> Self {
        Self::Joint(sensor)
    }
}

impl From<Arc<ImuSensorSim>> for SensorHandle {
    fn from(sensor: Arc<ImuSensorSim>) -> Self {
        Self::Imu(sensor)
    }
}
