//! Robot-level shared types.
//!
//! - [`config`]: robot, joint, IMU and loop configuration with validation
//! - [`state`]: joint state, safety latch state, fault flags
//! - [`imu`]: quaternion and IMU sample
//! - [`telemetry`]: periodic status snapshot

pub mod config;
pub mod imu;
pub mod state;
pub mod telemetry;
