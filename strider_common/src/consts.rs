//! System-wide constants for the Strider workspace.
//!
//! Single source of truth for numeric limits and controller defaults.

use static_assertions::const_assert;

/// Maximum number of joints a robot configuration may declare.
pub const MAX_JOINTS: usize = 32;

/// Maximum number of IMUs a robot configuration may declare.
pub const MAX_IMUS: usize = 8;

/// Maximum number of joints reported in one telemetry snapshot.
pub const MAX_TELEMETRY_JOINTS: usize = 8;

/// Default control loop frequency [Hz].
pub const DEFAULT_FREQUENCY_HZ: f64 = 200.0;

/// Accepted control loop frequency range [Hz].
pub const FREQUENCY_HZ_MIN: f64 = 1.0;
pub const FREQUENCY_HZ_MAX: f64 = 10_000.0;

/// Minimum interval between telemetry snapshots [s].
pub const DEFAULT_TELEMETRY_INTERVAL_S: f64 = 1.0;

/// Longest accepted telemetry interval [s].
pub const TELEMETRY_INTERVAL_S_MAX: f64 = 86_400.0;

/// Fraction of `max_temperature` above which torque is derated.
pub const THERMAL_DERATE_THRESHOLD: f64 = 0.9;

/// Torque multiplier applied while thermally derated.
pub const THERMAL_DERATE_FACTOR: f64 = 0.5;

/// Ambient temperature a joint starts at [°C].
pub const AMBIENT_TEMPERATURE_C: f64 = 25.0;

/// Standard gravity [m/s²].
pub const GRAVITY: f64 = 9.81;

/// Default balance fusion weight of a hip joint position sample.
pub const DEFAULT_HIP_WEIGHT: f64 = 0.3;

/// Default balance fusion weight of an IMU roll sample.
pub const DEFAULT_IMU_WEIGHT: f64 = 0.2;

/// Default phase increment of the deterministic noise sequence [rad].
pub const DEFAULT_NOISE_PHASE_STEP: f64 = 0.1;

/// Default IMU orientation integration step [s].
pub const DEFAULT_IMU_INTEGRATION_STEP_S: f64 = 0.01;

/// Default actuator settling delay [µs].
pub const DEFAULT_ACTUATOR_SETTLE_US: u64 = 500;

/// Default SCHED_FIFO priority of the control thread.
pub const DEFAULT_RT_PRIORITY: i32 = 80;

/// Accepted SCHED_FIFO priority range.
pub const RT_PRIORITY_MIN: i32 = 1;
pub const RT_PRIORITY_MAX: i32 = 99;

/// Stack prefaulted before the loop starts [KiB].
pub const DEFAULT_STACK_PREFAULT_KIB: usize = 256;

/// Largest accepted stack prefault [KiB]; the main thread stack is 8 MiB.
pub const MAX_STACK_PREFAULT_KIB: usize = 4096;

/// Tolerance for unit-quaternion checks.
pub const QUATERNION_NORM_TOLERANCE: f64 = 1e-9;

const_assert!(MAX_TELEMETRY_JOINTS <= MAX_JOINTS);
const_assert!(MAX_IMUS <= MAX_JOINTS);
const_assert!(RT_PRIORITY_MIN <= DEFAULT_RT_PRIORITY && DEFAULT_RT_PRIORITY <= RT_PRIORITY_MAX);
const_assert!(DEFAULT_STACK_PREFAULT_KIB <= MAX_STACK_PREFAULT_KIB);
