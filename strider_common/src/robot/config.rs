//! Robot configuration: control loop, fusion tunables, simulation and
//! per-joint / per-IMU parameters.
//!
//! All types deserialize from TOML with `#[serde(default)]` for optional
//! fields. [`RobotConfig::validate`] must pass before any controller is built;
//! joint configs are immutable afterwards.

use std::collections::HashSet;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_ACTUATOR_SETTLE_US, DEFAULT_FREQUENCY_HZ, DEFAULT_HIP_WEIGHT,
    DEFAULT_IMU_INTEGRATION_STEP_S, DEFAULT_IMU_WEIGHT, DEFAULT_NOISE_PHASE_STEP,
    DEFAULT_RT_PRIORITY, DEFAULT_STACK_PREFAULT_KIB, DEFAULT_TELEMETRY_INTERVAL_S,
    FREQUENCY_HZ_MAX, FREQUENCY_HZ_MIN, MAX_IMUS, MAX_JOINTS, MAX_STACK_PREFAULT_KIB,
    MAX_TELEMETRY_JOINTS, RT_PRIORITY_MAX, RT_PRIORITY_MIN, TELEMETRY_INTERVAL_S_MAX,
};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete robot description loaded at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub rt: RtConfig,
    pub joints: Vec<JointConfig>,
    #[serde(default)]
    pub imus: Vec<ImuConfig>,
}

/// Scheduler parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Control loop frequency [Hz]; the period is `1 / frequency_hz`.
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    /// Minimum spacing of telemetry snapshots [s].
    #[serde(default = "default_telemetry_interval_s")]
    pub telemetry_interval_s: f64,
    /// Joints whose positions are included in telemetry.
    #[serde(default = "default_telemetry_joints")]
    pub telemetry_joints: Vec<String>,
    /// Stop after this many cycles (unbounded when absent).
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

fn default_frequency_hz() -> f64 {
    DEFAULT_FREQUENCY_HZ
}
fn default_telemetry_interval_s() -> f64 {
    DEFAULT_TELEMETRY_INTERVAL_S
}
fn default_telemetry_joints() -> Vec<String> {
    vec!["left_hip".to_string(), "right_hip".to_string()]
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            telemetry_interval_s: DEFAULT_TELEMETRY_INTERVAL_S,
            telemetry_joints: default_telemetry_joints(),
            max_cycles: None,
        }
    }
}

impl ControlConfig {
    /// Cycle period [s].
    #[inline]
    pub fn period_s(&self) -> f64 {
        1.0 / self.frequency_hz
    }
}

/// Balance fusion weights. Tunables: neither pair has a validated derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Weight of a hip joint position sample (existing estimate keeps `1 - w`).
    #[serde(default = "default_hip_weight")]
    pub hip_weight: f64,
    /// Weight of an IMU roll sample (existing estimate keeps `1 - w`).
    #[serde(default = "default_imu_weight")]
    pub imu_weight: f64,
    /// Joint names containing this substring feed the balance estimate.
    #[serde(default = "default_hip_pattern")]
    pub hip_pattern: String,
}

fn default_hip_weight() -> f64 {
    DEFAULT_HIP_WEIGHT
}
fn default_imu_weight() -> f64 {
    DEFAULT_IMU_WEIGHT
}
fn default_hip_pattern() -> String {
    "hip".to_string()
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            hip_weight: DEFAULT_HIP_WEIGHT,
            imu_weight: DEFAULT_IMU_WEIGHT,
            hip_pattern: default_hip_pattern(),
        }
    }
}

/// Sensor simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Scale of the clock-driven drive terms (0 = no simulated disturbance).
    #[serde(default = "default_excitation")]
    pub excitation: f64,
    /// Phase increment of the shared noise sequence [rad].
    #[serde(default = "default_noise_phase_step")]
    pub noise_phase_step: f64,
    /// IMU orientation integration step [s].
    #[serde(default = "default_imu_integration_step_s")]
    pub imu_integration_step_s: f64,
}

fn default_excitation() -> f64 {
    1.0
}
fn default_noise_phase_step() -> f64 {
    DEFAULT_NOISE_PHASE_STEP
}
fn default_imu_integration_step_s() -> f64 {
    DEFAULT_IMU_INTEGRATION_STEP_S
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            excitation: 1.0,
            noise_phase_step: DEFAULT_NOISE_PHASE_STEP,
            imu_integration_step_s: DEFAULT_IMU_INTEGRATION_STEP_S,
        }
    }
}

/// Control thread placement. Applied only by builds with the `rt` feature.
///
/// ```toml
/// [rt]
/// cpu_core = 1
/// priority = 80
/// lock_memory = true
/// stack_prefault_kib = 256
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtConfig {
    /// CPU core the control thread is pinned to.
    #[serde(default = "default_cpu_core")]
    pub cpu_core: usize,
    /// SCHED_FIFO priority.
    #[serde(default = "default_rt_priority")]
    pub priority: i32,
    /// `mlockall(MCL_CURRENT | MCL_FUTURE)` before the loop.
    #[serde(default = "default_lock_memory")]
    pub lock_memory: bool,
    /// Stack touched before the loop [KiB]; 0 skips the step.
    #[serde(default = "default_stack_prefault_kib")]
    pub stack_prefault_kib: usize,
}

fn default_cpu_core() -> usize {
    1
}
fn default_rt_priority() -> i32 {
    DEFAULT_RT_PRIORITY
}
fn default_lock_memory() -> bool {
    true
}
fn default_stack_prefault_kib() -> usize {
    DEFAULT_STACK_PREFAULT_KIB
}

impl Default for RtConfig {
    fn default() -> Self {
        Self {
            cpu_core: default_cpu_core(),
            priority: DEFAULT_RT_PRIORITY,
            lock_memory: true,
            stack_prefault_kib: DEFAULT_STACK_PREFAULT_KIB,
        }
    }
}

impl RtConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(RT_PRIORITY_MIN..=RT_PRIORITY_MAX).contains(&self.priority) {
            return Err(ConfigError::ValidationError(format!(
                "rt priority {} out of range [{RT_PRIORITY_MIN}, {RT_PRIORITY_MAX}]",
                self.priority
            )));
        }
        if self.stack_prefault_kib > MAX_STACK_PREFAULT_KIB {
            return Err(ConfigError::ValidationError(format!(
                "stack_prefault_kib {} exceeds {MAX_STACK_PREFAULT_KIB}",
                self.stack_prefault_kib
            )));
        }
        Ok(())
    }
}

// ─── Joint / IMU Config ─────────────────────────────────────────────

/// Per-joint controller, limit and actuator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub name: String,
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default = "default_ki")]
    pub ki: f64,
    #[serde(default = "default_kd")]
    pub kd: f64,
    /// Lower position bound [rad].
    #[serde(default = "default_min_position")]
    pub min_position: f64,
    /// Upper position bound [rad].
    #[serde(default = "default_max_position")]
    pub max_position: f64,
    /// [rad/s]
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,
    /// [°C]
    #[serde(default = "default_max_temperature")]
    pub max_temperature: f64,
    /// Actuator torque ceiling [N·m].
    #[serde(default = "default_max_torque")]
    pub max_torque: f64,
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f64,
    /// Transmission efficiency in (0, 1].
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    /// Noise amplitude of the joint sensor.
    #[serde(default = "default_sensor_noise")]
    pub sensor_noise: f64,
    /// Actuator electrical settling delay [µs].
    #[serde(default = "default_actuator_settle_us")]
    pub actuator_settle_us: u64,
}

fn default_kp() -> f64 {
    100.0
}
fn default_ki() -> f64 {
    10.0
}
fn default_kd() -> f64 {
    5.0
}
fn default_min_position() -> f64 {
    -PI
}
fn default_max_position() -> f64 {
    PI
}
fn default_max_velocity() -> f64 {
    5.0
}
fn default_max_temperature() -> f64 {
    70.0
}
fn default_max_torque() -> f64 {
    50.0
}
fn default_gear_ratio() -> f64 {
    100.0
}
fn default_efficiency() -> f64 {
    0.9
}
fn default_sensor_noise() -> f64 {
    0.01
}
fn default_actuator_settle_us() -> u64 {
    DEFAULT_ACTUATOR_SETTLE_US
}

impl JointConfig {
    /// A joint with default gains and limits.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kp: default_kp(),
            ki: default_ki(),
            kd: default_kd(),
            min_position: -PI,
            max_position: PI,
            max_velocity: default_max_velocity(),
            max_temperature: default_max_temperature(),
            max_torque: default_max_torque(),
            gear_ratio: default_gear_ratio(),
            efficiency: default_efficiency(),
            sensor_noise: default_sensor_noise(),
            actuator_settle_us: DEFAULT_ACTUATOR_SETTLE_US,
        }
    }

    /// Validate gains and limits. Malformed values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let err = |msg: String| {
            Err(ConfigError::ValidationError(format!(
                "joint '{}': {msg}",
                self.name
            )))
        };

        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "joint name cannot be empty".to_string(),
            ));
        }
        for (gain, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !value.is_finite() || value < 0.0 {
                return err(format!("{gain} must be finite and >= 0, got {value}"));
            }
        }
        if !self.min_position.is_finite() || !self.max_position.is_finite() {
            return err("position bounds must be finite".to_string());
        }
        if self.min_position >= self.max_position {
            return err(format!(
                "min_position {} must be below max_position {}",
                self.min_position, self.max_position
            ));
        }
        for (field, value) in [
            ("max_velocity", self.max_velocity),
            ("max_temperature", self.max_temperature),
            ("max_torque", self.max_torque),
            ("gear_ratio", self.gear_ratio),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return err(format!("{field} must be finite and > 0, got {value}"));
            }
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return err(format!("efficiency {} out of range (0, 1]", self.efficiency));
        }
        if !self.sensor_noise.is_finite() || self.sensor_noise < 0.0 {
            return err(format!("sensor_noise {} must be >= 0", self.sensor_noise));
        }
        Ok(())
    }
}

/// Per-IMU parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuConfig {
    pub name: String,
    #[serde(default = "default_imu_noise")]
    pub noise: f64,
}

fn default_imu_noise() -> f64 {
    0.001
}

impl ImuConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            noise: default_imu_noise(),
        }
    }
}

// ─── Validation ─────────────────────────────────────────────────────

impl RobotConfig {
    /// Six-joint biped with torso and head IMUs at 200 Hz.
    pub fn reference_biped() -> Self {
        let joints = [
            "left_hip",
            "left_knee",
            "left_ankle",
            "right_hip",
            "right_knee",
            "right_ankle",
        ]
        .into_iter()
        .map(JointConfig::named)
        .collect();

        Self {
            shared: SharedConfig::default(),
            control: ControlConfig::default(),
            fusion: FusionConfig::default(),
            simulation: SimulationConfig::default(),
            rt: RtConfig::default(),
            joints,
            imus: vec![ImuConfig::named("torso_imu"), ImuConfig::named("head_imu")],
        }
    }

    /// Validate every section. Called once before controllers are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let c = &self.control;
        if !(FREQUENCY_HZ_MIN..=FREQUENCY_HZ_MAX).contains(&c.frequency_hz) {
            return Err(ConfigError::ValidationError(format!(
                "frequency_hz {} out of range [{FREQUENCY_HZ_MIN}, {FREQUENCY_HZ_MAX}]",
                c.frequency_hz
            )));
        }
        if !(c.telemetry_interval_s > 0.0 && c.telemetry_interval_s <= TELEMETRY_INTERVAL_S_MAX) {
            return Err(ConfigError::ValidationError(format!(
                "telemetry_interval_s {} out of range (0, {TELEMETRY_INTERVAL_S_MAX}]",
                c.telemetry_interval_s
            )));
        }
        if c.telemetry_joints.len() > MAX_TELEMETRY_JOINTS {
            return Err(ConfigError::ValidationError(format!(
                "at most {MAX_TELEMETRY_JOINTS} telemetry joints, got {}",
                c.telemetry_joints.len()
            )));
        }

        self.rt.validate()?;

        let f = &self.fusion;
        for (field, w) in [("hip_weight", f.hip_weight), ("imu_weight", f.imu_weight)] {
            if !(0.0..=1.0).contains(&w) {
                return Err(ConfigError::ValidationError(format!(
                    "{field} {w} out of range [0, 1]"
                )));
            }
        }

        let s = &self.simulation;
        if !s.excitation.is_finite() || s.excitation < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "excitation {} must be >= 0",
                s.excitation
            )));
        }
        if !s.imu_integration_step_s.is_finite() || s.imu_integration_step_s <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "imu_integration_step_s {} must be > 0",
                s.imu_integration_step_s
            )));
        }
        if !s.noise_phase_step.is_finite() {
            return Err(ConfigError::ValidationError(
                "noise_phase_step must be finite".to_string(),
            ));
        }

        if self.joints.is_empty() || self.joints.len() > MAX_JOINTS {
            return Err(ConfigError::ValidationError(format!(
                "joint count {} out of range [1, {MAX_JOINTS}]",
                self.joints.len()
            )));
        }
        if self.imus.len() > MAX_IMUS {
            return Err(ConfigError::ValidationError(format!(
                "imu count {} exceeds {MAX_IMUS}",
                self.imus.len()
            )));
        }

        let mut names = HashSet::new();
        for joint in &self.joints {
            joint.validate()?;
            if !names.insert(joint.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate sensor/joint name '{}'",
                    joint.name
                )));
            }
        }
        for imu in &self.imus {
            if imu.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "imu name cannot be empty".to_string(),
                ));
            }
            if !imu.noise.is_finite() || imu.noise < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "imu '{}': noise {} must be >= 0",
                    imu.name, imu.noise
                )));
            }
            if !names.insert(imu.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate sensor/joint name '{}'",
                    imu.name
                )));
            }
        }

        for selected in &c.telemetry_joints {
            if !self.joints.iter().any(|j| &j.name == selected) {
                return Err(ConfigError::ValidationError(format!(
                    "telemetry joint '{selected}' is not configured"
                )));
            }
        }
        Ok(())
    }
}
