//! Per-joint control loop: PID position control with velocity interlock,
//! thermal derating and actuator torque clamping.
//!
//! ## Step (`update(dt)`)
//! 1. `error = target − measured_position`
//! 2. PID step ([`pid_compute`])
//! 3. Velocity interlock: `|velocity| > max_velocity` → torque = 0
//! 4. Thermal derate: `temperature > 0.9·max_temperature` → torque × 0.5
//! 5. Actuator clamps to its own ceiling and applies
//!
//! The measured state is pushed in by the scheduler via [`JointControlLoop::observe`]
//! before each step; the applied torque is written back into it.

use std::sync::Mutex;
use std::time::Duration;

use strider_common::config::ConfigError;
use strider_common::consts::{THERMAL_DERATE_FACTOR, THERMAL_DERATE_THRESHOLD};
use strider_common::robot::config::JointConfig;
use strider_common::robot::state::{JointFault, JointState};
use tracing::{debug, info, warn};

use super::pid::{PidGains, PidState, pid_compute};
use crate::actuator::ActuatorModel;
use crate::clock::SharedClock;
use crate::error::ControlError;
use crate::sync::lock;

/// Mutable controller state, owned by one [`JointControlLoop`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerRuntime {
    /// [rad], always within the joint bounds.
    pub target_position: f64,
    /// [rad/s], carried for the host; not used by the position loop.
    pub target_velocity: f64,
    pub pid: PidState,
    pub enabled: bool,
}

/// Result of one control step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    /// Tracking error [rad].
    pub error: f64,
    /// Unshaped PID output [N·m].
    pub raw_torque: f64,
    /// Torque after interlock and derating [N·m].
    pub commanded_torque: f64,
    /// Torque the actuator applied after its own clamp [N·m].
    pub applied_torque: f64,
    pub velocity_interlock: bool,
    pub thermal_derate: bool,
}

#[derive(Debug)]
pub struct JointControlLoop {
    config: JointConfig,
    gains: PidGains,
    actuator: ActuatorModel,
    runtime: Mutex<ControllerRuntime>,
    state: Mutex<JointState>,
}

impl JointControlLoop {
    /// Build a disabled controller. Malformed gains or bounds fail here.
    pub fn new(config: JointConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        config.validate()?;

        let actuator = ActuatorModel::new(
            &format!("{}_actuator", config.name),
            config.max_torque,
            config.gear_ratio,
            config.efficiency,
            Duration::from_micros(config.actuator_settle_us),
            clock.clone(),
        );
        let gains = PidGains {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
        };
        let runtime = ControllerRuntime {
            target_position: 0.0_f64.clamp(config.min_position, config.max_position),
            ..ControllerRuntime::default()
        };

        Ok(Self {
            gains,
            actuator,
            runtime: Mutex::new(runtime),
            state: Mutex::new(JointState::at_rest(clock.now())),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &JointConfig {
        &self.config
    }

    pub fn actuator(&self) -> &ActuatorModel {
        &self.actuator
    }

    /// Enable the controller. Idempotent.
    pub fn enable(&self) {
        let mut rt = lock(&self.runtime);
        if !rt.enabled {
            rt.enabled = true;
            info!("Joint controller '{}' initialized", self.config.name);
        }
    }

    /// Disable the controller: zero the actuator and clear PID memory.
    pub fn disable(&self) {
        {
            let mut rt = lock(&self.runtime);
            rt.enabled = false;
            rt.pid.reset();
        }
        let applied = self.actuator.set_torque(0.0);
        lock(&self.state).torque = applied;
        debug!("Joint controller '{}' disabled", self.config.name);
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.runtime).enabled
    }

    /// Clamp `position` into `[min_position, max_position]` and store it as
    /// the target. Returns the stored target. NaN is ignored.
    pub fn set_target_position(&self, position: f64) -> f64 {
        let mut rt = lock(&self.runtime);
        if position.is_nan() {
            warn!("Joint '{}': ignoring NaN target", self.config.name);
            return rt.target_position;
        }
        let clamped = position.clamp(self.config.min_position, self.config.max_position);
        if clamped != position {
            debug!(
                "Joint '{}': target {position:.4} clamped to {clamped:.4}",
                self.config.name
            );
        }
        rt.target_position = clamped;
        clamped
    }

    pub fn set_target_velocity(&self, velocity: f64) {
        if velocity.is_finite() {
            lock(&self.runtime).target_velocity = velocity;
        }
    }

    pub fn target_position(&self) -> f64 {
        lock(&self.runtime).target_position
    }

    /// Snapshot of the controller runtime.
    pub fn runtime(&self) -> ControllerRuntime {
        *lock(&self.runtime)
    }

    /// Ingest the measured joint state for the next step. The timestamp
    /// never moves backwards.
    pub fn observe(&self, measured: JointState) {
        let mut state = lock(&self.state);
        let timestamp = measured.timestamp.max(state.timestamp);
        *state = JointState {
            timestamp,
            ..measured
        };
    }

    /// Latest measured state (with the applied torque of the last step).
    pub fn state(&self) -> JointState {
        *lock(&self.state)
    }

    /// Run one control step.
    ///
    /// Returns `Ok(None)` when disabled (no-op) and
    /// `Err(ControlError::InvalidTimestep)` for `dt <= 0` or non-finite `dt`,
    /// leaving all state untouched.
    pub fn update(&self, dt: f64) -> Result<Option<ControlOutput>, ControlError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(ControlError::InvalidTimestep(dt));
        }

        let measured = self.state();
        let (error, raw_torque) = {
            let mut rt = lock(&self.runtime);
            if !rt.enabled {
                return Ok(None);
            }
            let error = rt.target_position - measured.position;
            (error, pid_compute(&mut rt.pid, &self.gains, error, dt))
        };

        let (commanded_torque, velocity_interlock, thermal_derate) =
            shape_torque(raw_torque, &measured, &self.config);
        let applied_torque = self.actuator.set_torque(commanded_torque);
        lock(&self.state).torque = applied_torque;

        Ok(Some(ControlOutput {
            error,
            raw_torque,
            commanded_torque,
            applied_torque,
            velocity_interlock,
            thermal_derate,
        }))
    }

    /// Limit violations of the current measured state.
    pub fn faults(&self) -> JointFault {
        joint_faults(&self.state(), &self.config)
    }

    /// Pure safety predicate: temperature below max, |velocity| below max,
    /// position within bounds.
    pub fn is_safe(&self) -> bool {
        self.faults().is_empty()
    }
}

/// Apply the velocity interlock and thermal derating to a raw PID torque.
///
/// Returns `(torque, interlock_engaged, derated)`.
#[inline]
pub fn shape_torque(raw: f64, measured: &JointState, config: &JointConfig) -> (f64, bool, bool) {
    let mut torque = raw;

    let interlock = measured.velocity.abs() > config.max_velocity;
    if interlock {
        torque = 0.0;
    }

    let derate = measured.temperature > config.max_temperature * THERMAL_DERATE_THRESHOLD;
    if derate {
        torque *= THERMAL_DERATE_FACTOR;
    }

    (torque, interlock, derate)
}

/// Evaluate joint limits. NaN readings count as violations.
pub fn joint_faults(state: &JointState, config: &JointConfig) -> JointFault {
    let mut faults = JointFault::empty();
    if !(state.temperature < config.max_temperature) {
        faults |= JointFault::OVER_TEMPERATURE;
    }
    if !(state.velocity.abs() < config.max_velocity) {
        faults |= JointFault::OVER_VELOCITY;
    }
    if !(state.position >= config.min_position && state.position <= config.max_position) {
        faults |= JointFault::OUT_OF_BOUNDS;
    }
    faults
}

// ─── Tests ──────────────────────────────────────────────────────────
