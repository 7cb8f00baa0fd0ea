//! Position PID with rectangular integration and raw error derivative.
//!
//! `integral += e·dt`, `derivative = (e − e_prev)/dt`,
//! `u = kp·e + ki·integral + kd·derivative`. Saturation is left to the
//! actuator stage.

/// Internal state of the PID controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    /// Accumulated error integral [rad·s].
    integral: f64,
    /// Error of the previous step [rad].
    prev_error: f64,
}

impl PidState {
    /// Reset integral and previous error to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    #[inline]
    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }
}

/// PID gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Compute one PID step.
///
/// # Arguments
/// - `state`: integral accumulator and previous error, updated in place.
/// - `error`: target − measured position [rad].
/// - `dt`: step [s].
///
/// # Returns
/// Unsaturated torque [N·m]. A non-positive or non-finite `dt` returns 0
/// and leaves `state` untouched.
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    if !(dt > 0.0 && dt.is_finite()) {
        return 0.0;
    }

    state.integral += error * dt;
    let derivative = (error - state.prev_error) / dt;
    state.prev_error = error;

    gains.kp * error + gains.ki * state.integral + gains.kd * derivative
}

// ─── Tests ──────────────────────────────────────────────────────────
