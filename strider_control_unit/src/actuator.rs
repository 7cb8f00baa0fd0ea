//! Actuator model: torque clamp plus electrical settling delay.
//!
//! The settle wait goes through the shared clock, so in simulated time it
//! advances the clock instead of blocking.

use std::sync::Mutex;
use std::time::Duration;

use tracing::trace;

use crate::clock::SharedClock;
use crate::sync::lock;

#[derive(Debug)]
pub struct ActuatorModel {
    name: String,
    /// Symmetric torque ceiling [N·m].
    max_torque: f64,
    gear_ratio: f64,
    efficiency: f64,
    settle: Duration,
    clock: SharedClock,
    torque: Mutex<f64>,
}

impl ActuatorModel {
    /// `max_torque` must be positive; the caller validates configuration.
    pub fn new(
        name: &str,
        max_torque: f64,
        gear_ratio: f64,
        efficiency: f64,
        settle: Duration,
        clock: SharedClock,
    ) -> Self {
        Self {
            name: name.to_string(),
            max_torque: max_torque.abs(),
            gear_ratio,
            efficiency,
            settle,
            clock,
            torque: Mutex::new(0.0),
        }
    }

    /// Clamp `command` to `[-max_torque, +max_torque]`, store it, wait the
    /// settling delay and return the applied torque.
    ///
    /// Non-finite commands are applied as zero.
    pub fn set_torque(&self, command: f64) -> f64 {
        let applied = clamp_torque(command, self.max_torque);
        *lock(&self.torque) = applied;
        self.clock.sleep(self.settle);
        trace!("{}: cmd={command:.3} applied={applied:.3}", self.name);
        applied
    }

    /// Last applied motor torque [N·m].
    pub fn torque(&self) -> f64 {
        *lock(&self.torque)
    }

    /// Joint-side torque after the transmission: `torque · ratio · efficiency`.
    pub fn output_torque(&self) -> f64 {
        self.torque() * self.gear_ratio * self.efficiency
    }

    pub fn max_torque(&self) -> f64 {
        self.max_torque
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Symmetric clamp; NaN and ±∞ map to a safe value (0 and ±limit).
#[inline]
pub fn clamp_torque(command: f64, limit: f64) -> f64 {
    if command.is_nan() {
        0.0
    } else {
        command.clamp(-limit, limit)
    }
}
