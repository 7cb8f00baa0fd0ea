//! Joint sensor simulator: position, velocity, torque and temperature.
//!
//! Each read advances the state by one sample. The clock time `t` drives
//! the simulated motion:
//!
//! | Quantity    | Increment per read                |
//! |-------------|-----------------------------------|
//! | position    | `excitation · 0.01 · sin(t)`      |
//! | velocity    | `excitation · 0.001 · cos(t)`     |
//! | torque      | `excitation · 0.05 · sin(2t)`     |
//! | temperature | `0.0001 · |torque|` (self-heating) |
//!
//! and every quantity then passes through the shared [`NoiseSequence`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use strider_common::robot::state::JointState;
use tracing::{trace, warn};

use super::{NoiseSequence, Sensor};
use crate::clock::SharedClock;
use crate::sync::lock;

const POSITION_DRIVE: f64 = 0.01;
const VELOCITY_DRIVE: f64 = 0.001;
const TORQUE_DRIVE: f64 = 0.05;
const HEATING_PER_NM: f64 = 0.0001;

#[derive(Debug)]
pub struct JointSensorSim {
    name: String,
    amplitude: f64,
    excitation: f64,
    connected: AtomicBool,
    noise: Arc<NoiseSequence>,
    clock: SharedClock,
    state: Mutex<JointState>,
}

impl JointSensorSim {
    /// New sensor at rest, ambient temperature.
    ///
    /// `excitation` scales the clock-driven drive terms; 0 disables them.
    pub fn new(
        name: &str,
        amplitude: f64,
        excitation: f64,
        noise: Arc<NoiseSequence>,
        clock: SharedClock,
    ) -> Self {
        let state = JointState::at_rest(clock.now());
        Self {
            name: name.to_string(),
            amplitude,
            excitation,
            connected: AtomicBool::new(true),
            noise,
            clock,
            state: Mutex::new(state),
        }
    }

    /// Feed the torque the actuator actually applied back into the simulation.
    pub fn apply_torque(&self, torque: f64) {
        lock(&self.state).torque = torque;
    }

    /// Overwrite the simulated state. The timestamp never moves backwards.
    pub fn set_state(&self, state: JointState) {
        let mut current = lock(&self.state);
        let timestamp = state.timestamp.max(current.timestamp);
        *current = JointState { timestamp, ..state };
    }

    /// Simulate a cable fault (`false`) or reconnection (`true`).
    pub fn set_connected(&self, connected: bool) {
        if !connected {
            warn!("Joint sensor '{}' disconnected", self.name);
        }
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Sensor for JointSensorSim {
    type Sample = JointState;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn read(&self) -> JointState {
        let now = self.clock.now();
        let t = now.as_secs_f64();
        let e = self.excitation;
        let amp = self.amplitude;

        let mut s = lock(&self.state);
        s.position = self.noise.apply(s.position + e * POSITION_DRIVE * t.sin(), amp);
        s.velocity = self.noise.apply(s.velocity + e * VELOCITY_DRIVE * t.cos(), amp);
        s.torque = self.noise.apply(s.torque + e * TORQUE_DRIVE * (2.0 * t).sin(), amp);
        s.temperature = self
            .noise
            .apply(s.temperature + HEATING_PER_NM * s.torque.abs(), amp);
        s.timestamp = now.max(s.timestamp);

        trace!(
            "{}: pos={:.4} vel={:.4} tq={:.3} temp={:.2}",
            self.name, s.position, s.velocity, s.torque, s.temperature
        );
        *s
    }

    fn latest(&self) -> JointState {
        *lock(&self.state)
    }
}
