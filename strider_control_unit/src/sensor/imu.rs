//! IMU simulator: orientation, angular velocity, linear acceleration.
//!
//! Angular velocity about x/y and vertical acceleration follow the clock:
//! `ωx = 0.1·sin(t)`, `ωy = 0.05·sin(1.5t)`, `az = g + 0.1·cos(0.5t)`
//! (drive terms scaled by `excitation`, then noised). Orientation integrates
//! only the x/y quaternion components with a fixed step and is renormalized
//! after every read; z/w are carried but not integrated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use strider_common::consts::GRAVITY;
use strider_common::robot::imu::ImuSample;
use tracing::{trace, warn};

use super::{NoiseSequence, Sensor};
use crate::clock::SharedClock;
use crate::sync::lock;

const ROLL_RATE_DRIVE: f64 = 0.1;
const PITCH_RATE_DRIVE: f64 = 0.05;
const VERTICAL_ACCEL_DRIVE: f64 = 0.1;

#[derive(Debug)]
pub struct ImuSensorSim {
    name: String,
    amplitude: f64,
    excitation: f64,
    /// Orientation integration step [s].
    integration_step: f64,
    connected: AtomicBool,
    noise: Arc<NoiseSequence>,
    clock: SharedClock,
    sample: Mutex<ImuSample>,
}

impl ImuSensorSim {
    pub fn new(
        name: &str,
        amplitude: f64,
        excitation: f64,
        integration_step: f64,
        noise: Arc<NoiseSequence>,
        clock: SharedClock,
    ) -> Self {
        let sample = ImuSample {
            timestamp: clock.now(),
            ..ImuSample::default()
        };
        Self {
            name: name.to_string(),
            amplitude,
            excitation,
            integration_step,
            connected: AtomicBool::new(true),
            noise,
            clock,
            sample: Mutex::new(sample),
        }
    }

    /// Simulate a bus fault (`false`) or reconnection (`true`).
    pub fn set_connected(&self, connected: bool) {
        if !connected {
            warn!("IMU '{}' disconnected", self.name);
        }
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Sensor for ImuSensorSim {
    type Sample = ImuSample;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn read(&self) -> ImuSample {
        let now = self.clock.now();
        let t = now.as_secs_f64();
        let e = self.excitation;
        let amp = self.amplitude;

        let mut s = lock(&self.sample);
        s.angular_velocity[0] = self.noise.apply(e * ROLL_RATE_DRIVE * t.sin(), amp);
        s.angular_velocity[1] = self.noise.apply(e * PITCH_RATE_DRIVE * (1.5 * t).sin(), amp);
        s.linear_acceleration[2] = self
            .noise
            .apply(GRAVITY + e * VERTICAL_ACCEL_DRIVE * (0.5 * t).cos(), amp);

        let half_step = 0.5 * self.integration_step;
        s.orientation.x += s.angular_velocity[0] * half_step;
        s.orientation.y += s.angular_velocity[1] * half_step;
        s.orientation.normalize();
        s.timestamp = now.max(s.timestamp);

        trace!(
            "{}: roll={:.5} wx={:.4} wy={:.4} az={:.3}",
            self.name,
            s.orientation.roll(),
            s.angular_velocity[0],
            s.angular_velocity[1],
            s.linear_acceleration[2]
        );
        *s
    }

    fn latest(&self) -> ImuSample {
        *lock(&self.sample)
    }
}
