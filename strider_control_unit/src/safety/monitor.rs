//! Per-cycle safety evaluation.
//!
//! ## Check order
//! 1. Latch already tripped → unsafe.
//! 2. Joint controllers in registration order; the first failing
//!    [`JointControlLoop::is_safe`] trips the latch and ends the check.
//! 3. Sensor connectivity; a disconnected sensor is unsafe for this cycle
//!    only and does not trip the latch.
//! 4. Safe.
//!
//! Joint-limit violations latch and sensor disconnection does not. This
//! asymmetry is policy.

use std::sync::{Arc, Mutex};

use strider_common::robot::state::{SafetyState, TripCause};
use strider_common::robot::telemetry::SafetyStatus;
use tracing::{error, info, warn};

use super::machine::{SafetyStateMachine, SafetyTransition};
use crate::control::joint_loop::JointControlLoop;
use crate::sensor::SensorHandle;
use crate::sync::lock;

/// Outcome of one [`SafetyMonitor::check_safety`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyCheck {
    Safe,
    /// Latch is closed (this cycle or earlier).
    Tripped(TripCause),
    /// Named sensor is not delivering data. Non-latching.
    SensorDisconnected(String),
}

impl SafetyCheck {
    #[inline]
    pub const fn is_safe(&self) -> bool {
        matches!(self, Self::Safe)
    }

    #[inline]
    pub const fn status(&self) -> SafetyStatus {
        SafetyStatus::from_safe(self.is_safe())
    }
}

#[derive(Debug, Default)]
pub struct SafetyMonitor {
    controllers: Vec<Arc<JointControlLoop>>,
    sensors: Vec<SensorHandle>,
    machine: Mutex<SafetyStateMachine>,
    /// Sensor reported disconnected by the previous check, for edge logging.
    last_disconnected: Mutex<Option<String>>,
}

impl SafetyMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_controller(&mut self, controller: Arc<JointControlLoop>) {
        self.controllers.push(controller);
    }

    pub fn add_sensor(&mut self, sensor: impl Into<SensorHandle>) {
        self.sensors.push(sensor.into());
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Evaluate safety once. See the module docs for the order.
    pub fn check_safety(&self) -> SafetyCheck {
        if let Some(cause) = self.trip_cause() {
            return SafetyCheck::Tripped(cause);
        }

        for controller in &self.controllers {
            let faults = controller.faults();
            if !faults.is_empty() {
                let cause = TripCause::JointFault {
                    joint: controller.name().to_string(),
                    faults,
                };
                self.trip(cause.clone());
                return SafetyCheck::Tripped(cause);
            }
        }

        let disconnected = self.sensors.iter().find(|s| !s.is_connected());
        let mut last = lock(&self.last_disconnected);
        match disconnected {
            Some(sensor) => {
                if last.as_deref() != Some(sensor.name()) {
                    warn!("SAFETY: {} sensor '{}' disconnected", sensor.kind(), sensor.name());
                    *last = Some(sensor.name().to_string());
                }
                SafetyCheck::SensorDisconnected(sensor.name().to_string())
            }
            None => {
                if let Some(name) = last.take() {
                    info!("SAFETY: sensor '{name}' reconnected");
                }
                SafetyCheck::Safe
            }
        }
    }

    /// Unconditionally close the latch.
    pub fn trigger_emergency_stop(&self) {
        self.trip(TripCause::EmergencyStop);
    }

    pub fn state(&self) -> SafetyState {
        lock(&self.machine).state()
    }

    pub fn is_tripped(&self) -> bool {
        lock(&self.machine).is_tripped()
    }

    pub fn trip_cause(&self) -> Option<TripCause> {
        lock(&self.machine).cause().cloned()
    }

    fn trip(&self, cause: TripCause) {
        let message = cause.to_string();
        if lock(&self.machine).trip(cause) == SafetyTransition::Tripped {
            error!("SAFETY: emergency stop latched: {message}");
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sensor::{JointSensorSim, NoiseSequence};
    use strider_common::robot::config::JointConfig;
    use strider_common::robot::state::{JointFault, JointState};

    fn controller(name: &str) -> Arc<JointControlLoop> {
        let mut config = JointConfig::named(name);
        config.actuator_settle_us = 0;
        Arc::new(JointControlLoop::new(config, ManualClock::shared()).unwrap())
    }

    fn with_position(c: &JointControlLoop, position: f64) {
        c.observe(JointState {
            position,
            ..JointState::default()
        });
    }

    fn sensor(name: &str) -> Arc<JointSensorSim> {
        Arc::new(JointSensorSim::new(
            name,
            0.0,
            0.0,
            NoiseSequence::shared(0.1),
            ManualClock::shared(),
        ))
    }

    #[test]
    fn nominal_system_is_safe() {
        let mut m = SafetyMonitor::new();
        m.add_controller(controller("left_hip"));
        m.add_sensor(sensor("left_hip"));
        assert_eq!(m.check_safety(), SafetyCheck::Safe);
        assert_eq!(m.state(), SafetyState::Normal);
    }

    #[test]
    fn joint_violation_latches() {
        let hip = controller("left_hip");
        let mut m = SafetyMonitor::new();
        m.add_controller(hip.clone());

        with_position(&hip, 4.0);
        let first = m.check_safety();
        assert!(!first.is_safe());
        assert_eq!(first.status(), SafetyStatus::Emergency);
        assert_eq!(first, SafetyCheck::Tripped(m.trip_cause().unwrap()));

        with_position(&hip, 0.0);
        assert!(hip.is_safe());
        for _ in 0..10 {
            assert!(matches!(m.check_safety(), SafetyCheck::Tripped(_)));
        }
        assert_eq!(
            m.trip_cause(),
            Some(TripCause::JointFault {
                joint: "left_hip".to_string(),
                faults: JointFault::OUT_OF_BOUNDS,
            })
        );
    }

    #[test]
    fn first_failing_controller_is_reported() {
        let a = controller("left_knee");
        let b = controller("right_knee");
        let mut m = SafetyMonitor::new();
        m.add_controller(a.clone());
        m.add_controller(b.clone());

        with_position(&a, -4.0);
        with_position(&b, 4.0);
        match m.check_safety() {
            SafetyCheck::Tripped(TripCause::JointFault { joint, .. }) => {
                assert_eq!(joint, "left_knee")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sensor_disconnection_does_not_latch() {
        let s = sensor("torso_joint");
        let mut m = SafetyMonitor::new();
        m.add_controller(controller("left_hip"));
        m.add_sensor(s.clone());

        s.set_connected(false);
        assert_eq!(
            m.check_safety(),
            SafetyCheck::SensorDisconnected("torso_joint".to_string())
        );
        assert_eq!(m.state(), SafetyState::Normal);

        s.set_connected(true);
        assert_eq!(m.check_safety(), SafetyCheck::Safe);
    }

    #[test]
    fn joint_fault_takes_precedence_over_disconnection() {
        let hip = controller("left_hip");
        let s = sensor("left_hip");
        let mut m = SafetyMonitor::new();
        m.add_controller(hip.clone());
        m.add_sensor(s.clone());

        s.set_connected(false);
        with_position(&hip, 3.5);
        assert!(matches!(m.check_safety(), SafetyCheck::Tripped(_)));
    }

    #[test]
    fn emergency_stop_trips_unconditionally() {
        let m = SafetyMonitor::new();
        m.trigger_emergency_stop();
        assert!(m.is_tripped());
        assert_eq!(
            m.check_safety(),
            SafetyCheck::Tripped(TripCause::EmergencyStop)
        );
    }
}
