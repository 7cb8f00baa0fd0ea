//! Safety latch behavior with real controllers and sensors.

use std::sync::Arc;

use strider_common::robot::config::JointConfig;
use strider_common::robot::state::{JointFault, JointState, SafetyState, TripCause};
use strider_control_unit::clock::ManualClock;
use strider_control_unit::control::joint_loop::JointControlLoop;
use strider_control_unit::safety::{SafetyCheck, SafetyMonitor};
use strider_control_unit::sensor::{ImuSensorSim, NoiseSequence};

fn controller(name: &str) -> Arc<JointControlLoop> {
    let mut config = JointConfig::named(name);
    config.actuator_settle_us = 0;
    Arc::new(JointControlLoop::new(config, ManualClock::shared()).unwrap())
}

fn observe(c: &JointControlLoop, position: f64, velocity: f64, temperature: f64) {
    c.observe(JointState {
        position,
        velocity,
        temperature,
        ..JointState::default()
    });
}

#[test]
fn latch_holds_after_state_returns_to_nominal() {
    let knee = controller("left_knee");
    let mut monitor = SafetyMonitor::new();
    monitor.add_controller(controller("left_hip"));
    monitor.add_controller(knee.clone());

    assert!(monitor.check_safety().is_safe());

    observe(&knee, 0.0, 0.0, 71.0);
    assert!(!monitor.check_safety().is_safe());

    observe(&knee, 0.0, 0.0, 30.0);
    assert!(knee.is_safe());
    for _ in 0..100 {
        assert!(!monitor.check_safety().is_safe());
    }
    assert_eq!(monitor.state(), SafetyState::Tripped);
    assert_eq!(
        monitor.trip_cause(),
        Some(TripCause::JointFault {
            joint: "left_knee".to_string(),
            faults: JointFault::OVER_TEMPERATURE,
        })
    );
}

#[test]
fn combined_faults_are_reported_together() {
    let hip = controller("right_hip");
    let mut monitor = SafetyMonitor::new();
    monitor.add_controller(hip.clone());

    observe(&hip, -3.5, 6.0, 25.0);
    match monitor.check_safety() {
        SafetyCheck::Tripped(TripCause::JointFault { faults, .. }) => {
            assert_eq!(faults, JointFault::OUT_OF_BOUNDS | JointFault::OVER_VELOCITY);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn imu_disconnection_is_transient() {
    let imu = Arc::new(ImuSensorSim::new(
        "head_imu",
        0.0,
        0.0,
        0.01,
        NoiseSequence::shared(0.1),
        ManualClock::shared(),
    ));
    let mut monitor = SafetyMonitor::new();
    monitor.add_controller(controller("left_hip"));
    monitor.add_sensor(imu.clone());

    imu.set_connected(false);
    for _ in 0..3 {
        assert_eq!(
            monitor.check_safety(),
            SafetyCheck::SensorDisconnected("head_imu".to_string())
        );
    }
    assert_eq!(monitor.state(), SafetyState::Normal);

    imu.set_connected(true);
    assert_eq!(monitor.check_safety(), SafetyCheck::Safe);
}

#[test]
fn emergency_stop_from_another_thread() {
    let monitor = Arc::new(SafetyMonitor::new());
    let remote = monitor.clone();
    std::thread::spawn(move || remote.trigger_emergency_stop())
        .join()
        .unwrap();
    assert_eq!(
        monitor.check_safety(),
        SafetyCheck::Tripped(TripCause::EmergencyStop)
    );
}
