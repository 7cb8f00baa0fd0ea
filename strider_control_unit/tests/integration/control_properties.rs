//! Controller, actuator, IMU and fusion properties through the public API.

use std::sync::Arc;
use std::time::Duration;

use strider_common::consts::QUATERNION_NORM_TOLERANCE;
use strider_common::robot::config::{FusionConfig, JointConfig};
use strider_common::robot::imu::{ImuSample, Quaternion};
use strider_common::robot::state::JointState;
use strider_control_unit::actuator::ActuatorModel;
use strider_control_unit::clock::ManualClock;
use strider_control_unit::control::joint_loop::JointControlLoop;
use strider_control_unit::error::ControlError;
use strider_control_unit::fusion::SensorFusionEstimator;
use strider_control_unit::sensor::{ImuSensorSim, NoiseSequence, Sensor};

const DT: f64 = 0.01;

fn joint(name: &str) -> JointControlLoop {
    let mut config = JointConfig::named(name);
    config.actuator_settle_us = 0;
    let c = JointControlLoop::new(config, ManualClock::shared()).unwrap();
    c.enable();
    c
}

fn measured(position: f64, velocity: f64, temperature: f64) -> JointState {
    JointState {
        position,
        velocity,
        temperature,
        ..JointState::default()
    }
}

// ── Actuator ────────────────────────────────────────────────────────

#[test]
fn actuator_torque_stays_within_limit_for_any_command() {
    let clock = ManualClock::shared();
    let a = ActuatorModel::new("a", 50.0, 100.0, 0.9, Duration::ZERO, clock);
    let mut cmd = -1.0e6;
    while cmd <= 1.0e6 {
        let applied = a.set_torque(cmd);
        assert!((-50.0..=50.0).contains(&applied));
        assert_eq!(a.set_torque(applied), applied);
        cmd += 1234.5;
    }
}

// ── IMU ─────────────────────────────────────────────────────────────

#[test]
fn imu_quaternion_unit_after_every_update() {
    let clock = ManualClock::shared();
    let imu = ImuSensorSim::new(
        "torso_imu",
        0.02,
        3.0,
        0.01,
        NoiseSequence::shared(0.1),
        clock.clone(),
    );
    for _ in 0..2_000 {
        clock.advance(Duration::from_millis(5));
        let q = imu.read().orientation;
        assert!((q.norm() - 1.0).abs() < QUATERNION_NORM_TOLERANCE);
    }
}

// ── Joint control loop ──────────────────────────────────────────────

#[test]
fn zero_error_from_rest_yields_zero_torque() {
    let c = joint("left_hip");
    assert_eq!(c.set_target_position(0.0), 0.0);
    c.observe(measured(0.0, 0.0, 25.0));
    let out = c.update(DT).unwrap().unwrap();
    assert_eq!(out.commanded_torque, 0.0);
    assert_eq!(c.actuator().torque(), 0.0);
}

#[test]
fn velocity_interlock_zeroes_any_pid_output() {
    let c = joint("right_knee");
    for (target, velocity) in [(3.0, 5.5), (-3.0, -8.0), (0.5, 1.0e3)] {
        c.set_target_position(target);
        c.observe(measured(0.0, velocity, 25.0));
        let out = c.update(DT).unwrap().unwrap();
        assert_eq!(out.commanded_torque, 0.0);
        assert_eq!(out.applied_torque, 0.0);
    }
}

#[test]
fn thermal_derate_is_exactly_half() {
    let c = joint("left_ankle");
    for temperature in [63.01, 65.0, 69.9] {
        c.set_target_position(0.02);
        c.observe(measured(0.0, 0.0, temperature));
        let out = c.update(DT).unwrap().unwrap();
        assert!(!out.velocity_interlock);
        assert_eq!(out.commanded_torque, 0.5 * out.raw_torque);
    }
}

#[test]
fn zero_dt_rejected() {
    let c = joint("left_hip");
    assert_eq!(c.update(0.0), Err(ControlError::InvalidTimestep(0.0)));
}

// ── Fusion ──────────────────────────────────────────────────────────

#[test]
fn fusion_weights_follow_call_order() {
    let f = Arc::new(SensorFusionEstimator::new(FusionConfig::default()));
    f.update_joint_state("right_hip", measured(0.5, 0.0, 25.0));
    assert!((f.balance_estimate() - 0.15).abs() < 1e-12);

    let sample = ImuSample {
        orientation: Quaternion::from_roll(0.1),
        ..ImuSample::default()
    };
    f.update_imu_sample("torso_imu", sample);
    assert!((f.balance_estimate() - 0.14).abs() < 1e-12);
}
