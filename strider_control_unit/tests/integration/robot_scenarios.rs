//! Full-robot runs: six joints, two IMUs, 200 Hz.

use std::time::Duration;

use strider_common::robot::state::{JointFault, SafetyState, TripCause};
use strider_common::robot::telemetry::SafetyStatus;
use strider_control_unit::clock::{Clock, SystemClock};
use strider_control_unit::robot::RobotController;
use strider_control_unit::scheduler::StopReason;

use super::helpers::{RecordingPublisher, quiet_biped, robot_on_manual_clock};

const PERIOD: Duration = Duration::from_millis(5);

#[test]
fn thousand_quiet_cycles_stay_in_bounds_and_safe() {
    let (mut robot, clock, snapshots) = robot_on_manual_clock(quiet_biped());
    for name in ["left_hip", "left_knee", "left_ankle", "right_hip", "right_knee", "right_ankle"] {
        robot.set_target_position(name, 0.0).unwrap();
    }

    for _ in 0..1_000 {
        let report = robot.run_cycle().unwrap();
        assert!(report.safety.is_safe(), "cycle {}: {:?}", report.cycle, report.safety);
        assert!(!report.overrun);
        for name in robot.joint_names() {
            let c = robot.controller(name).unwrap();
            let cfg = c.config();
            let pos = c.state().position;
            assert!(
                (cfg.min_position..=cfg.max_position).contains(&pos),
                "{name} at {pos}"
            );
        }
        clock.sleep(PERIOD.saturating_sub(report.processing));
    }

    assert_eq!(robot.safety_state(), SafetyState::Normal);
    assert_eq!(robot.stats().cycle_count, 1_000);
    assert_eq!(robot.stats().overruns, 0);

    // 1000 × 5 ms = 5 s → one snapshot per second
    let snapshots = snapshots.lock().unwrap();
    assert!((4..=5).contains(&snapshots.len()), "{}", snapshots.len());
    for s in snapshots.iter() {
        assert_eq!(s.status, SafetyStatus::Ok);
        assert!(s.position_of("left_hip").is_some());
        assert!(s.position_of("right_hip").is_some());
    }
}

#[test]
fn paced_run_reaches_cycle_limit_without_overruns() {
    let mut config = quiet_biped();
    config.control.max_cycles = Some(1_000);
    let (mut robot, clock, _) = robot_on_manual_clock(config);

    assert_eq!(robot.run(), Ok(StopReason::CycleLimitReached));
    assert_eq!(robot.stats().cycle_count, 1_000);
    assert_eq!(robot.stats().overruns, 0);
    assert_eq!(robot.safety_state(), SafetyState::Normal);
    assert_eq!(clock.now(), Duration::from_secs(5));
    // 6 joints × 500 µs settle
    assert_eq!(robot.stats().max_processing, Duration::from_millis(3));
}

#[test]
fn unbounded_drift_trips_out_of_bounds_and_halts() {
    let mut config = quiet_biped();
    config.simulation.excitation = 1.0;
    config.control.max_cycles = Some(2_000);
    for joint in &mut config.joints {
        joint.actuator_settle_us = 0;
    }
    let (mut robot, _clock, _) = robot_on_manual_clock(config);

    assert_eq!(robot.run(), Ok(StopReason::SafetyTripped));
    assert!(robot.stats().cycle_count < 2_000);
    match robot.trip_cause() {
        Some(TripCause::JointFault { faults, .. }) => {
            assert!(faults.contains(JointFault::OUT_OF_BOUNDS))
        }
        other => panic!("unexpected trip cause {other:?}"),
    }
    for name in robot.joint_names() {
        let c = robot.controller(name).unwrap();
        assert!(!c.is_enabled());
        assert_eq!(c.actuator().torque(), 0.0);
    }
}

#[test]
fn slow_actuators_overrun_every_cycle_without_aborting() {
    let mut config = quiet_biped();
    config.control.max_cycles = Some(20);
    for joint in &mut config.joints {
        joint.actuator_settle_us = 1_000;
    }
    let (mut robot, clock, _) = robot_on_manual_clock(config);

    assert_eq!(robot.run(), Ok(StopReason::CycleLimitReached));
    assert_eq!(robot.stats().overruns, 20);
    // No catch-up: each cycle takes its 6 ms processing time, no wait.
    assert_eq!(clock.now(), Duration::from_millis(120));
}

#[test]
fn commands_published_every_cycle() {
    let (mut robot, _clock, _) = robot_on_manual_clock(quiet_biped());
    let publisher = RecordingPublisher::default();
    let batches = publisher.batches.clone();
    robot.set_command_publisher(Box::new(publisher));
    robot.set_target_position("left_knee", 0.4).unwrap();

    for _ in 0..5 {
        robot.run_cycle().unwrap();
    }

    let batches = batches.lock().unwrap();
    assert_eq!(batches.len(), 5);
    for batch in batches.iter() {
        assert_eq!(batch.len(), 6);
        let knee = batch.iter().find(|c| c.joint == "left_knee").unwrap();
        assert_eq!(knee.target_position, 0.4);
        assert!(knee.torque.abs() <= 50.0);
    }
}

#[test]
fn stop_from_another_thread_ends_wall_clock_run() {
    let mut robot = RobotController::from_config(quiet_biped(), SystemClock::shared()).unwrap();
    robot.initialize().unwrap();
    let stop = robot.stop_handle();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        stop.request_stop();
    });
    assert_eq!(robot.run(), Ok(StopReason::StopRequested));
    stopper.join().unwrap();
    assert!(robot.stats().cycle_count > 0);
    assert_eq!(robot.safety_state(), SafetyState::Normal);
}

#[test]
fn emergency_stop_from_another_thread_ends_run() {
    let mut robot = RobotController::from_config(quiet_biped(), SystemClock::shared()).unwrap();
    robot.initialize().unwrap();
    let monitor = robot.safety_monitor();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        monitor.trigger_emergency_stop();
    });
    assert_eq!(robot.run(), Ok(StopReason::SafetyTripped));
    stopper.join().unwrap();
    assert_eq!(robot.trip_cause(), Some(TripCause::EmergencyStop));
}

#[test]
fn disconnected_sensor_reported_but_run_continues() {
    let mut config = quiet_biped();
    config.control.max_cycles = Some(10);
    let (mut robot, _clock, _) = robot_on_manual_clock(config);
    robot.joint_sensor("right_ankle").unwrap().set_connected(false);

    let report = robot.run_cycle().unwrap();
    assert!(!report.safety.is_safe());

    assert_eq!(robot.run(), Ok(StopReason::CycleLimitReached));
    assert_eq!(robot.safety_state(), SafetyState::Normal);
}
