//! Shared fixtures for integration tests.

use std::sync::{Arc, Mutex};

use strider_common::prelude::{RobotConfig, TelemetrySnapshot};
use strider_control_unit::clock::ManualClock;
use strider_control_unit::robot::RobotController;
use strider_control_unit::transport::{CommandPublisher, JointCommand, RecordingSink};

/// Reference biped with no simulated disturbance.
pub fn quiet_biped() -> RobotConfig {
    let mut config = RobotConfig::reference_biped();
    config.simulation.excitation = 0.0;
    config
}

/// Build and initialize a robot on a fresh simulated clock, with telemetry
/// captured in memory.
pub fn robot_on_manual_clock(
    config: RobotConfig,
) -> (RobotController, Arc<ManualClock>, Arc<Mutex<Vec<TelemetrySnapshot>>>) {
    let clock = ManualClock::shared();
    let mut robot = RobotController::from_config(config, clock.clone()).unwrap();
    let sink = RecordingSink::default();
    let snapshots = sink.snapshots.clone();
    robot.set_telemetry_sink(Box::new(sink));
    robot.initialize().unwrap();
    (robot, clock, snapshots)
}

/// Publisher that keeps every batch it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    pub batches: Arc<Mutex<Vec<Vec<JointCommand>>>>,
}

impl CommandPublisher for RecordingPublisher {
    fn publish(&mut self, commands: &[JointCommand]) {
        self.batches.lock().unwrap().push(commands.to_vec());
    }
}
