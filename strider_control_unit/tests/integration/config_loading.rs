//! Robot configuration from TOML files into a running controller.

use std::io::Write;
use std::path::Path;

use strider_common::config::{ConfigError, ConfigLoader, LogLevel};
use strider_common::robot::config::RobotConfig;
use strider_control_unit::clock::ManualClock;
use strider_control_unit::error::ControlError;
use strider_control_unit::robot::RobotController;
use strider_control_unit::scheduler::StopReason;
use tempfile::NamedTempFile;

const SAMPLE_CONFIG: &str = include_str!("../../../config/robot.toml");

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn shipped_config_matches_reference_biped() {
    let config = RobotConfig::from_toml(SAMPLE_CONFIG).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config, RobotConfig::reference_biped());
}

#[test]
fn file_config_runs_to_cycle_limit() {
    let file = write_temp(
        r#"
[shared]
log_level = "debug"

[control]
frequency_hz = 100.0
telemetry_joints = ["pelvis_hip"]
max_cycles = 50

[simulation]
excitation = 0.0

[[joints]]
name = "pelvis_hip"
kp = 80.0
actuator_settle_us = 0

[[joints]]
name = "tail"
actuator_settle_us = 0
"#,
    );

    let config = RobotConfig::load(file.path()).unwrap();
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert!(config.imus.is_empty());

    let mut robot = RobotController::from_config(config, ManualClock::shared()).unwrap();
    robot.initialize().unwrap();
    assert_eq!(robot.run(), Ok(StopReason::CycleLimitReached));
    assert_eq!(robot.stats().cycle_count, 50);
}

#[test]
fn missing_file_reported() {
    let err = RobotConfig::load(Path::new("/nonexistent/strider/robot.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn malformed_toml_reported() {
    let file = write_temp("[[joints]\nname = ");
    let err = RobotConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn inverted_bounds_fail_fast_at_construction() {
    let file = write_temp(
        r#"
[[joints]]
name = "left_hip"
min_position = 1.0
max_position = -1.0
"#,
    );
    let config = RobotConfig::load(file.path()).unwrap();
    let err = RobotController::from_config(config, ManualClock::shared()).unwrap_err();
    assert!(matches!(
        err,
        ControlError::Config(ConfigError::ValidationError(_))
    ));
}

#[test]
fn out_of_range_frequency_rejected() {
    let mut config = RobotConfig::reference_biped();
    config.control.frequency_hz = 0.0;
    let err = RobotController::from_config(config, ManualClock::shared()).unwrap_err();
    assert!(matches!(err, ControlError::Config(_)));
}

#[test]
fn oversized_telemetry_interval_rejected_at_construction() {
    let mut config = RobotConfig::reference_biped();
    config.control.telemetry_interval_s = 1.0e20;
    assert!(config.validate().is_err());
    let err = RobotController::from_config(config, ManualClock::shared()).unwrap_err();
    assert!(matches!(
        err,
        ControlError::Config(ConfigError::ValidationError(_))
    ));
}
