//! Robot lifecycle facade: builds every component from a [`RobotConfig`]
//! and exposes the host interface (targets, lifecycle, telemetry hooks).
//!
//! ```text
//! from_config ─► initialize ─► run (blocking) ─► StopReason
//!                                 ▲
//!        stop_handle / trigger_emergency_stop (any thread)
//! ```

use std::sync::Arc;

use strider_common::robot::config::RobotConfig;
use strider_common::robot::state::{SafetyState, TripCause};
use tracing::info;

use crate::clock::SharedClock;
use crate::control::joint_loop::JointControlLoop;
use crate::error::ControlError;
use crate::fusion::SensorFusionEstimator;
use crate::safety::SafetyMonitor;
use crate::scheduler::{
    CycleReport, CycleStats, JointChannel, Scheduler, StopHandle, StopReason,
};
use crate::sensor::{ImuSensorSim, JointSensorSim, NoiseSequence, Sensor};
use crate::transport::{CommandPublisher, TelemetrySink};

#[derive(Debug)]
pub struct RobotController {
    config: RobotConfig,
    noise: Arc<NoiseSequence>,
    imus: Vec<Arc<ImuSensorSim>>,
    fusion: Arc<SensorFusionEstimator>,
    safety: Arc<SafetyMonitor>,
    scheduler: Scheduler,
    initialized: bool,
}

impl RobotController {
    /// Validate `config` and build sensors, controllers, fusion, safety and
    /// the scheduler. Controllers start disabled.
    pub fn from_config(config: RobotConfig, clock: SharedClock) -> Result<Self, ControlError> {
        config.validate()?;

        let sim = &config.simulation;
        let noise = NoiseSequence::shared(sim.noise_phase_step);
        let mut safety = SafetyMonitor::new();

        let mut joints = Vec::with_capacity(config.joints.len());
        for joint in &config.joints {
            let sensor = Arc::new(JointSensorSim::new(
                &joint.name,
                joint.sensor_noise,
                sim.excitation,
                noise.clone(),
                clock.clone(),
            ));
            let controller = Arc::new(JointControlLoop::new(joint.clone(), clock.clone())?);
            safety.add_controller(controller.clone());
            safety.add_sensor(sensor.clone());
            joints.push(JointChannel { sensor, controller });
        }

        let imus: Vec<_> = config
            .imus
            .iter()
            .map(|imu| {
                Arc::new(ImuSensorSim::new(
                    &imu.name,
                    imu.noise,
                    sim.excitation,
                    sim.imu_integration_step_s,
                    noise.clone(),
                    clock.clone(),
                ))
            })
            .collect();
        for imu in &imus {
            safety.add_sensor(imu.clone());
        }

        let safety = Arc::new(safety);
        let fusion = Arc::new(SensorFusionEstimator::new(config.fusion.clone()));
        let scheduler = Scheduler::new(
            &config.control,
            clock,
            joints,
            imus.clone(),
            fusion.clone(),
            safety.clone(),
        )?;

        info!(
            "'{}': {} joints, {} IMUs at {} Hz",
            config.shared.service_name,
            config.joints.len(),
            config.imus.len(),
            config.control.frequency_hz
        );

        Ok(Self {
            config,
            noise,
            imus,
            fusion,
            safety,
            scheduler,
            initialized: false,
        })
    }

    /// Rewind the noise sequence and enable every joint controller.
    pub fn initialize(&mut self) -> Result<(), ControlError> {
        info!("Initializing robot controller...");
        self.noise.reset();
        for ch in self.scheduler.joints() {
            ch.controller.enable();
        }
        self.initialized = true;
        info!("Robot controller initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drive the control loop until stop, safety trip or cycle limit.
    pub fn run(&mut self) -> Result<StopReason, ControlError> {
        if !self.initialized {
            return Err(ControlError::NotInitialized);
        }
        Ok(self.scheduler.run())
    }

    /// One cycle body without pacing.
    pub fn run_cycle(&mut self) -> Result<CycleReport, ControlError> {
        if !self.initialized {
            return Err(ControlError::NotInitialized);
        }
        Ok(self.scheduler.run_cycle())
    }

    /// Request cooperative termination at the next iteration boundary.
    pub fn stop(&self) {
        self.scheduler.stop_handle().request_stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.scheduler.stop_handle()
    }

    /// Set the target of `joint`, clamped into its bounds. Returns the
    /// stored target.
    pub fn set_target_position(&self, joint: &str, radians: f64) -> Result<f64, ControlError> {
        self.controller(joint)
            .map(|c| c.set_target_position(radians))
            .ok_or_else(|| ControlError::UnknownJoint(joint.to_string()))
    }

    pub fn controller(&self, joint: &str) -> Option<&Arc<JointControlLoop>> {
        self.scheduler
            .joints()
            .iter()
            .find(|ch| ch.controller.name() == joint)
            .map(|ch| &ch.controller)
    }

    pub fn joint_sensor(&self, joint: &str) -> Option<&Arc<JointSensorSim>> {
        self.scheduler
            .joints()
            .iter()
            .find(|ch| ch.sensor.name() == joint)
            .map(|ch| &ch.sensor)
    }

    pub fn imu_sensor(&self, imu: &str) -> Option<&Arc<ImuSensorSim>> {
        self.imus.iter().find(|s| s.name() == imu)
    }

    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.config.joints.iter().map(|j| j.name.as_str())
    }

    pub fn balance_estimate(&self) -> f64 {
        self.fusion.balance_estimate()
    }

    pub fn fusion(&self) -> &Arc<SensorFusionEstimator> {
        &self.fusion
    }

    pub fn safety_state(&self) -> SafetyState {
        self.safety.state()
    }

    pub fn trip_cause(&self) -> Option<TripCause> {
        self.safety.trip_cause()
    }

    /// Close the safety latch. The loop stops at the next iteration.
    pub fn trigger_emergency_stop(&self) {
        self.safety.trigger_emergency_stop();
    }

    /// Shared monitor handle, for emergency stop from another thread.
    pub fn safety_monitor(&self) -> Arc<SafetyMonitor> {
        self.safety.clone()
    }

    pub fn stats(&self) -> &CycleStats {
        self.scheduler.stats()
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn set_telemetry_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.scheduler.set_telemetry_sink(sink);
    }

    pub fn set_command_publisher(&mut self, publisher: Box<dyn CommandPublisher>) {
        self.scheduler.set_command_publisher(publisher);
    }

    pub fn set_max_cycles(&mut self, max_cycles: Option<u64>) {
        self.config.control.max_cycles = max_cycles;
        self.scheduler.set_max_cycles(max_cycles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::f64::consts::PI;

    fn robot() -> RobotController {
        RobotController::from_config(RobotConfig::reference_biped(), ManualClock::shared()).unwrap()
    }

    #[test]
    fn run_requires_initialize() {
        let mut r = robot();
        assert_eq!(r.run(), Err(ControlError::NotInitialized));
        assert!(r.run_cycle().is_err());
    }

    #[test]
    fn initialize_enables_every_joint() {
        let mut r = robot();
        r.initialize().unwrap();
        assert!(r.is_initialized());
        for name in r.joint_names() {
            assert!(r.controller(name).is_some_and(|c| c.is_enabled()), "{name}");
        }
        assert_eq!(r.joint_names().count(), 6);
        assert!(r.imu_sensor("torso_imu").is_some());
        assert!(r.imu_sensor("head_imu").is_some());
    }

    #[test]
    fn target_command_is_clamped_and_routed() {
        let r = robot();
        assert_eq!(r.set_target_position("left_knee", 5.0), Ok(PI));
        assert_eq!(r.set_target_position("left_knee", 0.3), Ok(0.3));
        assert_eq!(
            r.set_target_position("tail", 0.0),
            Err(ControlError::UnknownJoint("tail".to_string()))
        );
    }

    #[test]
    fn invalid_config_fails_construction() {
        let mut config = RobotConfig::reference_biped();
        config.joints[2].kp = -1.0;
        let err = RobotController::from_config(config, ManualClock::shared()).unwrap_err();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[test]
    fn emergency_stop_reported_through_facade() {
        let mut r = robot();
        r.initialize().unwrap();
        r.trigger_emergency_stop();
        assert_eq!(r.safety_state(), SafetyState::Tripped);
        assert_eq!(r.trip_cause(), Some(TripCause::EmergencyStop));
        assert_eq!(r.run(), Ok(StopReason::SafetyTripped));
    }
}
