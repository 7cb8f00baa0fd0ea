//! Fixed-rate control cycle: read → fuse → control → actuate → safety → wait.
//!
//! ## Cycle body
//! 1. Read every connected joint sensor and IMU, push samples into fusion
//!    and the measured joint state into its controller.
//! 2. `update(dt)` on every controller; applied torque is fed back into the
//!    joint simulation.
//! 3. Publish per-joint commands (if a publisher is attached).
//! 4. `check_safety()`.
//! 5. Emit a telemetry snapshot at most once per telemetry interval.
//!
//! ## Pacing
//! After the body the loop waits `period − processing`. A body longer than
//! the period is an overrun: counted, logged, and the next cycle starts
//! immediately. There is no catch-up.
//!
//! ## Termination
//! Checked once at the top of each iteration: stop request, tripped safety
//! latch, or the optional cycle limit. An in-flight cycle always completes.
//! Every controller is disabled on exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use strider_common::config::ConfigError;
use strider_common::robot::config::ControlConfig;
use strider_common::robot::telemetry::TelemetrySnapshot;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::control::joint_loop::JointControlLoop;
use crate::error::ControlError;
use crate::fusion::SensorFusionEstimator;
use crate::safety::{SafetyCheck, SafetyMonitor};
use crate::sensor::{ImuSensorSim, JointSensorSim, Sensor};
use crate::transport::{CommandPublisher, JointCommand, LogSink, TelemetrySink};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Per-cycle timing measured on the scheduler's clock. O(1) per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycles executed.
    pub cycle_count: u64,
    /// Cycles whose processing exceeded the period.
    pub overruns: u64,
    pub last_processing: Duration,
    /// `None` until the first cycle.
    pub min_processing: Option<Duration>,
    pub max_processing: Duration,
    pub total_processing: Duration,
    /// Largest gap between the planned and actual start of a paced cycle.
    pub max_wake_delay: Duration,
}

impl CycleStats {
    /// Record one cycle against its `budget`. Returns whether it overran.
    #[inline]
    pub fn record(&mut self, processing: Duration, budget: Duration, wake_delay: Duration) -> bool {
        self.cycle_count += 1;
        self.last_processing = processing;
        self.min_processing = Some(self.min_processing.map_or(processing, |m| m.min(processing)));
        self.max_processing = self.max_processing.max(processing);
        self.total_processing = self.total_processing.saturating_add(processing);
        self.max_wake_delay = self.max_wake_delay.max(wake_delay);

        let overrun = processing > budget;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    pub fn avg_processing(&self) -> Duration {
        match self.cycle_count {
            0 => Duration::ZERO,
            n => {
                let avg = self.total_processing.as_nanos() / u128::from(n);
                Duration::from_nanos(u64::try_from(avg).unwrap_or(u64::MAX))
            }
        }
    }
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycles={} avg={:?} max={:?} overruns={}",
            self.cycle_count,
            self.avg_processing(),
            self.max_processing,
            self.overruns
        )
    }
}

// ─── Loop Types ─────────────────────────────────────────────────────

/// Why [`Scheduler::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Cooperative stop via [`StopHandle`].
    StopRequested,
    /// The safety latch closed.
    SafetyTripped,
    /// `max_cycles` iterations completed.
    CycleLimitReached,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopRequested => f.write_str("stop requested"),
            Self::SafetyTripped => f.write_str("safety tripped"),
            Self::CycleLimitReached => f.write_str("cycle limit reached"),
        }
    }
}

/// Cloneable cooperative stop flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop at the next iteration boundary.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sensor and controller of one joint.
#[derive(Debug, Clone)]
pub struct JointChannel {
    pub sensor: Arc<JointSensorSim>,
    pub controller: Arc<JointControlLoop>,
}

/// Result of one cycle body.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Time spent in the body.
    pub processing: Duration,
    pub overrun: bool,
    pub safety: SafetyCheck,
    /// Snapshot emitted this cycle, if the telemetry interval elapsed.
    pub telemetry: Option<TelemetrySnapshot>,
}

// ─── Scheduler ──────────────────────────────────────────────────────

pub struct Scheduler {
    clock: SharedClock,
    period: Duration,
    /// `period` in seconds, the controller step.
    dt: f64,
    joints: Vec<JointChannel>,
    imus: Vec<Arc<ImuSensorSim>>,
    fusion: Arc<SensorFusionEstimator>,
    safety: Arc<SafetyMonitor>,
    /// Indices into `joints` selected for telemetry.
    telemetry_joints: Vec<usize>,
    telemetry_interval: Duration,
    last_telemetry: Duration,
    max_cycles: Option<u64>,
    stop: StopHandle,
    stats: CycleStats,
    sink: Box<dyn TelemetrySink>,
    publisher: Option<Box<dyn CommandPublisher>>,
    /// Pre-allocated outbound command buffer.
    commands: Vec<JointCommand>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("period", &self.period)
            .field("joints", &self.joints.len())
            .field("imus", &self.imus.len())
            .field("max_cycles", &self.max_cycles)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Build a scheduler over already-constructed components.
    ///
    /// `control` must have passed validation; telemetry joints must name
    /// entries of `joints`.
    pub fn new(
        control: &ControlConfig,
        clock: SharedClock,
        joints: Vec<JointChannel>,
        imus: Vec<Arc<ImuSensorSim>>,
        fusion: Arc<SensorFusionEstimator>,
        safety: Arc<SafetyMonitor>,
    ) -> Result<Self, ControlError> {
        let dt = control.period_s();
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(ControlError::InvalidTimestep(dt));
        }
        let period =
            Duration::try_from_secs_f64(dt).map_err(|_| ControlError::InvalidTimestep(dt))?;
        let telemetry_interval = Duration::try_from_secs_f64(control.telemetry_interval_s)
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "telemetry_interval_s {}: {e}",
                    control.telemetry_interval_s
                ))
            })?;

        let telemetry_joints = control
            .telemetry_joints
            .iter()
            .map(|name| {
                joints
                    .iter()
                    .position(|j| j.controller.name() == name)
                    .ok_or_else(|| ControlError::UnknownJoint(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let commands = joints
            .iter()
            .map(|j| JointCommand {
                joint: j.controller.name().to_string(),
                target_position: j.controller.target_position(),
                torque: 0.0,
            })
            .collect();

        let last_telemetry = clock.now();
        Ok(Self {
            period,
            dt,
            joints,
            imus,
            fusion,
            safety,
            telemetry_joints,
            telemetry_interval,
            last_telemetry,
            max_cycles: control.max_cycles,
            stop: StopHandle::new(),
            stats: CycleStats::default(),
            sink: Box::new(LogSink::new()),
            publisher: None,
            commands,
            clock,
        })
    }

    pub fn set_telemetry_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sink = sink;
    }

    pub fn set_command_publisher(&mut self, publisher: Box<dyn CommandPublisher>) {
        self.publisher = Some(publisher);
    }

    pub fn set_max_cycles(&mut self, max_cycles: Option<u64>) {
        self.max_cycles = max_cycles;
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn joints(&self) -> &[JointChannel] {
        &self.joints
    }

    /// Execute one cycle body without waiting.
    pub fn run_cycle(&mut self) -> CycleReport {
        let start = self.clock.now();
        self.run_body(start, Duration::ZERO)
    }

    fn run_body(&mut self, start: Duration, wake_delay: Duration) -> CycleReport {
        // ═══ READ + FUSE ═══
        for ch in &self.joints {
            if !ch.sensor.is_connected() {
                continue;
            }
            let sample = ch.sensor.read();
            self.fusion.update_joint_state(ch.sensor.name(), sample);
            ch.controller.observe(sample);
        }
        for imu in &self.imus {
            if !imu.is_connected() {
                continue;
            }
            let sample = imu.read();
            self.fusion.update_imu_sample(imu.name(), sample);
        }

        // ═══ CONTROL + ACTUATE ═══
        for (ch, cmd) in self.joints.iter().zip(self.commands.iter_mut()) {
            match ch.controller.update(self.dt) {
                Ok(Some(out)) => {
                    ch.sensor.apply_torque(out.applied_torque);
                    cmd.torque = out.applied_torque;
                }
                Ok(None) => cmd.torque = 0.0,
                Err(e) => warn!("Joint '{}': control step skipped: {e}", ch.controller.name()),
            }
            cmd.target_position = ch.controller.target_position();
        }
        if let Some(publisher) = self.publisher.as_mut() {
            publisher.publish(&self.commands);
        }

        // ═══ SAFETY ═══
        let safety = self.safety.check_safety();

        // ═══ TELEMETRY ═══
        let now = self.clock.now();
        let telemetry = if now.saturating_sub(self.last_telemetry) >= self.telemetry_interval {
            self.last_telemetry = now;
            let snapshot = self.snapshot(now, &safety);
            self.sink.emit(&snapshot);
            Some(snapshot)
        } else {
            None
        };

        // ═══ TIMING ═══
        let processing = self.clock.now().saturating_sub(start);
        let overrun = self.stats.record(processing, self.period, wake_delay);
        if overrun {
            warn!(
                "Cycle {} overrun: {processing:?} > {:?} budget",
                self.stats.cycle_count, self.period
            );
        }

        CycleReport {
            cycle: self.stats.cycle_count,
            processing,
            overrun,
            safety,
            telemetry,
        }
    }

    fn snapshot(&self, now: Duration, safety: &SafetyCheck) -> TelemetrySnapshot {
        let mut snapshot = TelemetrySnapshot::new(
            now.as_secs_f64(),
            self.fusion.balance_estimate(),
            safety.status(),
        );
        for &i in &self.telemetry_joints {
            let controller = &self.joints[i].controller;
            snapshot.push_joint(controller.name(), controller.state().position);
        }
        snapshot
    }

    fn should_stop(&self) -> Option<StopReason> {
        if self.stop.is_stop_requested() {
            Some(StopReason::StopRequested)
        } else if self.safety.is_tripped() {
            Some(StopReason::SafetyTripped)
        } else if self
            .max_cycles
            .is_some_and(|max| self.stats.cycle_count >= max)
        {
            Some(StopReason::CycleLimitReached)
        } else {
            None
        }
    }

    /// Drive cycles until a stop condition holds, then disable every
    /// controller. Blocking.
    pub fn run(&mut self) -> StopReason {
        info!(
            "Control loop started: {:.1} Hz, {} joints, {} IMUs",
            1.0 / self.dt,
            self.joints.len(),
            self.imus.len()
        );

        let mut expected_start: Option<Duration> = None;
        let reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            let start = self.clock.now();
            let wake_delay = expected_start.map_or(Duration::ZERO, |e| start.saturating_sub(e));
            let report = self.run_body(start, wake_delay);

            let wait = self.period.saturating_sub(report.processing);
            expected_start = Some(start + report.processing.max(self.period));
            self.clock.sleep(wait);
        };

        self.halt();
        info!("Control loop stopped ({reason}): {}", self.stats);
        reason
    }

    /// Zero every actuator and disable every controller.
    pub fn halt(&self) {
        for ch in &self.joints {
            ch.controller.disable();
        }
        debug!("All joint controllers disabled");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
