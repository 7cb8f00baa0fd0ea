//! Balance estimation from joint angles and IMU roll.
//!
//! Two exponential moving averages share one scalar target and are applied
//! in call order:
//!
//! - hip joint sample: `b = (1 − w_hip)·b + w_hip·position`
//! - IMU sample:       `b = (1 − w_imu)·b + w_imu·roll`
//!
//! The weights are tunables (`[fusion]` config), not a calibrated filter.
//! `confidence` tracks agreement between each sample and the prior estimate
//! and is informational only.

use std::collections::HashMap;
use std::sync::Mutex;

use strider_common::robot::config::FusionConfig;
use strider_common::robot::imu::ImuSample;
use strider_common::robot::state::JointState;
use tracing::trace;

use crate::sync::lock;

const CONFIDENCE_RETAIN: f64 = 0.9;

/// Scalar balance estimate with its confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceEstimate {
    /// Tilt proxy [rad].
    pub value: f64,
    /// Agreement score in (0, 1].
    pub confidence: f64,
}

impl Default for BalanceEstimate {
    fn default() -> Self {
        Self {
            value: 0.0,
            confidence: 1.0,
        }
    }
}

impl BalanceEstimate {
    fn fold(&mut self, measurement: f64, weight: f64) {
        let agreement = (-(measurement - self.value).abs()).exp();
        self.confidence =
            CONFIDENCE_RETAIN * self.confidence + (1.0 - CONFIDENCE_RETAIN) * agreement;
        self.value = (1.0 - weight) * self.value + weight * measurement;
    }
}

#[derive(Debug, Default)]
struct FusionState {
    joints: HashMap<String, JointState>,
    imus: HashMap<String, ImuSample>,
    estimate: BalanceEstimate,
}

#[derive(Debug)]
pub struct SensorFusionEstimator {
    config: FusionConfig,
    state: Mutex<FusionState>,
}

impl SensorFusionEstimator {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            state: Mutex::new(FusionState::default()),
        }
    }

    /// Whether `joint` feeds the balance estimate.
    pub fn is_balance_joint(&self, joint: &str) -> bool {
        joint.contains(self.config.hip_pattern.as_str())
    }

    /// Store the latest state of `joint`; hip joints fold their position
    /// into the balance estimate.
    pub fn update_joint_state(&self, joint: &str, state: JointState) {
        let mut s = lock(&self.state);
        if self.is_balance_joint(joint) {
            s.estimate.fold(state.position, self.config.hip_weight);
            trace!(
                "fusion: {joint} pos={:.4} → balance={:.5}",
                state.position, s.estimate.value
            );
        }
        match s.joints.get_mut(joint) {
            Some(slot) => *slot = state,
            None => {
                s.joints.insert(joint.to_string(), state);
            }
        }
    }

    /// Store the latest sample of `imu` and fold its roll angle into the
    /// balance estimate.
    pub fn update_imu_sample(&self, imu: &str, sample: ImuSample) {
        let roll = sample.orientation.roll();
        let mut s = lock(&self.state);
        s.estimate.fold(roll, self.config.imu_weight);
        trace!("fusion: {imu} roll={roll:.5} → balance={:.5}", s.estimate.value);
        match s.imus.get_mut(imu) {
            Some(slot) => *slot = sample,
            None => {
                s.imus.insert(imu.to_string(), sample);
            }
        }
    }

    /// Current balance estimate [rad].
    pub fn balance_estimate(&self) -> f64 {
        lock(&self.state).estimate.value
    }

    pub fn estimate(&self) -> BalanceEstimate {
        lock(&self.state).estimate
    }

    pub fn joint_state(&self, joint: &str) -> Option<JointState> {
        lock(&self.state).joints.get(joint).copied()
    }

    pub fn imu_sample(&self, imu: &str) -> Option<ImuSample> {
        lock(&self.state).imus.get(imu).copied()
    }
}
