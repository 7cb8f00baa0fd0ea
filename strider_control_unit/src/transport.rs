//! Host-facing outputs: per-cycle joint commands and periodic telemetry.
//!
//! The messaging layer behind these traits is external. The control unit
//! only calls [`CommandPublisher::publish`] once per cycle and
//! [`TelemetrySink::emit`] at the telemetry interval.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use strider_common::robot::telemetry::TelemetrySnapshot;
use tracing::{info, warn};

use crate::sync::lock;

/// Command sent for one joint in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointCommand {
    pub joint: String,
    /// Clamped target [rad].
    pub target_position: f64,
    /// Torque the actuator applied [N·m].
    pub torque: f64,
}

/// Outbound transport for joint commands.
pub trait CommandPublisher: Send {
    fn publish(&mut self, commands: &[JointCommand]);
}

/// Consumer of periodic telemetry snapshots.
pub trait TelemetrySink: Send {
    fn emit(&mut self, snapshot: &TelemetrySnapshot);
}

/// Telemetry through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    json: bool,
}

impl LogSink {
    pub const fn new() -> Self {
        Self { json: false }
    }

    /// Emit each snapshot as a JSON document instead of the compact line.
    pub const fn json() -> Self {
        Self { json: true }
    }
}

impl TelemetrySink for LogSink {
    fn emit(&mut self, snapshot: &TelemetrySnapshot) {
        if !self.json {
            info!(target: "telemetry", "{snapshot}");
            return;
        }
        match serde_json::to_string(snapshot) {
            Ok(doc) => info!(target: "telemetry", "{doc}"),
            Err(e) => warn!("telemetry serialization failed: {e}"),
        }
    }
}

/// Collects everything it receives. Useful for tests and host-side capture.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub snapshots: Arc<Mutex<Vec<TelemetrySnapshot>>>,
}

impl TelemetrySink for RecordingSink {
    fn emit(&mut self, snapshot: &TelemetrySnapshot) {
        lock(&self.snapshots).push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_common::robot::telemetry::SafetyStatus;

    #[test]
    fn snapshot_serializes_status_as_text() {
        let mut s = TelemetrySnapshot::new(1.0, 0.01, SafetyStatus::Ok);
        s.push_joint("left_hip", 0.002);
        let doc = serde_json::to_string(&s).unwrap();
        assert!(doc.contains("\"OK\""));
        assert!(doc.contains("left_hip"));
    }

    #[test]
    fn recording_sink_keeps_snapshots() {
        let mut sink = RecordingSink::default();
        let handle = sink.snapshots.clone();
        sink.emit(&TelemetrySnapshot::new(1.0, 0.0, SafetyStatus::Emergency));
        LogSink::json().emit(&TelemetrySnapshot::new(2.0, 0.0, SafetyStatus::Ok));
        let got = lock(&handle);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].status, SafetyStatus::Emergency);
    }
}
