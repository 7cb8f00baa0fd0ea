//! Safety module root.
//!
//! Latching safety state machine and the per-cycle monitor that evaluates
//! joint limits and sensor connectivity.

pub mod machine;
pub mod monitor;

pub use machine::{SafetyStateMachine, SafetyTransition};
pub use monitor::{SafetyCheck, SafetyMonitor};
