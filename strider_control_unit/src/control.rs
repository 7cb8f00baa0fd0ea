//! Control engine root.
//!
//! Per-joint position control: PID step plus the velocity interlock and
//! thermal derating stage in front of the actuator.

pub mod joint_loop;
pub mod pid;
