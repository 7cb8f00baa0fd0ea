//! Control unit error type.
//!
//! Only construction and command-interface failures are errors. Overruns,
//! safety trips and sensor disconnection are reported as values by the
//! scheduler and safety monitor.

use strider_common::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// `update(dt)` called with a non-positive or non-finite step.
    #[error("invalid timestep {0}s: dt must be finite and > 0")]
    InvalidTimestep(f64),

    /// Command addressed to a joint that is not configured.
    #[error("unknown joint '{0}'")]
    UnknownJoint(String),

    /// `run()` called before `initialize()` succeeded.
    #[error("controller not initialized")]
    NotInitialized,

    /// Configuration rejected at construction.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Real-time system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
}
