//! Strider Common Library
//!
//! Shared constants, configuration loading and data types for the Strider
//! legged-robot control workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide limits and controller defaults
//! - [`config`] - TOML loading trait, shared config section, config errors
//! - [`robot`] - Robot configuration, joint/IMU state, safety and telemetry types
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod prelude;
pub mod robot;
