//! # Strider Control Unit Library
//!
//! Fixed-rate control core for a multi-joint legged robot. Each cycle reads
//! the simulated joint sensors and IMUs, folds the samples into a scalar
//! balance estimate, runs one PID step per joint, drives the actuators and
//! evaluates a latching safety monitor.
//!
//! ## Cycle
//!
//! ```text
//! Scheduler ─► sensors.read ─► fusion.update ─► controller.update ─► actuator
//!     ▲                                                                 │
//!     └────────────── wait(period − processing) ◄── safety.check ◄──────┘
//! ```
//!
//! ## Time
//!
//! Every component reads time through a shared [`clock::Clock`]. Production
//! runs use [`clock::SystemClock`]; tests and benches use
//! [`clock::ManualClock`], where waits advance simulated time instantly.

pub mod actuator;
pub mod clock;
pub mod control;
pub mod error;
pub mod fusion;
pub mod robot;
pub mod rt;
pub mod safety;
pub mod scheduler;
pub mod sensor;
pub mod transport;

mod sync;
