//! Control-thread placement.
//!
//! [`rt_setup`] turns the `[rt]` section of the robot configuration into an
//! ordered plan of [`RtStep`]s and applies it to the calling thread:
//!
//! 1. lock memory (`mlockall`), when `lock_memory` is set
//! 2. prefault `stack_prefault_kib` of stack, when non-zero
//! 3. pin to `cpu_core`
//! 4. switch to SCHED_FIFO at `priority`
//!
//! Builds without the `rt` feature skip the system calls and report the
//! steps as skipped; the stack prefault runs in every build.

use std::fmt;

use strider_common::robot::config::RtConfig;
use tracing::{debug, info};

use crate::error::ControlError;

/// Stack touched per recursion frame while prefaulting.
const PREFAULT_CHUNK_KIB: usize = 64;

/// One placement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtStep {
    LockMemory,
    PrefaultStack { kib: usize },
    PinCore(usize),
    FifoPriority(i32),
}

impl fmt::Display for RtStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockMemory => f.write_str("mlockall"),
            Self::PrefaultStack { kib } => write!(f, "prefault {kib} KiB stack"),
            Self::PinCore(core) => write!(f, "pin to cpu {core}"),
            Self::FifoPriority(priority) => write!(f, "SCHED_FIFO prio {priority}"),
        }
    }
}

/// Outcome of [`rt_setup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtReport {
    pub applied: Vec<RtStep>,
    /// Steps this build does not perform.
    pub skipped: Vec<RtStep>,
}

impl RtReport {
    /// Whether every planned step took effect.
    pub fn is_realtime(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Steps `config` asks for, in execution order.
pub fn plan(config: &RtConfig) -> Vec<RtStep> {
    let mut steps = Vec::with_capacity(4);
    if config.lock_memory {
        steps.push(RtStep::LockMemory);
    }
    if config.stack_prefault_kib > 0 {
        steps.push(RtStep::PrefaultStack {
            kib: config.stack_prefault_kib,
        });
    }
    steps.push(RtStep::PinCore(config.cpu_core));
    steps.push(RtStep::FifoPriority(config.priority));
    steps
}

/// Validate `config` and apply its plan to the calling thread.
///
/// Call once, from the thread that will run the control loop.
pub fn rt_setup(config: &RtConfig) -> Result<RtReport, ControlError> {
    config.validate()?;

    let mut report = RtReport::default();
    for step in plan(config) {
        if apply(step)? {
            debug!("RT: {step}");
            report.applied.push(step);
        } else {
            report.skipped.push(step);
        }
    }

    if report.is_realtime() {
        info!(
            "RT setup complete: cpu={} SCHED_FIFO prio={}",
            config.cpu_core, config.priority
        );
    } else {
        info!(
            "RT feature disabled: {} step(s) skipped, control thread runs best-effort",
            report.skipped.len()
        );
    }
    Ok(report)
}

/// Returns `Ok(false)` when the step is not available in this build.
fn apply(step: RtStep) -> Result<bool, ControlError> {
    match step {
        RtStep::LockMemory => lock_memory(),
        RtStep::PrefaultStack { kib } => {
            prefault_stack(kib.div_ceil(PREFAULT_CHUNK_KIB));
            Ok(true)
        }
        RtStep::PinCore(core) => pin_core(core),
        RtStep::FifoPriority(priority) => set_fifo(priority),
    }
}

/// Touch `chunks` stack frames of [`PREFAULT_CHUNK_KIB`] each.
#[inline(never)]
fn prefault_stack(chunks: usize) {
    let mut buf = [0u8; PREFAULT_CHUNK_KIB * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    if chunks > 1 {
        prefault_stack(chunks - 1);
    }
    // Keeps this frame alive across the recursive call.
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn lock_memory() -> Result<bool, ControlError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| ControlError::RtSetup(format!("mlockall: {e}")))?;
    Ok(true)
}

#[cfg(not(feature = "rt"))]
fn lock_memory() -> Result<bool, ControlError> {
    Ok(false)
}

#[cfg(feature = "rt")]
fn pin_core(core: usize) -> Result<bool, ControlError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpus = CpuSet::new();
    cpus.set(core)
        .map_err(|e| ControlError::RtSetup(format!("cpu {core}: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpus)
        .map_err(|e| ControlError::RtSetup(format!("pin to cpu {core}: {e}")))?;
    Ok(true)
}

#[cfg(not(feature = "rt"))]
fn pin_core(_core: usize) -> Result<bool, ControlError> {
    Ok(false)
}

#[cfg(feature = "rt")]
fn set_fifo(priority: i32) -> Result<bool, ControlError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
        let err = std::io::Error::last_os_error();
        return Err(ControlError::RtSetup(format!(
            "SCHED_FIFO prio {priority}: {err}"
        )));
    }
    Ok(true)
}

#[cfg(not(feature = "rt"))]
fn set_fifo(_priority: i32) -> Result<bool, ControlError> {
    Ok(false)
}
