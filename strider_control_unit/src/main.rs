//! # Strider Control Unit
//!
//! Runs the fixed-rate joint control loop for a legged robot.
//!
//! Loads a robot TOML (`--config`) or falls back to the built-in six-joint
//! biped, applies CLI overrides, performs RT setup, installs a Ctrl-C
//! handler bound to the loop's stop flag, and runs until stop, safety trip
//! or cycle limit.
//!
//! Exit codes: 0 on stop or cycle limit, 1 on startup failure, 2 when the
//! run ended in a safety trip.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use strider_common::config::ConfigLoader;
use strider_common::robot::config::RobotConfig;
use strider_control_unit::clock::SystemClock;
use strider_control_unit::robot::RobotController;
use strider_control_unit::rt::rt_setup;
use strider_control_unit::scheduler::StopReason;
use strider_control_unit::transport::LogSink;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Strider Control Unit: fixed-rate joint control for legged robots
#[derive(Parser, Debug)]
#[command(name = "strider_control_unit")]
#[command(version)]
#[command(about = "Fixed-rate joint control, sensor fusion and safety supervision")]
struct Args {
    /// Robot configuration TOML. Built-in six-joint biped when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the control frequency [Hz].
    #[arg(long, value_name = "HZ")]
    frequency: Option<f64>,

    /// Stop after this many cycles.
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// Override the simulated disturbance scale (0 = none).
    #[arg(long, value_name = "X")]
    excitation: Option<f64>,

    /// Override the CPU core the control thread is pinned to.
    #[arg(long, value_name = "CORE")]
    cpu_core: Option<usize>,

    /// Override the SCHED_FIFO priority.
    #[arg(long, value_name = "PRIO")]
    rt_priority: Option<i32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and telemetry in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, "info");
            error!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level.as_directive());

    info!(
        "Strider Control Unit v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    match run(&args, config) {
        Ok(StopReason::SafetyTripped) => {
            error!("Run ended in safety trip");
            process::exit(2);
        }
        Ok(reason) => info!("Strider Control Unit shutdown complete ({reason})"),
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    }
}

fn load_config(args: &Args) -> Result<RobotConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::reference_biped(),
    };
    if let Some(hz) = args.frequency {
        config.control.frequency_hz = hz;
    }
    if let Some(n) = args.cycles {
        config.control.max_cycles = Some(n);
    }
    if let Some(x) = args.excitation {
        config.simulation.excitation = x;
    }
    if let Some(core) = args.cpu_core {
        config.rt.cpu_core = core;
    }
    if let Some(priority) = args.rt_priority {
        config.rt.priority = priority;
    }
    Ok(config)
}

fn run(args: &Args, config: RobotConfig) -> Result<StopReason, Box<dyn std::error::Error>> {
    info!(
        "Config OK: {} joints, {} IMUs, {} Hz",
        config.joints.len(),
        config.imus.len(),
        config.control.frequency_hz
    );

    let mut robot = RobotController::from_config(config, SystemClock::shared())?;
    if args.json {
        robot.set_telemetry_sink(Box::new(LogSink::json()));
    }

    rt_setup(&robot.config().rt)?;

    let stop = robot.stop_handle();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stop.request_stop();
    })?;

    robot.initialize()?;
    for name in robot.joint_names() {
        robot.set_target_position(name, 0.0)?;
    }

    let reason = robot.run()?;
    if let Some(cause) = robot.trip_cause() {
        error!("Safety trip cause: {cause}");
    }
    info!("{} balance={:.4}", robot.stats(), robot.balance_estimate());
    Ok(reason)
}

/// Setup tracing subscriber. `RUST_LOG` wins over the configured level;
/// `--verbose` forces DEBUG.
fn setup_tracing(args: &Args, default_level: &str) {
    let level = if args.verbose { "debug" } else { default_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
