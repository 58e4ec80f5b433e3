//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "jr3", version, about = "JR3 force/torque sensor decoder")]
pub struct Cli {
    /// Path to config TOML (typed); built-in defaults drive the simulated sensor
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and print as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to
    /// `[logging].level`, then info. `RUST_LOG` wins over both.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            Self::Current
        } else {
            Self::None
        }
    }
}

/// Acquisition mode for `stream`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Mode {
    /// Poll the latest sample every period
    Sync,
    /// Let the push thread deliver a sample every period
    Async,
}

impl From<jr3_config::StreamMode> for Mode {
    fn from(m: jr3_config::StreamMode) -> Self {
        match m {
            jr3_config::StreamMode::Sync => Self::Sync,
            jr3_config::StreamMode::Async => Self::Async,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check for clock activity on the sensor lines and decode a few frames
    Probe {
        /// Frames to decode and print after the link is up
        #[arg(long, value_name = "N", default_value_t = 8)]
        frames: usize,
    },
    /// Read the calibration EEPROM and print the decoupling matrix and full scales
    Eeprom {
        /// Also store the image as an address,value CSV
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Print decoupled, filtered samples
    Stream {
        /// Override stream.mode from the config
        #[arg(long, value_enum)]
        mode: Option<Mode>,
        /// Override filter.cutoff_centihz (hundredths of a hertz, 0 = unfiltered)
        #[arg(long, value_name = "CENTIHZ")]
        cutoff_centihz: Option<u16>,
        /// Override stream.period_us
        #[arg(long, value_name = "US")]
        period_us: Option<u64>,
        /// Stop after this many samples (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        count: Option<u64>,
        /// Zero the offsets once acquisition has started
        #[arg(long, action = ArgAction::SetTrue)]
        zero: bool,
        /// Enable real-time mode (mlockall, SCHED_FIFO push thread)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on supported OSes.\n\nLinux builds with the `rt` feature lock the process address space into RAM and run the push thread under SCHED_FIFO. This reduces page faults and jitter but may require elevated privileges or ulimits (e.g., memlock)."
        )]
        rt: bool,
        /// SCHED_FIFO priority for the push thread when --rt is enabled (1..=99)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Select memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE")]
        rt_lock: Option<RtLock>,
    },
    /// Read controller commands from stdin, one per line
    Console,
}
