//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls the run summary format).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "valvemu", version, about = "Valve/temperature sensor emulator")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/valvemu.toml")]
    pub config: PathBuf,

    /// Optional temperature-table CSV overlay (strict header)
    #[arg(long, value_name = "FILE")]
    pub table: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Diagnostic output encoding for the run loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DiagMode {
    /// Slash-delimited human-readable line
    Line,
    /// One JSON object per snapshot
    Json,
    /// Packed little-endian record (the wire format of the bench receiver)
    Binary,
    /// No diagnostics
    Off,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the emulator loop
    Run {
        /// Stop after this many ticks (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Override the EEPROM image path from the config
        #[arg(long, value_name = "FILE")]
        state_file: Option<PathBuf>,
        /// Diagnostic snapshot encoding
        #[arg(long, value_enum, value_name = "MODE", default_value = "line")]
        diag: DiagMode,
        /// Drive the sim inputs through an open/idle/close script and drift
        /// the tank temperature toward the engine reading (sim only)
        #[arg(long, action = ArgAction::SetTrue)]
        exercise: bool,
        /// Print loop latency stats on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        /// Enable real-time mode (SCHED_FIFO + mlockall, Linux only)
        #[arg(long, action = ArgAction::SetTrue)]
        rt: bool,
        /// SCHED_FIFO priority when --rt is enabled (1..=max)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
    },
    /// Quick health check (sim assembly, one persisted round-trip)
    SelfCheck,
    /// Print the record currently stored in the EEPROM image
    DumpState {
        /// Override the EEPROM image path from the config
        #[arg(long, value_name = "FILE")]
        state_file: Option<PathBuf>,
    },
}
