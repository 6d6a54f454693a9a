#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core valve/temperature sensor emulation (hardware-agnostic).
//!
//! This crate provides the state-tracking and persistence engine that lets
//! an external ECU perceive a plausible actuator. All hardware interaction
//! goes through the `valvemu_traits` boundary traits.
//!
//! ## Architecture
//!
//! - **Calibration**: affine maps and the piecewise-linear table (`calib`)
//! - **Position**: dt-integration of the directional inputs (`position`)
//! - **Tank**: tracked temperature with a dirty-flagged output (`tank`)
//! - **Passthrough**: engine ADC re-emitted as a duty cycle (`passthrough`)
//! - **Persistence**: the single key-guarded record (`state`)
//! - **Power-loss guard**: debounced save-on-edge (`guard`, `monitor`)
//! - **Assembly**: builder, per-tick orchestration, loop (`emulator`, `runner`)
//!
//! ## Concurrency model
//!
//! One cooperative main loop plus exactly one asynchronous context (the
//! power monitor thread). The tracked state crosses contexts only through
//! `SharedSnapshot`'s word-sized atomics; the guard's armed flag is the
//! single hand-off point.

pub mod calib;
pub mod config;
pub mod conversions;
pub mod diag;
pub mod emulator;
pub mod error;
pub mod guard;
pub mod hw_error;
pub mod mocks;
pub mod monitor;
pub mod passthrough;
pub mod position;
pub mod runner;
pub mod state;
pub mod tank;
pub mod util;

pub use calib::{AffineMap, InterpTable, TableRow};
pub use config::{EngineParams, GuardCfg, IntegratorCfg, TankCfg, TimingCfg};
pub use conversions::table_from_rows;
pub use diag::{DiagnosticSink, Snapshot};
pub use emulator::{Emulator, EmulatorBuilder, Tick};
pub use error::{BuildError, EmuError};
pub use guard::{ArmState, PowerGuard, SharedSnapshot};
pub use monitor::{GuardEvent, PowerMonitor};
pub use passthrough::EnginePassthrough;
pub use position::{PositionIntegrator, PositionTick, ValveBand};
pub use runner::{LoopStats, run};
pub use state::{RECORD_KEY, StateStore, TrackedState};
pub use tank::TankChannel;
