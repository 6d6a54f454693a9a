//! The cooperative main loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::emulator::Emulator;
use crate::error::Result;

/// Counters accumulated over a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopStats {
    pub ticks: u64,
    /// Power-loss saves observed during the run.
    pub saves: u64,
    /// Guard re-arms observed during the run.
    pub rearms: u64,
}

/// Drive the emulator at `tick_hz` until the shutdown flag is raised or the
/// optional tick limit runs out. The loop never blocks beyond the period
/// sleep; the only other suspension in the system is the monitor's bounded
/// storage write.
pub fn run(
    emu: &mut Emulator,
    tick_hz: u32,
    shutdown: &AtomicBool,
    max_ticks: Option<u64>,
) -> Result<LoopStats> {
    let period = Duration::from_micros(crate::util::period_us(tick_hz));
    let mut stats = LoopStats::default();
    let start_saves = emu.saves();

    tracing::info!(tick_hz, "emulator loop start");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if let Some(max) = max_ticks {
            if stats.ticks >= max {
                break;
            }
        }

        let tick = emu.step()?;
        stats.ticks += 1;
        if tick.rearmed {
            stats.rearms += 1;
        }

        emu.clock().sleep(period);
    }

    stats.saves = emu.saves().saturating_sub(start_saves);
    tracing::info!(
        ticks = stats.ticks,
        saves = stats.saves,
        rearms = stats.rearms,
        "emulator loop exit"
    );
    Ok(stats)
}
