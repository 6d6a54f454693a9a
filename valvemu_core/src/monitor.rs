//! The power-sense monitor: the system's one asynchronous context.
//!
//! Spawns a thread that owns the power-sense input and the state store,
//! watches for the inactive→active edge, and performs the bounded,
//! synchronous save while the guard is armed. Guard events are handed to
//! the main loop over a bounded channel for logging and stats.
//!
//! Safety: each `PowerMonitor` spawns exactly one thread that is shut down
//! when the monitor is dropped, preventing thread leaks.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use valvemu_traits::{Clock, DigitalInput, NvStorage};

use crate::guard::{PowerGuard, SharedSnapshot};
use crate::state::StateStore;

/// What the monitor observed, for main-loop consumption.
#[derive(Debug, Clone)]
pub enum GuardEvent {
    /// An armed edge arrived and the snapshot was persisted.
    Saved { at_ms: u64 },
    /// An edge arrived while disarmed (bounce) and was suppressed.
    Suppressed { at_ms: u64 },
    /// The save itself failed; the guard still disarmed.
    SaveFailed { at_ms: u64, error: String },
}

pub struct PowerMonitor {
    rx: xch::Receiver<GuardEvent>,
    power_active: Arc<AtomicBool>,
    saves: Arc<AtomicU64>,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl PowerMonitor {
    /// Spawn the monitor thread. `epoch` must be the same instant the main
    /// loop derives its millisecond timestamps from, so guard timestamps
    /// compare across contexts.
    pub fn spawn<P, N>(
        mut power_in: P,
        mut store: StateStore<N>,
        guard: Arc<PowerGuard>,
        snapshot: Arc<SharedSnapshot>,
        poll_ms: u64,
        clock: Arc<dyn Clock + Send + Sync>,
        epoch: Instant,
    ) -> Self
    where
        P: DigitalInput + Send + 'static,
        N: NvStorage + Send + 'static,
    {
        let (tx, rx) = xch::bounded(8);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let power_active = Arc::new(AtomicBool::new(false));
        let power_active_clone = power_active.clone();
        let saves = Arc::new(AtomicU64::new(0));
        let saves_clone = saves.clone();
        let period = Duration::from_millis(poll_ms.max(1));

        let join_handle = std::thread::spawn(move || {
            let mut was_active = false;
            loop {
                // Immediate shutdown check (lock-free atomic)
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("power monitor received shutdown signal");
                    break;
                }

                let active = match power_in.is_active() {
                    Ok(v) => v,
                    Err(e) => {
                        // Input read failures are transient on the sim
                        // backends; keep the previous level.
                        tracing::warn!(error = %e, "power-sense read failed");
                        was_active
                    }
                };
                power_active_clone.store(active, Ordering::Relaxed);

                if active && !was_active {
                    let at_ms = clock.ms_since(epoch);
                    if guard.notify_edge(at_ms) {
                        match store.save(&snapshot.load()) {
                            Ok(()) => {
                                saves_clone.fetch_add(1, Ordering::Relaxed);
                                tracing::info!(at_ms, "power loss detected, state saved");
                                let _ = tx.try_send(GuardEvent::Saved { at_ms });
                            }
                            Err(e) => {
                                tracing::error!(at_ms, error = %e, "power-loss save failed");
                                let _ = tx.try_send(GuardEvent::SaveFailed {
                                    at_ms,
                                    error: e.to_string(),
                                });
                            }
                        }
                    } else {
                        tracing::debug!(at_ms, "edge during quiet window suppressed");
                        let _ = tx.try_send(GuardEvent::Suppressed { at_ms });
                    }
                }
                was_active = active;

                // Check shutdown before sleep to avoid unnecessary delay
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("power monitor thread exiting cleanly");
        });

        Self {
            rx,
            power_active,
            saves,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Drain any events the monitor produced since the last call.
    pub fn try_events(&self) -> Vec<GuardEvent> {
        self.rx.try_iter().collect()
    }

    /// Last observed level of the power-sense input.
    pub fn power_active(&self) -> bool {
        self.power_active.load(Ordering::Relaxed)
    }

    /// Number of successful power-loss saves since spawn.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }
}

impl Drop for PowerMonitor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("power monitor thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "power monitor thread panicked during shutdown");
                }
            }
        }
    }
}
