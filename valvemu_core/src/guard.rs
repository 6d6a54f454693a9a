//! Power-loss guard: ARMED → (edge) → DISARMED → (quiet period) → ARMED.
//!
//! `ArmState` is the pure state machine; `PowerGuard` is its cross-context
//! form built from atomics, cleared by the interrupt context and re-armed
//! by the main loop. `SharedSnapshot` publishes the tracked quantities as
//! single word-sized atomics so the interrupt context can never observe a
//! torn multi-field record.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::state::TrackedState;

/// Pure arm/disarm state machine with time-based debounce.
#[derive(Debug, Clone, Copy)]
pub struct ArmState {
    armed: bool,
    disarmed_at_ms: u64,
}

impl Default for ArmState {
    fn default() -> Self {
        Self::new()
    }
}

impl ArmState {
    /// Starts armed; `disarmed_at_ms` is only meaningful while disarmed.
    pub fn new() -> Self {
        Self {
            armed: true,
            disarmed_at_ms: 0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// An edge arrived. Returns true exactly when this edge should trigger
    /// a save (i.e. the guard was armed); the guard disarms either way.
    pub fn on_edge(&mut self, now_ms: u64) -> bool {
        if self.armed {
            self.armed = false;
            self.disarmed_at_ms = now_ms;
            true
        } else {
            false
        }
    }

    /// Main-loop service: re-arm once the quiet window has fully elapsed.
    /// Returns true on the transition back to armed.
    pub fn try_rearm(&mut self, now_ms: u64, quiet_ms: u64) -> bool {
        if !self.armed && now_ms.saturating_sub(self.disarmed_at_ms) >= quiet_ms {
            self.armed = true;
            true
        } else {
            false
        }
    }
}

/// Cross-context arm state. `notify_edge` is called from the interrupt
/// context, `service` from the main loop; the armed flag is the single
/// hand-off point between the two.
pub struct PowerGuard {
    armed: AtomicBool,
    disarmed_at_ms: AtomicU64,
    /// Latches edges seen while disarmed (electrical bounce around the
    /// power-loss event); cleared when the main loop re-arms.
    pending: AtomicBool,
    quiet_ms: u64,
}

impl PowerGuard {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            armed: AtomicBool::new(true),
            disarmed_at_ms: AtomicU64::new(0),
            pending: AtomicBool::new(false),
            quiet_ms,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn quiet_ms(&self) -> u64 {
        self.quiet_ms
    }

    /// Interrupt-context entry. Returns true exactly once per armed period:
    /// for the edge that wins the armed→disarmed transition and must save.
    pub fn notify_edge(&self, now_ms: u64) -> bool {
        if self
            .armed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.disarmed_at_ms.store(now_ms, Ordering::Release);
            true
        } else {
            self.pending.store(true, Ordering::Release);
            false
        }
    }

    /// Main-loop service. Re-arms after the quiet window, discarding any
    /// pending spurious edge first. Returns true on re-arm.
    pub fn service(&self, now_ms: u64) -> bool {
        if self.armed.load(Ordering::Acquire) {
            return false;
        }
        let since = now_ms.saturating_sub(self.disarmed_at_ms.load(Ordering::Acquire));
        if since >= self.quiet_ms {
            self.pending.store(false, Ordering::Release);
            self.armed.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }
}

/// Latest tracked quantities, published by the main loop and read by the
/// interrupt context. Each field is a single `AtomicU32` carrying an f32
/// bit pattern, so reads are individually atomic and torn records are
/// impossible by construction.
pub struct SharedSnapshot {
    position_bits: AtomicU32,
    tank_bits: AtomicU32,
}

impl SharedSnapshot {
    pub fn new(initial: TrackedState) -> Self {
        Self {
            position_bits: AtomicU32::new(initial.position_v.to_bits()),
            tank_bits: AtomicU32::new(initial.tank_c.to_bits()),
        }
    }

    pub fn publish_position(&self, v: f32) {
        self.position_bits.store(v.to_bits(), Ordering::Release);
    }

    pub fn publish_tank(&self, c: f32) {
        self.tank_bits.store(c.to_bits(), Ordering::Release);
    }

    pub fn publish(&self, s: &TrackedState) {
        self.publish_position(s.position_v);
        self.publish_tank(s.tank_c);
    }

    pub fn load(&self) -> TrackedState {
        TrackedState {
            position_v: f32::from_bits(self.position_bits.load(Ordering::Acquire)),
            tank_c: f32::from_bits(self.tank_bits.load(Ordering::Acquire)),
        }
    }
}
