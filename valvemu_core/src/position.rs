//! Valve position integration from the two directional inputs.
//!
//! Position moves at a fixed rate while `open` or `close` is held, clamped
//! to the calibration domain. The PWM write is skipped on idle ticks; the
//! first tick after construction always writes to bootstrap the output.

use std::sync::Arc;
use std::time::Instant;

use eyre::WrapErr;
use valvemu_traits::{Clock, DigitalInput, PwmChannel};

use crate::calib::AffineMap;
use crate::config::IntegratorCfg;
use crate::error::Result;
use crate::hw_error::map_hw_error;

/// Discrete valve-state classification derived from the continuous position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveBand {
    Closed,
    Mid,
    Open,
}

/// Outcome of one integrator tick.
#[derive(Debug, Clone, Copy)]
pub struct PositionTick {
    pub position_v: f32,
    /// True when the position value changed this tick.
    pub moved: bool,
    /// The duty written this tick, if the output was rewritten.
    pub duty: Option<u8>,
    pub open_active: bool,
    pub close_active: bool,
}

pub struct PositionIntegrator<O: DigitalInput, C: DigitalInput, P: PwmChannel> {
    open_in: O,
    close_in: C,
    out: P,
    cfg: IntegratorCfg,
    map: AffineMap,
    position_v: f32,
    last_ms: Option<u64>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl<O: DigitalInput, C: DigitalInput, P: PwmChannel> PositionIntegrator<O, C, P> {
    pub fn new(
        open_in: O,
        close_in: C,
        out: P,
        cfg: IntegratorCfg,
        map: AffineMap,
        clock: Arc<dyn Clock + Send + Sync>,
        epoch: Instant,
        initial_v: f32,
    ) -> Self {
        Self {
            open_in,
            close_in,
            out,
            cfg,
            map,
            position_v: initial_v.clamp(cfg.min_v, cfg.max_v),
            last_ms: None,
            clock,
            epoch,
        }
    }

    /// One integration step: sample the inputs, advance the position by the
    /// elapsed time, and rewrite the output when anything demanded it.
    ///
    /// Both inputs may be active in the same tick; the two integrations
    /// superpose. That mirrors the physical wiring — simultaneous assertion
    /// is a caller error, not a detected fault.
    pub fn tick(&mut self) -> Result<PositionTick> {
        let now = self.clock.ms_since(self.epoch);
        let first = self.last_ms.is_none();
        let dt_ms = self.last_ms.map_or(0, |last| now.saturating_sub(last));
        self.last_ms = Some(now);

        let open_active = self
            .open_in
            .is_active()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("open input")?;
        let close_active = self
            .close_in
            .is_active()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("close input")?;

        let mut moved = false;
        if open_active || close_active {
            let dt_s = dt_ms as f32 / 1000.0;
            let before = self.position_v;
            if open_active {
                self.position_v += dt_s * self.cfg.rate_v_per_s;
            }
            if close_active {
                self.position_v -= dt_s * self.cfg.rate_v_per_s;
            }
            self.position_v = self.position_v.clamp(self.cfg.min_v, self.cfg.max_v);
            moved = self.position_v != before;
        }

        let mut duty = None;
        if open_active || close_active || first {
            let d = self.map.duty(self.position_v);
            self.out
                .set_duty(d)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err("position output")?;
            duty = Some(d);
            if moved {
                tracing::trace!(position_v = self.position_v, duty = d, "position updated");
            }
        }

        Ok(PositionTick {
            position_v: self.position_v,
            moved,
            duty,
            open_active,
            close_active,
        })
    }

    pub fn position(&self) -> f32 {
        self.position_v
    }

    /// Overwrite the position (restore path); clamps into the domain. The
    /// next tick's bootstrap write pushes the matching duty.
    pub fn set_position(&mut self, v: f32) {
        self.position_v = v.clamp(self.cfg.min_v, self.cfg.max_v);
    }

    pub fn band(&self) -> ValveBand {
        if self.position_v < self.cfg.closed_below_v {
            ValveBand::Closed
        } else if self.position_v > self.cfg.open_above_v {
            ValveBand::Open
        } else {
            ValveBand::Mid
        }
    }

    pub fn is_closed(&self) -> bool {
        self.band() == ValveBand::Closed
    }

    pub fn is_open(&self) -> bool {
        self.band() == ValveBand::Open
    }
}
