//! The tracked tank-temperature channel.
//!
//! Temperature changes arrive through `set_temperature`; the duty output is
//! rewritten only while the dirty flag is set, then the flag clears. The
//! flag is true exactly when the last-written output does not yet reflect
//! the current value (it starts true so the first flush bootstraps the
//! output).

use eyre::WrapErr;
use valvemu_traits::PwmChannel;

use crate::calib::InterpTable;
use crate::config::TankCfg;
use crate::error::Result;
use crate::hw_error::map_hw_error;

pub struct TankChannel<P: PwmChannel> {
    out: P,
    table: InterpTable,
    cfg: TankCfg,
    temp_c: f32,
    dirty: bool,
}

impl<P: PwmChannel> TankChannel<P> {
    pub fn new(out: P, table: InterpTable, cfg: TankCfg, initial_c: f32) -> Self {
        Self {
            out,
            table,
            cfg,
            temp_c: initial_c.clamp(cfg.min_c, cfg.max_c),
            dirty: true,
        }
    }

    /// External setter for the tracked temperature; clamps into the domain
    /// and marks the output stale when the value actually changed.
    pub fn set_temperature(&mut self, c: f32) {
        let c = c.clamp(self.cfg.min_c, self.cfg.max_c);
        if c != self.temp_c {
            self.temp_c = c;
            self.dirty = true;
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temp_c
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rewrite the output if the temperature changed since the last write.
    /// Returns the duty written, or None when the write was skipped.
    pub fn flush(&mut self) -> Result<Option<u8>> {
        if !self.dirty {
            return Ok(None);
        }
        let duty = self.table.lookup(self.temp_c);
        self.out
            .set_duty(duty)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("tank output")?;
        self.dirty = false;
        tracing::trace!(tank_c = self.temp_c, duty, "tank output updated");
        Ok(Some(duty))
    }
}
