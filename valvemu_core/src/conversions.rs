//! `From` implementations bridging `valvemu_config` types to core types.
//!
//! These keep the CLI free of field-by-field mapping.

use crate::calib::{AffineMap, InterpTable, TableRow};
use crate::config::{EngineParams, GuardCfg, IntegratorCfg, TankCfg, TimingCfg};
use crate::error::Result;

// ── IntegratorCfg ────────────────────────────────────────────────────────────

impl From<&valvemu_config::IntegratorCfg> for IntegratorCfg {
    fn from(c: &valvemu_config::IntegratorCfg) -> Self {
        Self {
            rate_v_per_s: c.rate_v_per_s,
            min_v: c.min_v,
            max_v: c.max_v,
            closed_below_v: c.closed_below_v,
            open_above_v: c.open_above_v,
        }
    }
}

/// The position output's volts-to-duty map lives in the same TOML section.
impl From<&valvemu_config::IntegratorCfg> for AffineMap {
    fn from(c: &valvemu_config::IntegratorCfg) -> Self {
        Self {
            scale: c.duty_scale,
            offset: c.duty_offset,
        }
    }
}

// ── TankCfg ──────────────────────────────────────────────────────────────────

impl From<&valvemu_config::TankCfg> for TankCfg {
    fn from(c: &valvemu_config::TankCfg) -> Self {
        Self {
            min_c: c.min_c,
            max_c: c.max_c,
        }
    }
}

impl From<&valvemu_config::TableRow> for TableRow {
    fn from(r: &valvemu_config::TableRow) -> Self {
        Self {
            threshold: r.threshold_c,
            base_duty: r.duty,
            slope: r.slope,
        }
    }
}

/// Build the lookup table from config rows, re-validating the ordering
/// invariant in the constructor.
pub fn table_from_rows(rows: &[valvemu_config::TableRow]) -> Result<InterpTable> {
    InterpTable::new(rows.iter().map(TableRow::from).collect())
}

// ── GuardCfg / TimingCfg ─────────────────────────────────────────────────────

impl From<&valvemu_config::GuardCfg> for GuardCfg {
    fn from(c: &valvemu_config::GuardCfg) -> Self {
        Self {
            quiet_ms: c.quiet_ms,
            poll_ms: c.poll_ms,
        }
    }
}

impl From<&valvemu_config::TimingCfg> for TimingCfg {
    fn from(c: &valvemu_config::TimingCfg) -> Self {
        Self {
            tick_hz: c.tick_hz,
            diag_hz: c.diag_hz,
        }
    }
}

// ── EngineParams ─────────────────────────────────────────────────────────────

impl From<&valvemu_config::EngineCfg> for EngineParams {
    fn from(c: &valvemu_config::EngineCfg) -> Self {
        Self {
            adc_k1: c.adc_k1,
            adc_k2: c.adc_k2,
            map: AffineMap {
                scale: c.duty_scale,
                offset: c.duty_offset,
            },
        }
    }
}
