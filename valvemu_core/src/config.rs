//! Runtime configuration types for the emulator engine.
//!
//! These are the structs consumed by the core components. They are separate
//! from the TOML-deserialized schema in `valvemu_config`; see `conversions`
//! for the bridge.

/// Position integrator configuration.
#[derive(Debug, Clone, Copy)]
pub struct IntegratorCfg {
    /// Valve travel rate in volts per second while a directional input is held.
    pub rate_v_per_s: f32,
    /// Lower clamp of the position domain (volts).
    pub min_v: f32,
    /// Upper clamp of the position domain (volts).
    pub max_v: f32,
    /// Positions below this classify as Closed.
    pub closed_below_v: f32,
    /// Positions above this classify as Open.
    pub open_above_v: f32,
}

impl Default for IntegratorCfg {
    fn default() -> Self {
        Self {
            rate_v_per_s: 0.8,
            min_v: 0.0,
            max_v: 5.0,
            closed_below_v: 0.5,
            open_above_v: 4.5,
        }
    }
}

/// Tank-temperature channel configuration (clamp domain only; the duty
/// table is carried separately as an `InterpTable`).
#[derive(Debug, Clone, Copy)]
pub struct TankCfg {
    pub min_c: f32,
    pub max_c: f32,
}

impl Default for TankCfg {
    fn default() -> Self {
        Self {
            min_c: 0.0,
            max_c: 99.0,
        }
    }
}

/// Power-loss guard configuration.
#[derive(Debug, Clone, Copy)]
pub struct GuardCfg {
    /// Quiet window after a save before the trigger re-arms (ms).
    pub quiet_ms: u64,
    /// Poll interval of the power-sense monitor thread (ms).
    pub poll_ms: u64,
}

impl Default for GuardCfg {
    fn default() -> Self {
        Self {
            quiet_ms: 50,
            poll_ms: 1,
        }
    }
}

/// Loop timing.
#[derive(Debug, Clone, Copy)]
pub struct TimingCfg {
    /// Main loop rate in Hz.
    pub tick_hz: u32,
    /// Diagnostic snapshot rate in Hz.
    pub diag_hz: u32,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            tick_hz: 200,
            diag_hz: 10,
        }
    }
}

/// Engine-temperature passthrough parameters.
///
/// The inverse ADC transform is `temp_c = (adc_k1 - raw) / adc_k2`.
#[derive(Debug, Clone, Copy)]
pub struct EngineParams {
    pub adc_k1: f32,
    pub adc_k2: f32,
    pub map: crate::calib::AffineMap,
}
