#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration-table parsing for the valve emulator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The temperature table CSV loader enforces strict headers and the
//!   descending-threshold ordering the lookup depends on.
use serde::Deserialize;
use serde::de::Deserializer;

/// One row of the piecewise-linear temperature-to-duty table.
///
/// Rows must be stored in strictly descending `threshold_c` order; lookup
/// takes the first row whose threshold is at or below the input.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TableRow {
    pub threshold_c: f32,
    pub duty: u8,
    pub slope: f32,
}

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub open_in: u8,
    pub close_in: u8,
    pub pump_in: u8,
    pub power_sense: u8,
    pub position_out: u8,
    pub tank_out: u8,
    /// Optional third channel for the engine-temperature passthrough.
    pub engine_out: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegratorCfg {
    /// Valve travel rate in volts per second while a directional input is held.
    pub rate_v_per_s: f32,
    /// Lower clamp of the position domain (volts).
    pub min_v: f32,
    /// Upper clamp of the position domain (volts).
    pub max_v: f32,
    /// Positions below this report the Closed band.
    pub closed_below_v: f32,
    /// Positions above this report the Open band.
    pub open_above_v: f32,
    /// Affine volts-to-duty gain for the position output.
    pub duty_scale: f32,
    /// Affine volts-to-duty offset for the position output.
    pub duty_offset: f32,
}

impl Default for IntegratorCfg {
    fn default() -> Self {
        Self {
            rate_v_per_s: 0.8,
            min_v: 0.0,
            max_v: 5.0,
            closed_below_v: 0.5,
            open_above_v: 4.5,
            duty_scale: 51.0,
            duty_offset: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TankCfg {
    /// Clamp domain for the tracked tank temperature (degrees C).
    pub min_c: f32,
    pub max_c: f32,
    /// Temperature-to-duty table. Accepts either:
    /// - array of tables: [{ threshold_c = 85.0, duty = 0, slope = 0.0 }, ...]
    /// - array of triples: [[85.0, 0, 0.0], [60.0, 30, -1.2], ...]
    #[serde(deserialize_with = "de_table_rows")]
    pub table: Vec<TableRow>,
}

/// The table shipped with the emulator; matches the sensor curve the ECU
/// expects. Piecewise continuous by construction, saturating to full duty
/// below the coldest row.
pub fn default_table() -> Vec<TableRow> {
    vec![
        TableRow {
            threshold_c: 85.0,
            duty: 0,
            slope: 0.0,
        },
        TableRow {
            threshold_c: 60.0,
            duty: 30,
            slope: -1.2,
        },
        TableRow {
            threshold_c: 40.0,
            duty: 78,
            slope: -2.4,
        },
        TableRow {
            threshold_c: 20.0,
            duty: 140,
            slope: -3.1,
        },
        TableRow {
            threshold_c: 0.0,
            duty: 208,
            slope: -3.4,
        },
    ]
}

impl Default for TankCfg {
    fn default() -> Self {
        Self {
            min_c: 0.0,
            max_c: 99.0,
            table: default_table(),
        }
    }
}

/// Engine-temperature passthrough. The section is optional; without it the
/// third output channel is not driven.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct EngineCfg {
    /// ADC-to-degrees inverse transform: temp = (adc_k1 - raw) / adc_k2.
    pub adc_k1: f32,
    pub adc_k2: f32,
    /// Affine degrees-to-duty map for the passthrough output.
    pub duty_scale: f32,
    pub duty_offset: f32,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            adc_k1: 941.0,
            adc_k2: 8.2,
            duty_scale: 2.2,
            duty_offset: 10.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GuardCfg {
    /// Quiet window after a power-loss save before the trigger re-arms (ms).
    pub quiet_ms: u64,
    /// Poll interval of the power-sense monitor (ms).
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingCfg {
    /// Main loop rate in Hz.
    pub tick_hz: u32,
    /// Diagnostic snapshot rate in Hz. Must not exceed tick_hz.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    /// Path of the EEPROM image file (host backend).
    pub path: String,
    /// Image size in bytes; must hold the key byte plus the packed payload.
    pub size: usize,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            path: "valvemu_state.bin".to_string(),
            size: 16,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub integrator: IntegratorCfg,
    #[serde(default)]
    pub tank: TankCfg,
    /// Optional engine passthrough; omit the section to disable the channel.
    #[serde(default)]
    pub engine: Option<EngineCfg>,
    #[serde(default)]
    pub guard: GuardCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowToml {
    Triple((f32, u8, f32)),
    Table {
        threshold_c: f32,
        duty: u8,
        slope: f32,
    },
}

fn de_table_rows<'de, D>(deserializer: D) -> Result<Vec<TableRow>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<RowToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for r in items {
            match r {
                RowToml::Triple((threshold_c, duty, slope)) => out.push(TableRow {
                    threshold_c,
                    duty,
                    slope,
                }),
                RowToml::Table {
                    threshold_c,
                    duty,
                    slope,
                } => out.push(TableRow {
                    threshold_c,
                    duty,
                    slope,
                }),
            }
        }
    }
    Ok(out)
}

/// Validate a table slice: non-empty, finite, strictly descending thresholds.
pub fn validate_rows(rows: &[TableRow]) -> eyre::Result<()> {
    if rows.is_empty() {
        eyre::bail!("table must have at least one row");
    }
    for (i, r) in rows.iter().enumerate() {
        if !r.threshold_c.is_finite() {
            eyre::bail!("table row {i}: threshold_c must be finite");
        }
        if !r.slope.is_finite() {
            eyre::bail!("table row {i}: slope must be finite");
        }
    }
    for i in 1..rows.len() {
        if rows[i].threshold_c >= rows[i - 1].threshold_c {
            eyre::bail!(
                "table thresholds must be strictly descending (rows {} and {})",
                i - 1,
                i
            );
        }
    }
    Ok(())
}

/// Load a table overlay from CSV.
///
/// Expected headers:
/// threshold_c,duty,slope
///
/// Example:
/// threshold_c,duty,slope
/// 85.0,0,0.0
/// 60.0,30,-1.2
pub fn load_table_csv(path: &std::path::Path) -> eyre::Result<Vec<TableRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open table CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["threshold_c", "duty", "slope"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "table CSV must have headers 'threshold_c,duty,slope', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TableRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    validate_rows(&rows)?;
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Integrator
        if !(self.integrator.rate_v_per_s.is_finite() && self.integrator.rate_v_per_s > 0.0) {
            eyre::bail!("integrator.rate_v_per_s must be > 0");
        }
        if self.integrator.min_v >= self.integrator.max_v {
            eyre::bail!("integrator.min_v must be < integrator.max_v");
        }
        if self.integrator.closed_below_v < self.integrator.min_v {
            eyre::bail!("integrator.closed_below_v must be >= min_v");
        }
        if self.integrator.open_above_v > self.integrator.max_v {
            eyre::bail!("integrator.open_above_v must be <= max_v");
        }
        if self.integrator.closed_below_v >= self.integrator.open_above_v {
            eyre::bail!("integrator.closed_below_v must be < open_above_v");
        }
        if !self.integrator.duty_scale.is_finite() || !self.integrator.duty_offset.is_finite() {
            eyre::bail!("integrator duty map must be finite");
        }

        // Tank
        if self.tank.min_c >= self.tank.max_c {
            eyre::bail!("tank.min_c must be < tank.max_c");
        }
        validate_rows(&self.tank.table)?;

        // Engine passthrough
        if let Some(engine) = &self.engine {
            if !(engine.adc_k2.is_finite() && engine.adc_k2 != 0.0) {
                eyre::bail!("engine.adc_k2 must be finite and non-zero");
            }
            if !engine.adc_k1.is_finite() {
                eyre::bail!("engine.adc_k1 must be finite");
            }
            if !engine.duty_scale.is_finite() || !engine.duty_offset.is_finite() {
                eyre::bail!("engine duty map must be finite");
            }
            if self.pins.engine_out.is_none() {
                eyre::bail!("engine section present but pins.engine_out missing");
            }
        }

        // Guard
        if self.guard.quiet_ms == 0 {
            eyre::bail!("guard.quiet_ms must be >= 1");
        }
        if self.guard.poll_ms == 0 {
            eyre::bail!("guard.poll_ms must be >= 1");
        }

        // Timing
        if self.timing.tick_hz == 0 {
            eyre::bail!("timing.tick_hz must be > 0");
        }
        if self.timing.diag_hz == 0 {
            eyre::bail!("timing.diag_hz must be > 0");
        }
        if self.timing.diag_hz > self.timing.tick_hz {
            eyre::bail!("timing.diag_hz must not exceed timing.tick_hz");
        }

        // Storage: key byte + two f32 payload fields
        if self.storage.size < 9 {
            eyre::bail!("storage.size must be >= 9 bytes");
        }

        Ok(())
    }
}
