//! Config loading, hardware assembly, and the run/self-check/dump commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::WrapErr;

use valvemu_config::Config;
use valvemu_core::emulator::EmulatorBuilder;
use valvemu_core::{Emulator, StateStore, TrackedState};
use valvemu_hardware::eeprom::FileStore;

use crate::cli::{DiagMode, JSON_MODE};
use crate::diag_fmt::{BinarySink, JsonSink, LineSink};

/// Built-in configuration used when no config file is present. Pin numbers
/// only matter on the GPIO backend.
const DEFAULT_CONFIG: &str = r#"
[pins]
open_in = 2
close_in = 3
pump_in = 4
power_sense = 5
position_out = 9
tank_out = 10
engine_out = 11

[engine]
"#;

pub fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = if path.exists() {
        std::fs::read_to_string(path)
            .wrap_err_with(|| format!("read config {}", path.display()))?
    } else {
        tracing::warn!(path = %path.display(), "config not found, using built-in defaults");
        DEFAULT_CONFIG.to_string()
    };
    let cfg = valvemu_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the temperature table: CSV overlay wins over the config rows.
pub fn load_table(
    cfg: &Config,
    overlay: Option<&PathBuf>,
) -> eyre::Result<valvemu_core::InterpTable> {
    let rows = match overlay {
        Some(path) => valvemu_config::load_table_csv(path)?,
        None => cfg.tank.table.clone(),
    };
    valvemu_core::table_from_rows(&rows)
}

/// Driver-side handles of the simulated bench: the test rig's switches and
/// the engine sender.
pub struct SimHandles {
    pub open: valvemu_hardware::SimSwitchHandle,
    pub close: valvemu_hardware::SimSwitchHandle,
    pub pump: valvemu_hardware::SimSwitchHandle,
    pub power: valvemu_hardware::SimSwitchHandle,
    pub engine_adc: Option<valvemu_hardware::SimAdcHandle>,
    pub position_out: valvemu_hardware::SimPwmHandle,
    pub tank_out: valvemu_hardware::SimPwmHandle,
}

/// Wire the simulated backends into a builder.
pub fn assemble_sim(cfg: &Config, builder: EmulatorBuilder) -> (EmulatorBuilder, SimHandles) {
    use valvemu_hardware::{SimAdc, SimPwm, SimSwitch};

    let (open_in, open) = SimSwitch::active_low();
    let (close_in, close) = SimSwitch::active_low();
    let (pump_in, pump) = SimSwitch::active_low();
    let (power_in, power) = SimSwitch::active_high();
    let (position_pwm, position_out) = SimPwm::new();
    let (tank_pwm, tank_out) = SimPwm::new();

    let mut builder = builder
        .with_open_input(open_in)
        .with_close_input(close_in)
        .with_pump_input(pump_in)
        .with_power_input(power_in)
        .with_position_output(position_pwm)
        .with_tank_output(tank_pwm);

    let mut engine_adc = None;
    if let Some(engine) = &cfg.engine {
        // Default raw reading corresponds to a warm engine.
        let (adc, adc_handle) = SimAdc::new(500);
        let (engine_pwm, _engine_out) = SimPwm::new();
        builder = builder.with_engine_passthrough(adc, engine_pwm, engine.into());
        engine_adc = Some(adc_handle);
    }

    (
        builder,
        SimHandles {
            open,
            close,
            pump,
            power,
            engine_adc,
            position_out,
            tank_out,
        },
    )
}

#[cfg(feature = "hardware")]
/// Wire the Raspberry Pi GPIO backends into a builder.
pub fn assemble_gpio(cfg: &Config, builder: EmulatorBuilder) -> eyre::Result<EmulatorBuilder> {
    use valvemu_hardware::gpio::{GpioPwm, GpioSwitch};

    let mut builder = builder
        .with_open_input(GpioSwitch::active_low(cfg.pins.open_in)?)
        .with_close_input(GpioSwitch::active_low(cfg.pins.close_in)?)
        .with_pump_input(GpioSwitch::active_low(cfg.pins.pump_in)?)
        .with_power_input(GpioSwitch::active_low(cfg.pins.power_sense)?)
        .with_position_output(GpioPwm::new(cfg.pins.position_out)?)
        .with_tank_output(GpioPwm::new(cfg.pins.tank_out)?);
    if let (Some(engine), Some(pin)) = (&cfg.engine, cfg.pins.engine_out) {
        // The passthrough source ADC is board-specific; the GPIO backend
        // reads it through the same trait the sim uses.
        let adc = valvemu_hardware::SimAdc::new(500).0;
        builder = builder.with_engine_passthrough(adc, GpioPwm::new(pin)?, engine.into());
    }
    Ok(builder)
}

fn builder_from_config(cfg: &Config, table: valvemu_core::InterpTable) -> EmulatorBuilder {
    Emulator::builder()
        .with_integrator((&cfg.integrator).into())
        .with_position_map((&cfg.integrator).into())
        .with_tank((&cfg.tank).into())
        .with_guard((&cfg.guard).into())
        .with_timing((&cfg.timing).into())
        .with_table(table)
}

fn with_diag(builder: EmulatorBuilder, mode: DiagMode) -> EmulatorBuilder {
    match mode {
        DiagMode::Line => builder.with_diagnostics(LineSink::stdout()),
        DiagMode::Json => builder.with_diagnostics(JsonSink::stdout()),
        DiagMode::Binary => builder.with_diagnostics(BinarySink::stdout()),
        DiagMode::Off => builder,
    }
}

/// Scripted bench rig for `--exercise`: a 4 s cycle of close / idle / open /
/// idle, with the pump running during the close phase and the tank
/// temperature drifting toward the engine reading while it does.
struct Exercise {
    start: Instant,
    last: Instant,
}

impl Exercise {
    fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now }
    }

    fn drive(&mut self, handles: &SimHandles, emu: &mut Emulator, engine_c: f32) {
        let phase_ms = self.start.elapsed().as_millis() as u64 % 4_000;
        let closing = phase_ms < 1_200;
        let opening = (2_000..3_200).contains(&phase_ms);
        handles.close.assert_active_low(closing);
        handles.open.assert_active_low(opening);
        handles.pump.assert_active_low(closing);

        let dt_s = self.last.elapsed().as_secs_f32();
        self.last = Instant::now();
        let target_c = if closing { engine_c } else { 21.0 };
        let tank = emu.tank_temperature();
        // First-order drift, ~5 s time constant.
        emu.set_tank_temperature(tank + (target_c - tank) * (dt_s * 0.2).min(1.0));
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run_emulator(
    cfg: &Config,
    table: valvemu_core::InterpTable,
    ticks: Option<u64>,
    state_file: Option<PathBuf>,
    diag: DiagMode,
    exercise: bool,
    stats: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let storage_path = state_file.unwrap_or_else(|| PathBuf::from(&cfg.storage.path));
    let storage = FileStore::open(&storage_path, cfg.storage.size)?;

    let builder = with_diag(builder_from_config(cfg, table), diag);

    #[cfg(feature = "hardware")]
    let (mut emu, sim_handles) = {
        if exercise {
            tracing::warn!("--exercise is a sim feature; ignored on the GPIO backend");
        }
        let builder = assemble_gpio(cfg, builder)?.with_storage(storage);
        (builder.build()?, None::<SimHandles>)
    };
    #[cfg(not(feature = "hardware"))]
    let (mut emu, sim_handles) = {
        let (builder, handles) = assemble_sim(cfg, builder);
        (builder.with_storage(storage).build()?, Some(handles))
    };

    let tick_hz = cfg.timing.tick_hz;
    let stats_out = if exercise || stats {
        run_scripted(
            &mut emu,
            tick_hz,
            &shutdown,
            ticks,
            sim_handles.filter(|_| exercise),
            stats,
        )?
    } else {
        valvemu_core::run(&mut emu, tick_hz, &shutdown, ticks)?
    };

    let summary = serde_json::json!({
        "ticks": stats_out.ticks,
        "saves": stats_out.saves,
        "rearms": stats_out.rearms,
        "position_v": emu.position(),
        "tank_c": emu.tank_temperature(),
        "state_file": storage_path.display().to_string(),
    });
    if JSON_MODE.get().copied().unwrap_or(false) {
        println!("{summary}");
    } else {
        println!(
            "run complete: {} ticks, {} power-loss saves, position {:.2} V, tank {:.1} C",
            stats_out.ticks,
            stats_out.saves,
            emu.position(),
            emu.tank_temperature(),
        );
    }
    Ok(())
}

/// Hand-rolled loop used when the sim script or latency stats are wanted.
fn run_scripted(
    emu: &mut Emulator,
    tick_hz: u32,
    shutdown: &AtomicBool,
    max_ticks: Option<u64>,
    handles: Option<SimHandles>,
    stats: bool,
) -> eyre::Result<valvemu_core::LoopStats> {
    let period_us = valvemu_core::util::period_us(tick_hz);
    let mut loop_stats = valvemu_core::LoopStats::default();
    let mut latencies: Vec<u64> = Vec::new();
    let mut missed_deadlines = 0usize;
    let mut script = Exercise::new();
    let mut engine_c = 21.0f32;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        if let Some(max) = max_ticks {
            if loop_stats.ticks >= max {
                break;
            }
        }

        if let Some(h) = &handles {
            script.drive(h, emu, engine_c);
        }

        let t_start = Instant::now();
        let tick = emu.step()?;
        if stats {
            let latency = t_start.elapsed().as_micros() as u64;
            if latency > period_us {
                missed_deadlines += 1;
            }
            latencies.push(latency);
        }

        loop_stats.ticks += 1;
        if tick.rearmed {
            loop_stats.rearms += 1;
        }
        if let Some(c) = tick.engine_c {
            engine_c = c;
        }

        std::thread::sleep(Duration::from_micros(period_us));
    }

    loop_stats.saves = emu.saves();
    if stats && !latencies.is_empty() {
        print_stats(&latencies, missed_deadlines, period_us);
    }
    Ok(loop_stats)
}

/// Print latency/jitter stats to stderr.
fn print_stats(latencies: &[u64], missed_deadlines: usize, period_us: u64) {
    let min = *latencies.iter().min().unwrap_or(&0);
    let max = *latencies.iter().max().unwrap_or(&0);
    let avg = latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;
    eprintln!("\n--- Loop stats ---");
    eprintln!("Ticks: {}", latencies.len());
    eprintln!("Period (us): {period_us}");
    eprintln!("Step latency min/avg/max (us): {min} / {avg:.1} / {max}");
    eprintln!("Missed deadlines (> period): {missed_deadlines}");
    eprintln!("------------------\n");
}

/// Quick health check: assemble the sim stack against throwaway storage,
/// tick it, and verify one persisted round-trip.
pub fn self_check(cfg: &Config, table: valvemu_core::InterpTable) -> eyre::Result<()> {
    use valvemu_core::mocks::MemStorage;

    let nv = MemStorage::new(cfg.storage.size);
    let (builder, handles) = assemble_sim(cfg, builder_from_config(cfg, table));
    let mut emu = builder.with_storage(nv.clone()).build()?;
    for _ in 0..3 {
        emu.step()?;
    }

    // Power-loss edge must produce exactly one save.
    handles.power.set_high(true);
    let deadline = Instant::now() + Duration::from_secs(2);
    while emu.saves() == 0 {
        if Instant::now() >= deadline {
            eyre::bail!("self-check: power-loss save did not happen");
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    let restored = StateStore::new(nv)
        .restore()?
        .ok_or_else(|| eyre::eyre!("self-check: record missing after save"))?;
    if restored != TrackedState::default() {
        eyre::bail!("self-check: restored record does not match boot state");
    }

    println!("self-check: ok");
    Ok(())
}

/// Print the record currently stored in the EEPROM image.
pub fn dump_state(cfg: &Config, state_file: Option<PathBuf>) -> eyre::Result<()> {
    let path = state_file.unwrap_or_else(|| PathBuf::from(&cfg.storage.path));
    let storage = FileStore::open(&path, cfg.storage.size)?;
    let mut store = StateStore::new(storage);
    match store.restore()? {
        Some(s) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!(
                    "{}",
                    serde_json::json!({
                        "position_v": s.position_v,
                        "tank_c": s.tank_c,
                    })
                );
            } else {
                println!("position_v = {:.3} V", s.position_v);
                println!("tank_c = {:.1} C", s.tank_c);
            }
        }
        None => println!("storage is uninitialized (validity key mismatch)"),
    }
    Ok(())
}
