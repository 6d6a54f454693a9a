//! Emulator assembly: boxed hardware behind a builder, boot-time restore,
//! and the per-tick orchestration of all channels.
//!
//! Every part is an explicit owned object constructed once at startup; the
//! only cross-context state is the guard arm flag and the snapshot atomics.

use std::sync::Arc;
use std::time::Instant;

use eyre::WrapErr;
use valvemu_traits::{AdcInput, Clock, DigitalInput, MonotonicClock, NvStorage, PwmChannel};

use crate::calib::{AffineMap, InterpTable};
use crate::config::{EngineParams, GuardCfg, IntegratorCfg, TankCfg, TimingCfg};
use crate::diag::{DiagnosticSink, Snapshot};
use crate::error::{BuildError, Result};
use crate::guard::{PowerGuard, SharedSnapshot};
use crate::hw_error::map_hw_error;
use crate::monitor::{GuardEvent, PowerMonitor};
use crate::passthrough::EnginePassthrough;
use crate::position::{PositionIntegrator, ValveBand};
use crate::state::{StateStore, TrackedState};
use crate::tank::TankChannel;

type BoxedInput = Box<dyn DigitalInput + Send>;
type BoxedAdc = Box<dyn AdcInput + Send>;
type BoxedPwm = Box<dyn PwmChannel + Send>;
type BoxedNv = Box<dyn NvStorage + Send>;

/// Outcome of one emulator step.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub position_v: f32,
    pub band: ValveBand,
    /// True when the position changed this tick.
    pub moved: bool,
    pub tank_c: f32,
    /// Engine temperature derived this tick; None without the passthrough.
    pub engine_c: Option<f32>,
    pub power_active: bool,
    /// True when the power-loss trigger re-armed this tick.
    pub rearmed: bool,
}

pub struct Emulator {
    integrator: PositionIntegrator<BoxedInput, BoxedInput, BoxedPwm>,
    tank: TankChannel<BoxedPwm>,
    passthrough: Option<EnginePassthrough<BoxedAdc, BoxedPwm>>,
    pump_in: Option<BoxedInput>,
    guard: Arc<PowerGuard>,
    snapshot: Arc<SharedSnapshot>,
    monitor: PowerMonitor,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    diag: Option<Box<dyn DiagnosticSink + Send>>,
    diag_period_ms: u64,
    last_diag_ms: Option<u64>,
}

impl Emulator {
    /// Start building an emulator.
    pub fn builder() -> EmulatorBuilder {
        EmulatorBuilder::default()
    }

    /// One cooperative-loop iteration: integrate position, flush the tank
    /// output, run the passthrough, drain guard events, and service the
    /// power-loss guard. Diagnostics are emitted at their own (slower) rate.
    pub fn step(&mut self) -> Result<Tick> {
        let pos = self.integrator.tick()?;
        if pos.moved {
            self.snapshot.publish_position(pos.position_v);
        }

        self.tank.flush()?;

        let engine_c = match self.passthrough.as_mut() {
            Some(p) => Some(p.tick()?),
            None => None,
        };

        let pump = match self.pump_in.as_mut() {
            Some(p) => p
                .is_active()
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err("pump input")?,
            None => false,
        };

        for ev in self.monitor.try_events() {
            match ev {
                GuardEvent::Saved { at_ms } => {
                    tracing::info!(at_ms, "snapshot persisted on power-loss edge");
                }
                GuardEvent::Suppressed { at_ms } => {
                    tracing::debug!(at_ms, "bounced power edge suppressed");
                }
                GuardEvent::SaveFailed { at_ms, error } => {
                    tracing::error!(at_ms, error = %error, "power-loss save failed");
                }
            }
        }

        let now = self.clock.ms_since(self.epoch);
        let rearmed = self.guard.service(now);
        if rearmed {
            tracing::debug!(now, "power-loss trigger re-armed");
        }

        let tick = Tick {
            position_v: pos.position_v,
            band: self.integrator.band(),
            moved: pos.moved,
            tank_c: self.tank.temperature(),
            engine_c,
            power_active: self.monitor.power_active(),
            rearmed,
        };

        if let Some(sink) = self.diag.as_mut() {
            let due = self
                .last_diag_ms
                .is_none_or(|last| now.saturating_sub(last) >= self.diag_period_ms);
            if due {
                self.last_diag_ms = Some(now);
                sink.emit(&Snapshot {
                    open: pos.open_active,
                    close: pos.close_active,
                    pump,
                    power: tick.power_active,
                    position_v: tick.position_v,
                    tank_c: tick.tank_c,
                    engine_c: engine_c.unwrap_or(0.0),
                });
            }
        }

        Ok(tick)
    }

    /// External setter for the tracked tank temperature.
    pub fn set_tank_temperature(&mut self, c: f32) {
        self.tank.set_temperature(c);
        self.snapshot.publish_tank(self.tank.temperature());
    }

    pub fn position(&self) -> f32 {
        self.integrator.position()
    }

    pub fn band(&self) -> ValveBand {
        self.integrator.band()
    }

    pub fn tank_temperature(&self) -> f32 {
        self.tank.temperature()
    }

    /// Number of power-loss saves performed since boot.
    pub fn saves(&self) -> u64 {
        self.monitor.saves()
    }

    pub fn guard(&self) -> &Arc<PowerGuard> {
        &self.guard
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }
}

/// Builder for `Emulator`. All fields are validated in `build()`; missing
/// required hardware surfaces as a typed `BuildError`.
#[derive(Default)]
pub struct EmulatorBuilder {
    open_in: Option<BoxedInput>,
    close_in: Option<BoxedInput>,
    pump_in: Option<BoxedInput>,
    power_in: Option<BoxedInput>,
    position_out: Option<BoxedPwm>,
    tank_out: Option<BoxedPwm>,
    engine: Option<(BoxedAdc, BoxedPwm, EngineParams)>,
    storage: Option<BoxedNv>,
    integrator: Option<IntegratorCfg>,
    tank: Option<TankCfg>,
    guard: Option<GuardCfg>,
    timing: Option<TimingCfg>,
    position_map: Option<AffineMap>,
    table: Option<InterpTable>,
    diag: Option<Box<dyn DiagnosticSink + Send>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
}

impl EmulatorBuilder {
    pub fn with_open_input(mut self, input: impl DigitalInput + Send + 'static) -> Self {
        self.open_in = Some(Box::new(input));
        self
    }
    pub fn with_close_input(mut self, input: impl DigitalInput + Send + 'static) -> Self {
        self.close_in = Some(Box::new(input));
        self
    }
    pub fn with_pump_input(mut self, input: impl DigitalInput + Send + 'static) -> Self {
        self.pump_in = Some(Box::new(input));
        self
    }
    pub fn with_power_input(mut self, input: impl DigitalInput + Send + 'static) -> Self {
        self.power_in = Some(Box::new(input));
        self
    }
    pub fn with_position_output(mut self, out: impl PwmChannel + Send + 'static) -> Self {
        self.position_out = Some(Box::new(out));
        self
    }
    pub fn with_tank_output(mut self, out: impl PwmChannel + Send + 'static) -> Self {
        self.tank_out = Some(Box::new(out));
        self
    }
    pub fn with_engine_passthrough(
        mut self,
        adc: impl AdcInput + Send + 'static,
        out: impl PwmChannel + Send + 'static,
        params: EngineParams,
    ) -> Self {
        self.engine = Some((Box::new(adc), Box::new(out), params));
        self
    }
    pub fn with_storage(mut self, nv: impl NvStorage + Send + 'static) -> Self {
        self.storage = Some(Box::new(nv));
        self
    }
    pub fn with_integrator(mut self, cfg: IntegratorCfg) -> Self {
        self.integrator = Some(cfg);
        self
    }
    pub fn with_tank(mut self, cfg: TankCfg) -> Self {
        self.tank = Some(cfg);
        self
    }
    pub fn with_guard(mut self, cfg: GuardCfg) -> Self {
        self.guard = Some(cfg);
        self
    }
    pub fn with_timing(mut self, cfg: TimingCfg) -> Self {
        self.timing = Some(cfg);
        self
    }
    pub fn with_position_map(mut self, map: AffineMap) -> Self {
        self.position_map = Some(map);
        self
    }
    pub fn with_table(mut self, table: InterpTable) -> Self {
        self.table = Some(table);
        self
    }
    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + Send + 'static) -> Self {
        self.diag = Some(Box::new(sink));
        self
    }
    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate, restore persisted state (or establish defaults), spawn the
    /// power monitor, and assemble the emulator.
    pub fn build(self) -> Result<Emulator> {
        let open_in = self
            .open_in
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOpenInput))?;
        let close_in = self
            .close_in
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCloseInput))?;
        let power_in = self
            .power_in
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPowerInput))?;
        let position_out = self
            .position_out
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPositionOutput))?;
        let tank_out = self
            .tank_out
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTankOutput))?;
        let storage = self
            .storage
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStorage))?;
        let table = self
            .table
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTable))?;

        let integrator_cfg = self.integrator.unwrap_or_default();
        let tank_cfg = self.tank.unwrap_or_default();
        let guard_cfg = self.guard.unwrap_or_default();
        let timing_cfg = self.timing.unwrap_or_default();
        let position_map = self.position_map.unwrap_or(AffineMap {
            scale: 51.0,
            offset: 0.0,
        });

        // ── Validation ───────────────────────────────────────────────────────
        if !(integrator_cfg.rate_v_per_s.is_finite() && integrator_cfg.rate_v_per_s > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "integrator rate must be > 0",
            )));
        }
        if integrator_cfg.min_v >= integrator_cfg.max_v {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "integrator domain is empty",
            )));
        }
        if integrator_cfg.closed_below_v >= integrator_cfg.open_above_v {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "band thresholds must satisfy closed_below_v < open_above_v",
            )));
        }
        if tank_cfg.min_c >= tank_cfg.max_c {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "tank domain is empty",
            )));
        }
        if guard_cfg.quiet_ms == 0 || guard_cfg.poll_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "guard windows must be >= 1 ms",
            )));
        }
        if timing_cfg.tick_hz == 0 || timing_cfg.diag_hz == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "timing rates must be > 0",
            )));
        }
        if timing_cfg.diag_hz > timing_cfg.tick_hz {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "diag rate must not exceed tick rate",
            )));
        }

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();

        // ── Boot: restore or establish the persisted record ──────────────────
        let mut store = StateStore::new(storage);
        let state = match store.restore()? {
            Some(mut s) => {
                s.position_v = s.position_v.clamp(integrator_cfg.min_v, integrator_cfg.max_v);
                s.tank_c = s.tank_c.clamp(tank_cfg.min_c, tank_cfg.max_c);
                tracing::info!(
                    position_v = s.position_v,
                    tank_c = s.tank_c,
                    "persisted state restored"
                );
                s
            }
            None => {
                let d = TrackedState::default();
                store.save(&d).wrap_err("first-boot default save")?;
                tracing::info!("storage uninitialized, defaults established");
                d
            }
        };

        let snapshot = Arc::new(SharedSnapshot::new(state));
        let guard = Arc::new(PowerGuard::new(guard_cfg.quiet_ms));
        let monitor = PowerMonitor::spawn(
            power_in,
            store,
            guard.clone(),
            snapshot.clone(),
            guard_cfg.poll_ms,
            clock.clone(),
            epoch,
        );

        let integrator = PositionIntegrator::new(
            open_in,
            close_in,
            position_out,
            integrator_cfg,
            position_map,
            clock.clone(),
            epoch,
            state.position_v,
        );
        let tank = TankChannel::new(tank_out, table, tank_cfg, state.tank_c);
        let passthrough = self
            .engine
            .map(|(adc, out, params)| EnginePassthrough::new(adc, out, params));

        Ok(Emulator {
            integrator,
            tank,
            passthrough,
            pump_in: self.pump_in,
            guard,
            snapshot,
            monitor,
            clock,
            epoch,
            diag: self.diag,
            diag_period_ms: crate::util::period_ms(timing_cfg.diag_hz),
            last_diag_ms: None,
        })
    }
}
