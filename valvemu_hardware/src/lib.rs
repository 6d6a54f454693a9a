//! Hardware backends for the valve emulator: simulated pins/ADC/PWM for
//! host runs and tests, a file-backed EEPROM image, and (feature-gated)
//! Raspberry Pi GPIO.

pub mod eeprom;
pub mod error;
#[cfg(feature = "hardware")]
pub mod gpio;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU64, Ordering};

use valvemu_traits::{AdcInput, DigitalInput, HwResult, PwmChannel};

/// Simulated digital input. The electrical level is shared through an
/// atomic handle so a test (or the sim harness) can drive the line while
/// the emulator owns the input.
pub struct SimSwitch {
    level_high: Arc<AtomicBool>,
    active_low: bool,
}

/// Driver side of a [`SimSwitch`]: sets the electrical level of the line.
#[derive(Clone)]
pub struct SimSwitchHandle {
    level_high: Arc<AtomicBool>,
}

impl SimSwitchHandle {
    pub fn set_high(&self, high: bool) {
        self.level_high.store(high, Ordering::Relaxed);
    }
}

impl SimSwitch {
    /// A released active-low input (pulled up, reads inactive).
    pub fn active_low() -> (Self, SimSwitchHandle) {
        let level_high = Arc::new(AtomicBool::new(true));
        (
            Self {
                level_high: level_high.clone(),
                active_low: true,
            },
            SimSwitchHandle { level_high },
        )
    }

    /// A released active-high input (reads inactive while low).
    pub fn active_high() -> (Self, SimSwitchHandle) {
        let level_high = Arc::new(AtomicBool::new(false));
        (
            Self {
                level_high: level_high.clone(),
                active_low: false,
            },
            SimSwitchHandle { level_high },
        )
    }
}

impl DigitalInput for SimSwitch {
    fn is_active(&mut self) -> HwResult<bool> {
        let high = self.level_high.load(Ordering::Relaxed);
        Ok(high != self.active_low)
    }
}

/// Convenience for a [`SimSwitchHandle`] on an active-low line: assert or
/// release the *logical* signal rather than the electrical level.
impl SimSwitchHandle {
    pub fn assert_active_low(&self, active: bool) {
        // Asserting an active-low line pulls it low.
        self.set_high(!active);
    }
}

/// Simulated ADC channel fed from an atomic.
pub struct SimAdc {
    raw: Arc<AtomicU16>,
}

#[derive(Clone)]
pub struct SimAdcHandle {
    raw: Arc<AtomicU16>,
}

impl SimAdcHandle {
    pub fn set_raw(&self, raw: u16) {
        self.raw.store(raw, Ordering::Relaxed);
    }
}

impl SimAdc {
    pub fn new(initial: u16) -> (Self, SimAdcHandle) {
        let raw = Arc::new(AtomicU16::new(initial));
        (Self { raw: raw.clone() }, SimAdcHandle { raw })
    }
}

impl AdcInput for SimAdc {
    fn read(&mut self) -> HwResult<u16> {
        Ok(self.raw.load(Ordering::Relaxed))
    }
}

/// Simulated PWM output recording the last duty and the number of writes,
/// observable through a cloneable handle.
pub struct SimPwm {
    duty: Arc<AtomicU8>,
    writes: Arc<AtomicU64>,
}

#[derive(Clone)]
pub struct SimPwmHandle {
    duty: Arc<AtomicU8>,
    writes: Arc<AtomicU64>,
}

impl SimPwmHandle {
    pub fn duty(&self) -> u8 {
        self.duty.load(Ordering::Relaxed)
    }
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl SimPwm {
    pub fn new() -> (Self, SimPwmHandle) {
        let duty = Arc::new(AtomicU8::new(0));
        let writes = Arc::new(AtomicU64::new(0));
        (
            Self {
                duty: duty.clone(),
                writes: writes.clone(),
            },
            SimPwmHandle { duty, writes },
        )
    }
}

impl PwmChannel for SimPwm {
    fn set_duty(&mut self, duty: u8) -> HwResult<()> {
        self.duty.store(duty, Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(duty, "sim pwm write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_switch_respects_polarity() {
        let (mut sw, handle) = SimSwitch::active_low();
        // Pulled up: inactive.
        assert!(!sw.is_active().unwrap());
        handle.set_high(false);
        assert!(sw.is_active().unwrap());
        handle.assert_active_low(false);
        assert!(!sw.is_active().unwrap());
    }

    #[test]
    fn sim_pwm_counts_writes() {
        let (mut pwm, handle) = SimPwm::new();
        pwm.set_duty(42).unwrap();
        pwm.set_duty(42).unwrap();
        assert_eq!(handle.duty(), 42);
        assert_eq!(handle.writes(), 2);
    }
}
