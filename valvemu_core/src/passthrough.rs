//! Engine-temperature passthrough: one analog input re-emitted as a duty
//! cycle in the sensor domain the ECU expects.
//!
//! Stateless per tick — no persistence, no debounce; the output always
//! reflects the most recent read.

use eyre::WrapErr;
use valvemu_traits::{AdcInput, PwmChannel};

use crate::config::EngineParams;
use crate::error::Result;
use crate::hw_error::map_hw_error;

pub struct EnginePassthrough<A: AdcInput, P: PwmChannel> {
    adc: A,
    out: P,
    params: EngineParams,
    last_c: f32,
}

impl<A: AdcInput, P: PwmChannel> EnginePassthrough<A, P> {
    pub fn new(adc: A, out: P, params: EngineParams) -> Self {
        Self {
            adc,
            out,
            params,
            last_c: 0.0,
        }
    }

    /// Read, translate, write. Returns the derived temperature.
    pub fn tick(&mut self) -> Result<f32> {
        let raw = self
            .adc
            .read()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("engine adc")?;
        let temp_c = (self.params.adc_k1 - f32::from(raw)) / self.params.adc_k2;
        let duty = self.params.map.duty(temp_c);
        self.out
            .set_duty(duty)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("engine output")?;
        self.last_c = temp_c;
        Ok(temp_c)
    }

    /// Temperature derived by the most recent tick.
    pub fn last_temperature(&self) -> f32 {
        self.last_c
    }
}
