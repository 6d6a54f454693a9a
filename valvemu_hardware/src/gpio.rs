//! Raspberry Pi GPIO backends (feature `hardware`, Linux only).

use rppal::gpio::{Gpio, InputPin, OutputPin};
use valvemu_traits::{DigitalInput, HwResult, PwmChannel};

use crate::error::HwError;

/// Software PWM carrier frequency. The ECU low-pass filters the line, so
/// anything well above the filter corner works.
const PWM_HZ: f64 = 490.0;

/// Pulled-up input pin read as an active-low signal.
pub struct GpioSwitch {
    pin: InputPin,
    active_low: bool,
}

impl GpioSwitch {
    pub fn active_low(bcm_pin: u8) -> crate::error::Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input_pullup();
        Ok(Self {
            pin,
            active_low: true,
        })
    }
}

impl DigitalInput for GpioSwitch {
    fn is_active(&mut self) -> HwResult<bool> {
        let low = self.pin.is_low();
        Ok(low == self.active_low)
    }
}

/// Output pin driven with software PWM.
pub struct GpioPwm {
    pin: OutputPin,
}

impl GpioPwm {
    pub fn new(bcm_pin: u8) -> crate::error::Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_output();
        Ok(Self { pin })
    }
}

impl PwmChannel for GpioPwm {
    fn set_duty(&mut self, duty: u8) -> HwResult<()> {
        let cycle = f64::from(duty) / 255.0;
        self.pin
            .set_pwm_frequency(PWM_HZ, cycle)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(())
    }
}
