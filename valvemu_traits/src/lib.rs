pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Boundary error type shared by all hardware traits.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A single digital input line, already corrected for polarity.
///
/// Implementations own the pin and its active-low/active-high convention;
/// callers only ever see "active" or "not active".
pub trait DigitalInput {
    fn is_active(&mut self) -> HwResult<bool>;
}

/// One analog input channel returning raw converter counts.
pub trait AdcInput {
    fn read(&mut self) -> HwResult<u16>;
}

/// One 8-bit PWM output channel.
///
/// `set_duty` is idempotent but not free on real hardware; callers are
/// expected to skip redundant writes themselves.
pub trait PwmChannel {
    fn set_duty(&mut self, duty: u8) -> HwResult<()>;
}

/// Byte-addressable non-volatile storage (EEPROM-style).
///
/// Writes are synchronous and blocking by construction; the primitive has
/// no fault signal beyond the I/O error path of the host backend.
pub trait NvStorage {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> HwResult<()>;
    fn write(&mut self, offset: usize, data: &[u8]) -> HwResult<()>;
}

// Boxed trait objects are first-class backends.

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn is_active(&mut self) -> HwResult<bool> {
        (**self).is_active()
    }
}

impl<T: AdcInput + ?Sized> AdcInput for Box<T> {
    fn read(&mut self) -> HwResult<u16> {
        (**self).read()
    }
}

impl<T: PwmChannel + ?Sized> PwmChannel for Box<T> {
    fn set_duty(&mut self, duty: u8) -> HwResult<()> {
        (**self).set_duty(duty)
    }
}

impl<T: NvStorage + ?Sized> NvStorage for Box<T> {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> HwResult<()> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> HwResult<()> {
        (**self).write(offset, data)
    }
}
