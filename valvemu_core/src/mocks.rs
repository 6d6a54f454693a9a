//! Test and helper mocks for valvemu_core.

use std::sync::{Arc, Mutex};

use valvemu_traits::{HwResult, NvStorage, PwmChannel};

/// In-memory byte store. Clones share the same backing buffer, so a test
/// can keep a handle while the store (or the power monitor that owns it)
/// holds another.
#[derive(Clone)]
pub struct MemStorage {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemStorage {
    pub fn new(size: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0u8; size])),
        }
    }

    /// Copy of the full backing buffer.
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Write bytes directly, bypassing the NvStorage trait (for fixtures).
    pub fn poke(&self, offset: usize, bytes: &[u8]) {
        if let Ok(mut g) = self.data.lock() {
            if offset + bytes.len() <= g.len() {
                g[offset..offset + bytes.len()].copy_from_slice(bytes);
            }
        }
    }
}

impl NvStorage for MemStorage {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> HwResult<()> {
        let g = self
            .data
            .lock()
            .map_err(|_| std::io::Error::other("storage lock poisoned"))?;
        let end = offset
            .checked_add(buf.len())
            .filter(|&e| e <= g.len())
            .ok_or_else(|| std::io::Error::other("storage read out of bounds"))?;
        buf.copy_from_slice(&g[offset..end]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> HwResult<()> {
        let mut g = self
            .data
            .lock()
            .map_err(|_| std::io::Error::other("storage lock poisoned"))?;
        let end = offset
            .checked_add(data.len())
            .filter(|&e| e <= g.len())
            .ok_or_else(|| std::io::Error::other("storage write out of bounds"))?;
        g[offset..end].copy_from_slice(data);
        Ok(())
    }
}

/// A PWM channel that accepts every write and remembers nothing.
pub struct NoopPwm;

impl PwmChannel for NoopPwm {
    fn set_duty(&mut self, _duty: u8) -> HwResult<()> {
        Ok(())
    }
}
