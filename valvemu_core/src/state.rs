//! The persisted working record and its non-volatile store.
//!
//! Layout on storage: byte 0 is the validity key, bytes 1..9 the packed
//! payload (two little-endian f32s). Any key value other than `RECORD_KEY`
//! means "uninitialized", including blank or foreign storage.

use eyre::WrapErr;
use valvemu_traits::NvStorage;

use crate::error::Result;
use crate::hw_error::map_hw_error;

/// Validity key for the stored record. Bump whenever the payload layout
/// changes so old and new layouts never alias.
pub const RECORD_KEY: u8 = 0xB7;

/// Packed payload length: position_v + tank_c.
pub const PAYLOAD_LEN: usize = 8;

/// The tracked physical quantities of the emulated subsystem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedState {
    /// Valve shaft position in volts-equivalent units.
    pub position_v: f32,
    /// Coolant tank temperature in degrees C.
    pub tank_c: f32,
}

impl Default for TrackedState {
    fn default() -> Self {
        // The compiled-in boot values of the original firmware.
        Self {
            position_v: 4.2,
            tank_c: 21.0,
        }
    }
}

/// Save/restore of the single fixed-size state record.
pub struct StateStore<N: NvStorage> {
    nv: N,
}

impl<N: NvStorage> StateStore<N> {
    pub fn new(nv: N) -> Self {
        Self { nv }
    }

    /// Persist the record. The payload is written before the key so a power
    /// loss mid-write leaves a mismatched key, never a valid-looking
    /// half-record.
    pub fn save(&mut self, s: &TrackedState) -> Result<()> {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[..4].copy_from_slice(&s.position_v.to_le_bytes());
        payload[4..].copy_from_slice(&s.tank_c.to_le_bytes());
        self.nv
            .write(1, &payload)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("state payload write")?;
        self.nv
            .write(0, &[RECORD_KEY])
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("state key write")?;
        tracing::debug!(position_v = s.position_v, tank_c = s.tank_c, "state saved");
        Ok(())
    }

    /// Read the record back. Returns `None` when the validity key does not
    /// match; the caller is expected to save defaults once in that case.
    pub fn restore(&mut self) -> Result<Option<TrackedState>> {
        let mut key = [0u8; 1];
        self.nv
            .read(0, &mut key)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("state key read")?;
        if key[0] != RECORD_KEY {
            tracing::debug!(found = key[0], expected = RECORD_KEY, "storage uninitialized");
            return Ok(None);
        }
        let mut payload = [0u8; PAYLOAD_LEN];
        self.nv
            .read(1, &mut payload)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("state payload read")?;
        let position_v = f32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let tank_c = f32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
        Ok(Some(TrackedState { position_v, tank_c }))
    }
}
