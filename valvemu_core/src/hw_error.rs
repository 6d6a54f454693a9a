//! Maps `Box<dyn Error>` from trait boundaries to typed `EmuError`.
//!
//! The traits in `valvemu_traits` use `Box<dyn Error + Send + Sync>` for
//! maximum flexibility; this module converts those to our typed error enum,
//! with an optional feature-gated path for `valvemu_hardware::HwError`
//! downcasting.

use crate::error::EmuError;

/// Map a trait-boundary error to a typed `EmuError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> EmuError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<valvemu_hardware::error::HwError>() {
            return match hw {
                valvemu_hardware::error::HwError::Io(io) => EmuError::Storage(io.to_string()),
                valvemu_hardware::error::HwError::Bounds { offset, len } => EmuError::Storage(
                    format!("access out of bounds: offset {offset}, len {len}"),
                ),
                other => EmuError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("storage") || lower.contains("eeprom") || lower.contains("bounds") {
        EmuError::Storage(s)
    } else {
        EmuError::Hardware(s)
    }
}
