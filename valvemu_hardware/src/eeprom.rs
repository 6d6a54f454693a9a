//! File-backed EEPROM image.
//!
//! The host stand-in for the device's byte-addressable non-volatile
//! storage: a fixed-size image file, updated read-modify-write with an
//! atomic temp-file replace so a killed process never leaves a truncated
//! image behind. Note the replace protects the FILE, not the record — the
//! record's own safety comes from the payload-before-key write order in
//! the state store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use valvemu_traits::{HwResult, NvStorage};

use crate::error::HwError;

pub struct FileStore {
    path: PathBuf,
    image: Vec<u8>,
}

impl FileStore {
    /// Open an existing image or create a zeroed one of `size` bytes.
    /// An existing image of the wrong size is treated as foreign and
    /// replaced with a blank one (its validity byte would not match the
    /// current layout anyway).
    pub fn open(path: impl AsRef<Path>, size: usize) -> crate::error::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let image = match fs::read(&path) {
            Ok(bytes) if bytes.len() == size => bytes,
            Ok(bytes) => {
                tracing::warn!(
                    path = %path.display(),
                    found = bytes.len(),
                    expected = size,
                    "eeprom image has wrong size, starting blank"
                );
                vec![0u8; size]
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => vec![0u8; size],
            Err(e) => return Err(HwError::Io(e)),
        };
        Ok(Self { path, image })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> crate::error::Result<()> {
        let tmp = self.path.with_extension("new");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&self.image)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn check_bounds(&self, offset: usize, len: usize) -> crate::error::Result<()> {
        if offset.checked_add(len).is_none_or(|end| end > self.image.len()) {
            return Err(HwError::Bounds { offset, len });
        }
        Ok(())
    }
}

impl NvStorage for FileStore {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> HwResult<()> {
        self.check_bounds(offset, buf.len())?;
        buf.copy_from_slice(&self.image[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> HwResult<()> {
        self.check_bounds(offset, data.len())?;
        self.image[offset..offset + data.len()].copy_from_slice(data);
        self.persist()?;
        Ok(())
    }
}
