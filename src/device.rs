//! The block device abstraction (component A) and a concrete, file-backed reference
//! implementation (component K).
//!
//! The device contract itself is a deliberately thin, external collaborator: fixed-size
//! sector I/O plus whole-image load/save. Everything above this module treats a `BlockDevice`
//! as an opaque sector array; [`MemDevice`] is the one piece of "ambient" plumbing the crate
//! needs in order to actually run and be tested against something.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::layout::{SECTOR_SIZE, TOTAL_SECTORS};

/// Fixed-size sector I/O over a whole-image block device.
pub trait BlockDevice {
    /// Reads one sector. Implementations should fail if `index >= sector_count()`.
    fn read_sector(&self, index: u32) -> io::Result<[u8; SECTOR_SIZE]>;

    /// Writes one sector. Implementations should fail if `index >= sector_count()`.
    fn write_sector(&mut self, index: u32, data: &[u8; SECTOR_SIZE]) -> io::Result<()>;

    /// Total number of addressable sectors on this device.
    fn sector_count(&self) -> u32;
}

/// An in-memory image of `TOTAL_SECTORS` sectors, optionally backed by a file on disk.
///
/// This is the reference `BlockDevice`: [`Fs::boot`](crate::fs::Fs::boot) uses it to load or
/// format an image, and [`Fs::sync`](crate::fs::Fs::sync) uses it to persist one back out.
pub struct MemDevice {
    sectors: Vec<u8>,
    backing_path: Option<PathBuf>,
}

impl MemDevice {
    const IMAGE_BYTES: usize = SECTOR_SIZE * TOTAL_SECTORS as usize;

    /// Creates a zeroed, unbacked image of `TOTAL_SECTORS` sectors.
    pub fn init() -> Self {
        MemDevice {
            sectors: vec![0u8; Self::IMAGE_BYTES],
            backing_path: None,
        }
    }

    /// Loads an image file into memory. Distinguishes "file not found" from other I/O errors
    /// via `io::ErrorKind::NotFound`, so callers (namely [`Fs::boot`](crate::fs::Fs::boot)) can
    /// decide whether to format a fresh image or report a hard failure.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Ok(MemDevice {
            sectors: bytes,
            backing_path: Some(path.to_path_buf()),
        })
    }

    /// Persists the current image to `path`, atomically: the image is written to a sibling
    /// temp file and renamed into place, so a crash or error mid-write never corrupts a
    /// previously good image.
    pub fn save(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let tmp_path = sibling_tmp_path(path);

        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(&self.sectors)?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, path)?;

        self.backing_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Persists the current image back to whichever path it was loaded from or last saved to.
    /// Fails with `NotFound` if this image has never been associated with a path.
    pub fn save_to_backing(&mut self) -> io::Result<()> {
        let path = self.backing_path.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "image has no backing file to sync to")
        })?;
        self.save(&path)
    }

    /// The length in bytes this image must have on disk.
    pub const fn expected_byte_len() -> u64 {
        Self::IMAGE_BYTES as u64
    }

    /// Byte length of the in-memory image as currently loaded.
    pub fn byte_len(&self) -> usize {
        self.sectors.len()
    }

    fn sector_range(&self, index: u32) -> Option<std::ops::Range<usize>> {
        let start = index as usize * SECTOR_SIZE;
        let end = start + SECTOR_SIZE;
        if end <= self.sectors.len() {
            Some(start..end)
        } else {
            None
        }
    }
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl BlockDevice for MemDevice {
    fn read_sector(&self, index: u32) -> io::Result<[u8; SECTOR_SIZE]> {
        let range = self
            .sector_range(index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "sector index out of range"))?;
        let mut buf = [0u8; SECTOR_SIZE];
        buf.copy_from_slice(&self.sectors[range]);
        Ok(buf)
    }

    fn write_sector(&mut self, index: u32, data: &[u8; SECTOR_SIZE]) -> io::Result<()> {
        let range = self
            .sector_range(index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "sector index out of range"))?;
        self.sectors[range].copy_from_slice(data);
        Ok(())
    }

    fn sector_count(&self) -> u32 {
        (self.sectors.len() / SECTOR_SIZE) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_device_is_zeroed_and_sized() {
        let dev = MemDevice::init();
        assert_eq!(dev.sector_count(), TOTAL_SECTORS);
        assert_eq!(dev.read_sector(0).unwrap(), [0u8; SECTOR_SIZE]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut dev = MemDevice::init();
        let mut data = [0u8; SECTOR_SIZE];
        data[0] = 0xAB;
        dev.write_sector(3, &data).unwrap();
        assert_eq!(dev.read_sector(3).unwrap(), data);
    }

    #[test]
    fn out_of_range_sector_fails() {
        let dev = MemDevice::init();
        assert!(dev.read_sector(TOTAL_SECTORS).is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");

        let mut dev = MemDevice::init();
        let mut data = [0u8; SECTOR_SIZE];
        data[10] = 0x42;
        dev.write_sector(7, &data).unwrap();
        dev.save(&path).unwrap();

        let loaded = MemDevice::load(&path).unwrap();
        assert_eq!(loaded.byte_len() as u64, MemDevice::expected_byte_len());
        assert_eq!(loaded.read_sector(7).unwrap(), data);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let err = MemDevice::load("/nonexistent/path/to/image.bin").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
