//! Bitmap manager (component C): init / allocate-first-free / release over a contiguous
//! sector range.
//!
//! Bit `i` of byte `b` is logical index `b * 8 + i`, MSB-first (`0x80 >> i`); a set bit means
//! "allocated". This exact on-disk bit order is a tested format invariant, so it is reproduced
//! by hand here rather than delegated to a generic bit-vector crate whose internal word/bit
//! layout isn't guaranteed to match it byte-for-byte (see DESIGN.md).

use crate::device::BlockDevice;
use crate::error::{FsError, FsResult};
use crate::layout::{
    INODE_BITMAP_SECTORS, INODE_BITMAP_START, MAX_FILES, SECTOR_BITMAP_SECTORS,
    SECTOR_BITMAP_START, SECTOR_SIZE, TOTAL_SECTORS,
};

const BITS_PER_BYTE: usize = 8;
const BITS_PER_SECTOR: u32 = (SECTOR_SIZE * BITS_PER_BYTE) as u32;

fn bit_mask(local_bit: usize) -> u8 {
    0x80 >> local_bit
}

fn get_bit(byte: u8, local_bit: usize) -> bool {
    byte & bit_mask(local_bit) != 0
}

fn set_bit(byte: &mut u8, local_bit: usize) {
    *byte |= bit_mask(local_bit);
}

fn clear_bit(byte: &mut u8, local_bit: usize) {
    *byte &= !bit_mask(local_bit);
}

/// Initialises `num` sectors starting at `start` so that the first `prefix_bits` bits (in
/// on-disk bit order) are set, and the rest are clear.
pub(crate) fn init<D: BlockDevice>(
    device: &mut D,
    start: u32,
    num: u32,
    prefix_bits: u32,
) -> FsResult<()> {
    log::trace!("bitmap_init(start={start}, num={num}, prefix_bits={prefix_bits})");
    for s in 0..num {
        let mut sector = [0u8; SECTOR_SIZE];
        let sector_bit_base = s * BITS_PER_SECTOR;
        for (byte_idx, byte) in sector.iter_mut().enumerate() {
            for local_bit in 0..BITS_PER_BYTE {
                let global_bit = sector_bit_base + (byte_idx * BITS_PER_BYTE + local_bit) as u32;
                if global_bit < prefix_bits {
                    set_bit(byte, local_bit);
                }
            }
        }
        device.write_sector(start + s, &sector)?;
    }
    Ok(())
}

/// Scans in order for the first bit `< total_bits` that is currently 0, sets it, writes back
/// only the sector that changed, and returns its index. Returns `Ok(None)` if the region is
/// full. Lowest index wins on ties (there is no tie — the scan is strictly ordered).
pub(crate) fn first_unused<D: BlockDevice>(
    device: &mut D,
    start: u32,
    num: u32,
    total_bits: u32,
) -> FsResult<Option<u32>> {
    for s in 0..num {
        let mut sector = device.read_sector(start + s)?;
        let sector_bit_base = s * BITS_PER_SECTOR;
        for (byte_idx, byte) in sector.iter_mut().enumerate() {
            if *byte == 0xFF {
                continue;
            }
            for local_bit in 0..BITS_PER_BYTE {
                let global_bit = sector_bit_base + (byte_idx * BITS_PER_BYTE + local_bit) as u32;
                if global_bit >= total_bits {
                    return Ok(None);
                }
                if !get_bit(*byte, local_bit) {
                    set_bit(byte, local_bit);
                    device.write_sector(start + s, &sector)?;
                    log::trace!("bitmap_first_unused(start={start}) -> {global_bit}");
                    return Ok(Some(global_bit));
                }
            }
        }
    }
    Ok(None)
}

/// Clears `bit_index` within the region `[start, start+num)`. Fails if the index is out of
/// range for the region.
pub(crate) fn reset<D: BlockDevice>(
    device: &mut D,
    start: u32,
    num: u32,
    bit_index: u32,
) -> FsResult<()> {
    if bit_index >= num * BITS_PER_SECTOR {
        return Err(FsError::General);
    }
    let sector_offset = bit_index / BITS_PER_SECTOR;
    let within_sector = (bit_index % BITS_PER_SECTOR) as usize;
    let byte_idx = within_sector / BITS_PER_BYTE;
    let local_bit = within_sector % BITS_PER_BYTE;

    let mut sector = device.read_sector(start + sector_offset)?;
    clear_bit(&mut sector[byte_idx], local_bit);
    device.write_sector(start + sector_offset, &sector)?;
    log::trace!("bitmap_reset(start={start}, bit_index={bit_index})");
    Ok(())
}

/// Allocates the first free data sector (the sector bitmap covers every sector on the device;
/// metadata sectors are pre-marked used by `layout::format`, so a hit here is always in the
/// data region). `Ok(None)` means the device is full.
pub(crate) fn alloc_sector<D: BlockDevice>(device: &mut D) -> FsResult<Option<u32>> {
    first_unused(device, SECTOR_BITMAP_START, SECTOR_BITMAP_SECTORS, TOTAL_SECTORS)
}

/// Allocates the first free inode index. `Ok(None)` means the inode table is full.
pub(crate) fn alloc_inode<D: BlockDevice>(device: &mut D) -> FsResult<Option<u32>> {
    first_unused(device, INODE_BITMAP_START, INODE_BITMAP_SECTORS, MAX_FILES)
}

/// Releases a previously allocated inode index.
pub(crate) fn free_inode<D: BlockDevice>(device: &mut D, index: u32) -> FsResult<()> {
    reset(device, INODE_BITMAP_START, INODE_BITMAP_SECTORS, index)
}
