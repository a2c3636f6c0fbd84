//! Compile-time region layout and superblock handling.
//!
//! Mirrors the `#define`-based region arithmetic of the original implementation, but as real
//! `const` items computed from a handful of compile-time constants — the layout is entirely
//! fixed once the crate is built, exactly as the original fixed it at preprocessor time.

use bytemuck::{Pod, Zeroable};

use crate::device::BlockDevice;
use crate::dirent::DirEntry;
use crate::error::FsResult;
use crate::inode::{Inode, InodeKind};

/// Bytes per sector.
pub const SECTOR_SIZE: usize = 512;
/// Total sectors in an image.
pub const TOTAL_SECTORS: u32 = 4096;
/// Upper bound on live inodes.
pub const MAX_FILES: u32 = 512;
/// Direct extent count per inode; the only extent mechanism (no indirection).
pub const MAX_SECTORS_PER_FILE: usize = 28;
/// `MAX_SECTORS_PER_FILE * SECTOR_SIZE`.
pub const MAX_FILE_SIZE: u32 = MAX_SECTORS_PER_FILE as u32 * SECTOR_SIZE as u32;
/// Max length of a name, including the null terminator.
pub const MAX_NAME: usize = 16;
/// Max length of an absolute path, including the null terminator.
pub const MAX_PATH: usize = 256;
/// Max number of simultaneously open file descriptors.
pub const MAX_OPEN_FILES: usize = 256;

pub(crate) const MAGIC: u32 = 0xDEAD_BEEF;

/// Size in bytes of one on-disk [`Inode`].
pub const INODE_BYTE_SIZE: usize = core::mem::size_of::<Inode>();
/// How many inodes fit in one sector; inodes never straddle a sector boundary, so a sector's
/// tail may go unused.
pub const INODES_PER_SECTOR: usize = SECTOR_SIZE / INODE_BYTE_SIZE;
/// Size in bytes of one on-disk [`DirEntry`].
pub const DIRENT_BYTE_SIZE: usize = core::mem::size_of::<DirEntry>();
/// How many directory entries fit in one sector.
pub const DIRENTS_PER_SECTOR: usize = SECTOR_SIZE / DIRENT_BYTE_SIZE;

const fn ceil_div(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

/// Sectors needed for the inode bitmap (one bit per inode).
pub const INODE_BITMAP_SECTORS: u32 = ceil_div(ceil_div(MAX_FILES, 8), SECTOR_SIZE as u32);
/// Sectors needed for the data-sector bitmap (one bit per sector on the whole device).
pub const SECTOR_BITMAP_SECTORS: u32 = ceil_div(ceil_div(TOTAL_SECTORS, 8), SECTOR_SIZE as u32);
/// Sectors needed for the inode table.
pub const INODE_TABLE_SECTORS: u32 = ceil_div(MAX_FILES, INODES_PER_SECTOR as u32);

/// Sector holding the superblock.
pub const SUPERBLOCK_START: u32 = 0;
/// First sector of the inode bitmap.
pub const INODE_BITMAP_START: u32 = SUPERBLOCK_START + 1;
/// First sector of the sector bitmap.
pub const SECTOR_BITMAP_START: u32 = INODE_BITMAP_START + INODE_BITMAP_SECTORS;
/// First sector of the inode table.
pub const INODE_TABLE_START: u32 = SECTOR_BITMAP_START + SECTOR_BITMAP_SECTORS;
/// First sector of the data-block region; everything from here to `TOTAL_SECTORS` is data.
pub const DATA_START: u32 = INODE_TABLE_START + INODE_TABLE_SECTORS;

/// The on-disk superblock sector: a magic number followed by unused padding.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SuperblockSector {
    magic: u32,
    _reserved: [u8; SECTOR_SIZE - 4],
}

/// Formats a fresh image: writes the superblock, initialises both bitmaps with their
/// pre-allocated prefixes, and zeroes the inode table except for the root directory at
/// inode 0.
pub(crate) fn format<D: BlockDevice>(device: &mut D) -> FsResult<()> {
    log::debug!("formatting fresh image: {TOTAL_SECTORS} sectors of {SECTOR_SIZE} bytes");

    let sb = SuperblockSector {
        magic: MAGIC,
        _reserved: [0; SECTOR_SIZE - 4],
    };
    device.write_sector(SUPERBLOCK_START, bytemuck::bytes_of(&sb).try_into().unwrap())?;

    // Inode 0 (root) is pre-allocated.
    crate::bitmap::init(device, INODE_BITMAP_START, INODE_BITMAP_SECTORS, 1)?;
    // Every metadata sector up to DATA_START is pre-allocated in the sector bitmap.
    crate::bitmap::init(
        device,
        SECTOR_BITMAP_START,
        SECTOR_BITMAP_SECTORS,
        DATA_START,
    )?;

    for i in 0..INODE_TABLE_SECTORS {
        let mut buf = [0u8; SECTOR_SIZE];
        if i == 0 {
            let root = Inode::new(InodeKind::Directory);
            buf[..INODE_BYTE_SIZE].copy_from_slice(bytemuck::bytes_of(&root));
        }
        device.write_sector(INODE_TABLE_START + i, &buf)?;
    }

    log::debug!(
        "format complete: inode table at {INODE_TABLE_START}..{DATA_START}, data region starts at {DATA_START}"
    );
    Ok(())
}

/// Reads sector 0 and checks whether its first 4 bytes equal the magic number.
pub(crate) fn check_magic<D: BlockDevice>(device: &D) -> FsResult<bool> {
    let buf = device.read_sector(SUPERBLOCK_START)?;
    let magic = u32::from_le_bytes(buf[..4].try_into().unwrap());
    Ok(magic == MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_disjoint_and_ordered() {
        assert!(INODE_BITMAP_START < SECTOR_BITMAP_START);
        assert!(SECTOR_BITMAP_START < INODE_TABLE_START);
        assert!(INODE_TABLE_START < DATA_START);
        assert!(DATA_START < TOTAL_SECTORS);
    }

    #[test]
    fn inode_and_dirent_fit_their_sector() {
        assert!(INODES_PER_SECTOR >= 1);
        assert!(INODES_PER_SECTOR * INODE_BYTE_SIZE <= SECTOR_SIZE);
        assert_eq!(DIRENTS_PER_SECTOR, 25);
    }
}
