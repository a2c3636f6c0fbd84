//! Inode store (component D): the on-disk [`Inode`] record and accessors for reading/writing
//! one by index.

use bytemuck::{Pod, Zeroable};

use crate::device::BlockDevice;
use crate::error::FsResult;
use crate::layout::{INODE_BYTE_SIZE, INODE_TABLE_START, INODES_PER_SECTOR, MAX_SECTORS_PER_FILE};

/// Index into the inode table. Inode 0 is always the root directory.
pub type InodeIndex = u32;

/// What kind of filesystem object an [`Inode`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InodeKind {
    /// A regular file; `size` is in bytes.
    File = 0,
    /// A directory; `size` is a count of directory entries.
    Directory = 1,
}

impl From<InodeKind> for u32 {
    fn from(kind: InodeKind) -> Self {
        kind as u32
    }
}

impl TryFrom<u32> for InodeKind {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(InodeKind::File),
            1 => Ok(InodeKind::Directory),
            _ => Err(()),
        }
    }
}

/// The on-disk inode record: `size` (bytes for a file, entry count for a directory), `kind`,
/// and up to `MAX_SECTORS_PER_FILE` direct extents. A zero `data[k]` slot means "unallocated".
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct Inode {
    pub(crate) size: i32,
    kind: u32,
    pub(crate) data: [u32; MAX_SECTORS_PER_FILE],
}

impl Inode {
    /// A freshly allocated, empty inode of the given kind.
    pub(crate) fn new(kind: InodeKind) -> Self {
        Inode {
            size: 0,
            kind: kind.into(),
            data: [0; MAX_SECTORS_PER_FILE],
        }
    }

    pub(crate) fn kind(&self) -> InodeKind {
        // An on-disk value outside {0, 1} can only arise from a corrupt image; treat it as a
        // file rather than panicking, since callers that expect a directory will reject it anyway.
        InodeKind::try_from(self.kind).unwrap_or(InodeKind::File)
    }

    pub(crate) fn is_directory(&self) -> bool {
        self.kind() == InodeKind::Directory
    }
}

pub(crate) fn sector_of(index: InodeIndex) -> u32 {
    INODE_TABLE_START + index / INODES_PER_SECTOR as u32
}

fn offset_of(index: InodeIndex) -> usize {
    (index as usize % INODES_PER_SECTOR) * INODE_BYTE_SIZE
}

/// Reads the inode at `index` through a whole-sector buffer, as the original implementation
/// does (inodes are never read or written except as part of their containing sector).
pub(crate) fn read<D: BlockDevice>(device: &D, index: InodeIndex) -> FsResult<Inode> {
    let sector = device.read_sector(sector_of(index))?;
    let off = offset_of(index);
    Ok(*bytemuck::from_bytes(&sector[off..off + INODE_BYTE_SIZE]))
}

/// Writes the inode at `index` back, read-modify-write on its containing sector.
pub(crate) fn write<D: BlockDevice>(device: &mut D, index: InodeIndex, inode: &Inode) -> FsResult<()> {
    let sector_idx = sector_of(index);
    let mut sector = device.read_sector(sector_idx)?;
    let off = offset_of(index);
    sector[off..off + INODE_BYTE_SIZE].copy_from_slice(bytemuck::bytes_of(inode));
    device.write_sector(sector_idx, &sector)?;
    Ok(())
}
