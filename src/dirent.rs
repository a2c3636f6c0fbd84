//! Directory entries (component F): the on-disk [`DirEntry`] record plus the directory manager
//! that appends, finds, lists and removes entries in a directory inode.
//!
//! Entries are packed: live entries always occupy indices `[0, size)` of the directory with no
//! holes, so removal is done by swapping the removed slot with the last live entry rather than
//! leaving a gap (mirrors `LibFS.c`'s `remove_inode`).

use bytemuck::{Pod, Zeroable};

use crate::device::BlockDevice;
use crate::error::{FsError, FsResult};
use crate::inode::{self, Inode, InodeIndex};
use crate::layout::{DIRENT_BYTE_SIZE, DIRENTS_PER_SECTOR, MAX_NAME, MAX_SECTORS_PER_FILE};

/// One on-disk directory entry: a fixed-width name plus the inode it names. 20 bytes.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct DirEntry {
    name: [u8; MAX_NAME],
    inode: u32,
}

impl DirEntry {
    fn new(name: &str, inode: InodeIndex) -> FsResult<Self> {
        let bytes = name.as_bytes();
        // Reserve one byte for the implicit terminator, matching MAX_NAME's "including the null
        // terminator" contract; callers validate this length up front (see path::validate_name).
        if bytes.is_empty() || bytes.len() >= MAX_NAME {
            return Err(FsError::General);
        }
        let mut buf = [0u8; MAX_NAME];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(DirEntry { name: buf, inode })
    }

    pub(crate) fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    pub(crate) fn inode_index(&self) -> InodeIndex {
        self.inode
    }
}

fn entry_location(dir: &Inode, entry_index: u32) -> Option<(u32, usize)> {
    let slot = entry_index as usize / DIRENTS_PER_SECTOR;
    if slot >= MAX_SECTORS_PER_FILE {
        return None;
    }
    let sector = dir.data[slot];
    if sector == 0 {
        return None;
    }
    let offset = (entry_index as usize % DIRENTS_PER_SECTOR) * DIRENT_BYTE_SIZE;
    Some((sector, offset))
}

fn read_entry<D: BlockDevice>(device: &D, dir: &Inode, entry_index: u32) -> FsResult<DirEntry> {
    let (sector_idx, offset) = entry_location(dir, entry_index).ok_or(FsError::General)?;
    let buf = device.read_sector(sector_idx)?;
    Ok(*bytemuck::from_bytes(&buf[offset..offset + DIRENT_BYTE_SIZE]))
}

fn write_entry<D: BlockDevice>(
    device: &mut D,
    dir: &Inode,
    entry_index: u32,
    entry: &DirEntry,
) -> FsResult<()> {
    let (sector_idx, offset) = entry_location(dir, entry_index).ok_or(FsError::General)?;
    let mut buf = device.read_sector(sector_idx)?;
    buf[offset..offset + DIRENT_BYTE_SIZE].copy_from_slice(bytemuck::bytes_of(entry));
    device.write_sector(sector_idx, &buf)?;
    Ok(())
}

/// Looks up `name` among `dir_index`'s entries. `dir_index` must name a directory.
pub(crate) fn find<D: BlockDevice>(
    device: &D,
    dir_index: InodeIndex,
    name: &str,
) -> FsResult<Option<InodeIndex>> {
    let dir = inode::read(device, dir_index)?;
    if !dir.is_directory() {
        return Err(FsError::General);
    }
    let n = dir.size.max(0) as u32;
    for i in 0..n {
        let entry = read_entry(device, &dir, i)?;
        if entry.name() == name {
            return Ok(Some(entry.inode_index()));
        }
    }
    Ok(None)
}

/// Lists every `(name, inode)` pair in `dir_index`, in packed on-disk order.
pub(crate) fn list<D: BlockDevice>(
    device: &D,
    dir_index: InodeIndex,
) -> FsResult<Vec<(String, InodeIndex)>> {
    let dir = inode::read(device, dir_index)?;
    if !dir.is_directory() {
        return Err(FsError::General);
    }
    let n = dir.size.max(0) as u32;
    let mut out = Vec::with_capacity(n as usize);
    for i in 0..n {
        let entry = read_entry(device, &dir, i)?;
        out.push((entry.name(), entry.inode_index()));
    }
    Ok(out)
}

/// Appends a `(name, child)` entry to `dir_index`, allocating a new data sector for it if the
/// current last sector is full. Fails with `FileTooBig` once `MAX_SECTORS_PER_FILE` is exhausted
/// and `NoSpace` if the device has no free sector left to grow into.
pub(crate) fn append<D: BlockDevice>(
    device: &mut D,
    dir_index: InodeIndex,
    name: &str,
    child: InodeIndex,
) -> FsResult<()> {
    let mut dir = inode::read(device, dir_index)?;
    if !dir.is_directory() {
        return Err(FsError::General);
    }

    let entry_index = dir.size.max(0) as u32;
    let slot = entry_index as usize / DIRENTS_PER_SECTOR;
    if slot >= MAX_SECTORS_PER_FILE {
        return Err(FsError::FileTooBig);
    }
    if dir.data[slot] == 0 {
        let sector = crate::bitmap::alloc_sector(device)?.ok_or(FsError::NoSpace)?;
        dir.data[slot] = sector;
        log::trace!("dir inode {dir_index} grew a new entry sector {sector} at slot {slot}");
    }

    let entry = DirEntry::new(name, child)?;
    write_entry(device, &dir, entry_index, &entry)?;
    dir.size += 1;
    inode::write(device, dir_index, &dir)?;
    log::debug!("appended {name} (inode {child}) to dir inode {dir_index}");
    Ok(())
}

/// Removes the entry named `name` from `dir_index`, swapping it with the last live entry to
/// keep entries packed, and returns the removed child's inode index.
///
/// If the removed entry was itself the last one, the sector it leaves behind is deliberately
/// *not* released back to the sector bitmap — this mirrors a leak present in the original
/// implementation (see the crate's design notes) rather than fixing it silently.
pub(crate) fn remove<D: BlockDevice>(
    device: &mut D,
    dir_index: InodeIndex,
    name: &str,
) -> FsResult<InodeIndex> {
    let mut dir = inode::read(device, dir_index)?;
    if !dir.is_directory() {
        return Err(FsError::General);
    }
    let n = dir.size.max(0) as u32;

    let mut found = None;
    for i in 0..n {
        let entry = read_entry(device, &dir, i)?;
        if entry.name() == name {
            found = Some((i, entry.inode_index()));
            break;
        }
    }
    let (index, removed_inode) = found.ok_or(FsError::NoSuchFile)?;

    let last_index = n - 1;
    if index != last_index {
        let last_entry = read_entry(device, &dir, last_index)?;
        write_entry(device, &dir, index, &last_entry)?;
    }
    write_entry(device, &dir, last_index, &DirEntry::zeroed())?;
    dir.size -= 1;
    inode::write(device, dir_index, &dir)?;
    log::debug!("removed {name} from dir inode {dir_index} (was inode {removed_inode})");
    Ok(removed_inode)
}
