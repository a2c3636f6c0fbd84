//! Open-file table (component G) and file content read/write/seek (component H).
//!
//! Files are direct-mapped: `Inode::data[k]` is the sector holding byte range
//! `[k * SECTOR_SIZE, (k + 1) * SECTOR_SIZE)`, allocated lazily on first write. There is no
//! indirection, so a file's maximum size is fixed at `MAX_SECTORS_PER_FILE * SECTOR_SIZE`.

use crate::device::BlockDevice;
use crate::error::{FsError, FsResult};
use crate::inode::{self, InodeIndex};
use crate::layout::{MAX_FILE_SIZE, MAX_OPEN_FILES, MAX_SECTORS_PER_FILE, SECTOR_SIZE};

/// One entry in the open-file table: which inode it points at and the cursor position used by
/// reads (writes ignore it — see [`write`]).
pub(crate) struct OpenFile {
    pub(crate) inode: InodeIndex,
    pub(crate) pos: u32,
}

/// A fixed-capacity slab of open file descriptors, indexed by slot number.
pub(crate) struct OpenFileTable {
    slots: Vec<Option<OpenFile>>,
}

impl OpenFileTable {
    pub(crate) fn new() -> Self {
        OpenFileTable {
            slots: (0..MAX_OPEN_FILES).map(|_| None).collect(),
        }
    }

    pub(crate) fn open(&mut self, inode: InodeIndex) -> FsResult<usize> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(FsError::TooManyOpenFiles)?;
        self.slots[slot] = Some(OpenFile { inode, pos: 0 });
        Ok(slot)
    }

    pub(crate) fn close(&mut self, fd: usize) -> FsResult<()> {
        let slot = self.slots.get_mut(fd).ok_or(FsError::BadFd)?;
        if slot.take().is_none() {
            return Err(FsError::BadFd);
        }
        Ok(())
    }

    pub(crate) fn get(&self, fd: usize) -> FsResult<&OpenFile> {
        self.slots.get(fd).and_then(|s| s.as_ref()).ok_or(FsError::BadFd)
    }

    pub(crate) fn get_mut(&mut self, fd: usize) -> FsResult<&mut OpenFile> {
        self.slots.get_mut(fd).and_then(|s| s.as_mut()).ok_or(FsError::BadFd)
    }
}

/// Reads up to `buf.len()` bytes starting at `pos`, stopping at EOF. Returns the number of
/// bytes actually read — `0` means EOF, not an error.
pub(crate) fn read<D: BlockDevice>(
    device: &D,
    inode_idx: InodeIndex,
    pos: u32,
    buf: &mut [u8],
) -> FsResult<usize> {
    let file = inode::read(device, inode_idx)?;
    if file.is_directory() {
        return Err(FsError::General);
    }
    let size = file.size.max(0) as u32;
    if pos >= size {
        return Ok(0);
    }

    let remaining = (size - pos) as usize;
    let to_read = buf.len().min(remaining);
    let mut done = 0usize;
    while done < to_read {
        let cur = pos as usize + done;
        let slot = cur / SECTOR_SIZE;
        let off = cur % SECTOR_SIZE;
        if slot >= MAX_SECTORS_PER_FILE || file.data[slot] == 0 {
            break;
        }
        let sector = device.read_sector(file.data[slot])?;
        let chunk = (SECTOR_SIZE - off).min(to_read - done);
        buf[done..done + chunk].copy_from_slice(&sector[off..off + chunk]);
        done += chunk;
    }
    Ok(done)
}

/// Writes `data`, allocating sectors as needed, and grows the file's `size` by `data.len()`.
///
/// `pos` is accepted for symmetry with [`read`] but deliberately unused: the original
/// implementation this is ported from always appends at the current end of file regardless of
/// the caller's requested offset, so a "write to overwrite the middle of a file" call silently
/// appends instead. That surprising behavior is preserved rather than fixed — see the crate's
/// design notes.
///
/// `inode.size + data.len() > MAX_FILE_SIZE` is checked up front, before any sector is touched,
/// so `FileTooBig` never leaves a partial write behind. If the sector bitmap is exhausted partway
/// through, the inode is left completely unwritten — sectors already filled in this call are
/// simply abandoned rather than recorded, matching the original implementation's all-or-nothing
/// `File_Write` (it never reaches its own inode-sector write-back on either failure path).
pub(crate) fn write<D: BlockDevice>(
    device: &mut D,
    inode_idx: InodeIndex,
    _pos: u32,
    data: &[u8],
) -> FsResult<usize> {
    let mut file = inode::read(device, inode_idx)?;
    if file.is_directory() {
        return Err(FsError::General);
    }

    let size = file.size.max(0) as u32;
    if size as u64 + data.len() as u64 > MAX_FILE_SIZE as u64 {
        return Err(FsError::FileTooBig);
    }

    let mut written = 0usize;
    while written < data.len() {
        let cur = size as usize + written;
        let slot = cur / SECTOR_SIZE;
        let off = cur % SECTOR_SIZE;
        if file.data[slot] == 0 {
            let sector_idx = crate::bitmap::alloc_sector(device)?.ok_or(FsError::NoSpace)?;
            file.data[slot] = sector_idx;
            log::trace!("file inode {inode_idx} grew sector {sector_idx} at slot {slot}");
        }
        let sector_idx = file.data[slot];
        let mut sector = device.read_sector(sector_idx)?;
        let chunk = (SECTOR_SIZE - off).min(data.len() - written);
        sector[off..off + chunk].copy_from_slice(&data[written..written + chunk]);
        device.write_sector(sector_idx, &sector)?;
        written += chunk;
    }

    file.size = (size as usize + written) as i32;
    inode::write(device, inode_idx, &file)?;
    log::debug!("wrote {written} bytes to file inode {inode_idx}, new size {}", file.size);
    Ok(written)
}

/// Validates a requested seek offset against the file's current size.
pub(crate) fn seek<D: BlockDevice>(device: &D, inode_idx: InodeIndex, offset: u32) -> FsResult<u32> {
    let file = inode::read(device, inode_idx)?;
    let size = file.size.max(0) as u32;
    if offset > size {
        return Err(FsError::SeekOutOfBounds);
    }
    Ok(offset)
}
