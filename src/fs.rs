//! The public filesystem API (component I): [`Fs`] binds the device, the inode/bitmap/dirent
//! machinery and the open-file table into the operations an application actually calls.

use std::cell::Cell;
use std::io;
use std::path::Path;

use crate::device::{BlockDevice, MemDevice};
use crate::error::{Errno, FsError, FsResult};
use crate::file::{self, OpenFileTable};
use crate::inode::{self, Inode, InodeKind};
use crate::layout;
use crate::path;
use crate::{bitmap, dirent};

/// One entry as reported by [`Fs::dir_read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub inode: u32,
    pub is_directory: bool,
}

/// A mounted filesystem: a block device plus the open-file table and last-error slot layered
/// on top of it. Single-threaded and synchronous — there is no implicit flush, callers must
/// call [`Fs::sync`] to persist changes back to the image file.
pub struct Fs<D: BlockDevice> {
    device: D,
    open_files: OpenFileTable,
    last_error: Cell<Option<Errno>>,
}

impl<D: BlockDevice> Fs<D> {
    fn from_formatted(device: D) -> Self {
        Fs {
            device,
            open_files: OpenFileTable::new(),
            last_error: Cell::new(None),
        }
    }

    fn note<T>(&self, result: FsResult<T>) -> FsResult<T> {
        match &result {
            Ok(_) => self.last_error.set(None),
            Err(e) => self.last_error.set(Some(e.errno())),
        }
        result
    }

    /// The compatibility error code of the last failed operation, `None` if the last operation
    /// (or no operation yet) succeeded.
    pub fn last_errno(&self) -> Option<Errno> {
        self.last_error.get()
    }

    /// Creates an empty regular file at `path`. Fails if the parent doesn't exist, isn't a
    /// directory, already has an entry with that name, or no inode/sector is free.
    pub fn file_create(&mut self, path: &str) -> FsResult<()> {
        let result = self.create(path, InodeKind::File);
        self.note(result)
    }

    /// Creates an empty directory at `path`, same failure modes as [`Fs::file_create`].
    pub fn dir_create(&mut self, path: &str) -> FsResult<()> {
        let result = self.create(path, InodeKind::Directory);
        self.note(result)
    }

    /// Every failure mode collapses onto `FsError::Create` (missing/non-directory parent, name
    /// already taken, bitmap exhaustion, bad name) — matching the single error code the public
    /// API documents for both `file_create` and `dir_create`.
    fn create(&mut self, path: &str, kind: InodeKind) -> FsResult<()> {
        let resolved = path::resolve_parent(&self.device, path).map_err(|_| FsError::Create)?;
        let parent = inode::read(&self.device, resolved.parent).map_err(|_| FsError::Create)?;
        if !parent.is_directory() {
            return Err(FsError::Create);
        }
        if dirent::find(&self.device, resolved.parent, &resolved.name)
            .map_err(|_| FsError::Create)?
            .is_some()
        {
            return Err(FsError::Create);
        }

        let new_index = bitmap::alloc_inode(&mut self.device)
            .map_err(|_| FsError::Create)?
            .ok_or(FsError::Create)?;
        let new_inode = Inode::new(kind);
        inode::write(&mut self.device, new_index, &new_inode).map_err(|_| FsError::Create)?;

        if dirent::append(&mut self.device, resolved.parent, &resolved.name, new_index).is_err() {
            // Roll back the inode allocation so a failed create doesn't leak an inode.
            let _ = bitmap::free_inode(&mut self.device, new_index);
            return Err(FsError::Create);
        }
        log::debug!("created {path} (inode {new_index})");
        Ok(())
    }

    /// Opens the regular file at `path`, returning a descriptor for subsequent read/write/seek.
    pub fn file_open(&mut self, path: &str) -> FsResult<usize> {
        let result = (|| {
            let idx = path::resolve(&self.device, path).map_err(|_| FsError::NoSuchFile)?;
            let target = inode::read(&self.device, idx).map_err(|_| FsError::General)?;
            if target.is_directory() {
                return Err(FsError::General);
            }
            self.open_files.open(idx)
        })();
        self.note(result)
    }

    pub fn file_close(&mut self, fd: usize) -> FsResult<()> {
        let result = self.open_files.close(fd);
        self.note(result)
    }

    /// Reads into `buf` starting at the descriptor's current cursor, advancing it by the
    /// number of bytes actually read.
    pub fn file_read(&mut self, fd: usize, buf: &mut [u8]) -> FsResult<usize> {
        let result = (|| {
            let open = self.open_files.get(fd)?;
            let (inode_idx, pos) = (open.inode, open.pos);
            let n = file::read(&self.device, inode_idx, pos, buf)?;
            self.open_files.get_mut(fd)?.pos = pos + n as u32;
            Ok(n)
        })();
        self.note(result)
    }

    /// Writes `data`. The descriptor's cursor is accepted by `file_seek` but ignored here —
    /// writes always append at the file's current end, per the preserved append-only anomaly
    /// documented in [`crate::file::write`].
    pub fn file_write(&mut self, fd: usize, data: &[u8]) -> FsResult<usize> {
        let result = (|| {
            let inode_idx = self.open_files.get(fd)?.inode;
            file::write(&mut self.device, inode_idx, 0, data)
        })();
        self.note(result)
    }

    /// Moves the descriptor's cursor to `offset`, failing if it is past the file's current size.
    pub fn file_seek(&mut self, fd: usize, offset: u32) -> FsResult<u32> {
        let result = (|| {
            let inode_idx = self.open_files.get(fd)?.inode;
            let validated = file::seek(&self.device, inode_idx, offset)?;
            self.open_files.get_mut(fd)?.pos = validated;
            Ok(validated)
        })();
        self.note(result)
    }

    /// Removes the file named by `path` from its parent directory and frees its inode.
    ///
    /// The data sectors it held are deliberately *not* released back to the sector bitmap —
    /// this reproduces a leak present in the original implementation rather than fixing it
    /// silently; see the crate's design notes.
    pub fn file_unlink(&mut self, path: &str) -> FsResult<()> {
        let result = self.unlink(path, false);
        self.note(result)
    }

    /// Removes the empty directory named by `path`. Fails with `General` if it still has
    /// entries — this implementation resolves that open question in favor of `rmdir`-style
    /// "must be empty" semantics rather than silently orphaning children.
    pub fn dir_unlink(&mut self, path: &str) -> FsResult<()> {
        let result = self.unlink(path, true);
        self.note(result)
    }

    fn unlink(&mut self, path: &str, want_directory: bool) -> FsResult<()> {
        let resolved = path::resolve_parent(&self.device, path).map_err(|_| FsError::General)?;
        let target_idx = dirent::find(&self.device, resolved.parent, &resolved.name)
            .map_err(|_| FsError::General)?
            .ok_or(FsError::General)?;
        let target = inode::read(&self.device, target_idx).map_err(|_| FsError::General)?;
        if target.is_directory() != want_directory {
            return Err(FsError::General);
        }
        if want_directory && target.size > 0 {
            return Err(FsError::General);
        }

        dirent::remove(&mut self.device, resolved.parent, &resolved.name)
            .map_err(|_| FsError::General)?;
        bitmap::free_inode(&mut self.device, target_idx).map_err(|_| FsError::General)?;
        log::debug!("unlinked {path} (inode {target_idx})");
        Ok(())
    }

    /// Number of entries in the directory at `path`.
    pub fn dir_size(&self, path: &str) -> FsResult<u32> {
        let result = (|| {
            let idx = path::resolve(&self.device, path).map_err(|_| FsError::General)?;
            let dir = inode::read(&self.device, idx).map_err(|_| FsError::General)?;
            if !dir.is_directory() {
                return Err(FsError::General);
            }
            Ok(dir.size.max(0) as u32)
        })();
        self.note(result)
    }

    /// Fills `buf` with the directory's entries and returns how many were written. Fails with
    /// `BufferTooSmall` if `buf` is shorter than the directory's entry count, rather than
    /// silently truncating the listing.
    pub fn dir_read(&self, path: &str, buf: &mut [DirEntryInfo]) -> FsResult<usize> {
        let result = (|| {
            let idx = path::resolve(&self.device, path).map_err(|_| FsError::General)?;
            let dir = inode::read(&self.device, idx).map_err(|_| FsError::General)?;
            if !dir.is_directory() {
                return Err(FsError::General);
            }
            let entries = dirent::list(&self.device, idx).map_err(|_| FsError::General)?;
            if entries.len() > buf.len() {
                return Err(FsError::BufferTooSmall);
            }
            for (slot, (name, child_idx)) in buf.iter_mut().zip(entries.iter()) {
                let child = inode::read(&self.device, *child_idx).map_err(|_| FsError::General)?;
                *slot = DirEntryInfo {
                    name: name.clone(),
                    inode: *child_idx,
                    is_directory: child.is_directory(),
                };
            }
            Ok(entries.len())
        })();
        self.note(result)
    }
}

impl Fs<MemDevice> {
    /// Mounts the image at `path`, formatting a fresh one in place if it doesn't exist yet.
    /// Fails with `General` if the file exists but its magic number doesn't match.
    pub fn boot(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        match MemDevice::load(path) {
            Ok(device) => {
                if device.byte_len() as u64 != MemDevice::expected_byte_len() || !layout::check_magic(&device)? {
                    log::error!("{} exists but is not a valid image", path.display());
                    return Err(FsError::General);
                }
                log::debug!("mounted existing image at {}", path.display());
                Ok(Self::from_formatted(device))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} not found, formatting a fresh image", path.display());
                let mut device = MemDevice::init();
                layout::format(&mut device)?;
                device.save(path)?;
                Ok(Self::from_formatted(device))
            }
            Err(e) => Err(FsError::Io(e)),
        }
    }

    /// Persists the in-memory image back to the path it was booted from, atomically (see
    /// [`MemDevice::save`]). Uses the path `MemDevice` stashed at `boot`/load time, mirroring the
    /// original implementation's `FS_Sync()` reusing the filename recorded by `FS_Boot`.
    pub fn sync(&mut self) -> FsResult<()> {
        self.device.save_to_backing().map_err(|_| FsError::General)?;
        log::debug!("synced image to disk");
        Ok(())
    }
}

/// Exposed for callers that bring their own [`BlockDevice`] (e.g. tests) rather than going
/// through [`Fs::boot`]'s file-backed convenience constructor.
impl<D: BlockDevice> Fs<D> {
    pub fn mount_formatted(mut device: D) -> FsResult<Self> {
        layout::format(&mut device)?;
        Ok(Self::from_formatted(device))
    }

    pub fn mount_existing(device: D) -> FsResult<Self> {
        if !layout::check_magic(&device)? {
            return Err(FsError::General);
        }
        Ok(Self::from_formatted(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;

    fn fresh() -> Fs<MemDevice> {
        Fs::mount_formatted(MemDevice::init()).unwrap()
    }

    #[test]
    fn fresh_root_is_an_empty_directory() {
        let fs = fresh();
        assert_eq!(fs.dir_size("/").unwrap(), 0);
    }

    #[test]
    fn create_then_list_reflects_allocation_order() {
        let mut fs = fresh();
        fs.file_create("/a.txt").unwrap();
        fs.dir_create("/sub").unwrap();

        let mut buf = vec![
            DirEntryInfo { name: String::new(), inode: 0, is_directory: false };
            2
        ];
        let n = fs.dir_read("/", &mut buf).unwrap();
        assert_eq!(n, 2);
        assert_eq!(buf[0].name, "a.txt");
        assert!(!buf[0].is_directory);
        assert_eq!(buf[1].name, "sub");
        assert!(buf[1].is_directory);
    }

    #[test]
    fn write_then_read_back_then_eof() {
        let mut fs = fresh();
        fs.file_create("/hello.txt").unwrap();
        let fd = fs.file_open("/hello.txt").unwrap();
        assert_eq!(fs.file_write(fd, b"hello world").unwrap(), 11);

        let mut buf = [0u8; 32];
        let n = fs.file_read(fd, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello world");
        assert_eq!(fs.file_read(fd, &mut buf).unwrap(), 0);
        fs.file_close(fd).unwrap();
    }

    #[test]
    fn unlink_swaps_with_last_among_siblings() {
        let mut fs = fresh();
        fs.file_create("/x").unwrap();
        fs.file_create("/y").unwrap();
        fs.file_create("/z").unwrap();
        fs.file_unlink("/x").unwrap();

        let mut buf = vec![
            DirEntryInfo { name: String::new(), inode: 0, is_directory: false };
            2
        ];
        let n = fs.dir_read("/", &mut buf).unwrap();
        assert_eq!(n, 2);
        assert_eq!(buf[0].name, "z");
        assert_eq!(buf[1].name, "y");
    }

    #[test]
    fn dir_read_buffer_too_small_is_an_error_not_a_truncation() {
        let mut fs = fresh();
        fs.file_create("/a").unwrap();
        fs.file_create("/b").unwrap();
        let mut buf = vec![DirEntryInfo { name: String::new(), inode: 0, is_directory: false }; 1];
        assert!(matches!(fs.dir_read("/", &mut buf), Err(FsError::BufferTooSmall)));
    }

    #[test]
    fn name_too_long_or_with_bad_chars_fails_create() {
        let mut fs = fresh();
        assert!(fs.file_create(&format!("/{}", "a".repeat(15))).is_ok());
        assert!(fs.file_create(&format!("/{}", "a".repeat(16))).is_err());
        assert!(fs.file_create("/has space").is_err());
    }

    #[test]
    fn disk_full_write_preserves_earlier_files() {
        let mut fs = fresh();
        fs.file_create("/first").unwrap();
        let fd_first = fs.file_open("/first").unwrap();
        fs.file_write(fd_first, b"still here").unwrap();

        fs.file_create("/hog").unwrap();
        let fd_hog = fs.file_open("/hog").unwrap();
        // Keep writing until the device runs out of free sectors.
        loop {
            match fs.file_write(fd_hog, &[0u8; 512]) {
                Ok(_) => continue,
                Err(FsError::NoSpace) | Err(FsError::FileTooBig) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        let mut buf = [0u8; 32];
        let n = fs.file_read(fd_first, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"still here");
    }
}
