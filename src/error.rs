//! Typed error boundary, plus a `Copy` compatibility code for callers that
//! want the original C-style "check errno after a failure" convention.

use std::io;

use thiserror::Error;

/// Everything that can go wrong in a [`crate::fs::Fs`] operation.
#[derive(Debug, Error)]
pub enum FsError {
    /// Any unclassified failure: bad magic, wrong inode type, corrupt path.
    #[error("unclassified filesystem error")]
    General,

    /// Could not create a file or directory (parent missing, name taken, bitmap full).
    #[error("cannot create file or directory")]
    Create,

    /// `file_open` target does not exist.
    #[error("no such file")]
    NoSuchFile,

    /// The open-file table is full.
    #[error("too many open files")]
    TooManyOpenFiles,

    /// Descriptor is out of range, or not currently open.
    #[error("bad file descriptor")]
    BadFd,

    /// Write would push the file past `MAX_FILE_SIZE`.
    #[error("file would exceed maximum size")]
    FileTooBig,

    /// Sector bitmap exhausted during a write.
    #[error("no space left on device")]
    NoSpace,

    /// Seek offset negative or beyond the cached file size.
    #[error("seek offset out of bounds")]
    SeekOutOfBounds,

    /// Caller-supplied directory read buffer is smaller than the listing.
    #[error("directory read buffer too small")]
    BufferTooSmall,

    /// The underlying block device failed.
    #[error("device I/O error")]
    Io(#[from] io::Error),
}

/// `Copy` compatibility code mirroring the original implementation's process-wide `osErrno`.
///
/// Kept alongside the richer [`FsError`] so callers that want a C-style "operation returned
/// -1, go check errno" flow can still have one, without forcing every caller through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    General,
    Create,
    NoSuchFile,
    TooManyOpenFiles,
    BadFd,
    FileTooBig,
    NoSpace,
    SeekOutOfBounds,
    BufferTooSmall,
}

impl FsError {
    /// Collapses this error onto its compatibility code. `Io` always maps to `General`,
    /// matching the original implementation folding every device failure into `E_GENERAL`.
    pub fn errno(&self) -> Errno {
        match self {
            FsError::General | FsError::Io(_) => Errno::General,
            FsError::Create => Errno::Create,
            FsError::NoSuchFile => Errno::NoSuchFile,
            FsError::TooManyOpenFiles => Errno::TooManyOpenFiles,
            FsError::BadFd => Errno::BadFd,
            FsError::FileTooBig => Errno::FileTooBig,
            FsError::NoSpace => Errno::NoSpace,
            FsError::SeekOutOfBounds => Errno::SeekOutOfBounds,
            FsError::BufferTooSmall => Errno::BufferTooSmall,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type FsResult<T> = Result<T, FsError>;
