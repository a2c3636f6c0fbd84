//! A small on-disk filesystem backed by a single fixed-size image file: one superblock, two
//! bitmaps (inodes, sectors), a fixed inode table and a data region, all sector-addressed.
//!
//! ```no_run
//! use sectorfs::Fs;
//!
//! let mut fs = Fs::boot("disk.img")?;
//! fs.file_create("/hello.txt")?;
//! let fd = fs.file_open("/hello.txt")?;
//! fs.file_write(fd, b"hello world")?;
//! fs.file_close(fd)?;
//! fs.sync()?;
//! # Ok::<(), sectorfs::FsError>(())
//! ```

mod bitmap;
mod device;
mod dirent;
mod error;
mod file;
mod fs;
mod inode;
mod layout;
mod path;

pub use device::{BlockDevice, MemDevice};
pub use error::{Errno, FsError, FsResult};
pub use fs::{DirEntryInfo, Fs};
pub use layout::{
    MAX_FILE_SIZE, MAX_FILES, MAX_NAME, MAX_OPEN_FILES, MAX_PATH, MAX_SECTORS_PER_FILE,
    SECTOR_SIZE, TOTAL_SECTORS,
};
