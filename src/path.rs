//! Path resolution (component E): splitting, per-component name validation, and walking a path
//! to an inode or to its parent directory + final component name.

use crate::device::BlockDevice;
use crate::error::{FsError, FsResult};
use crate::inode::InodeIndex;
use crate::layout::{MAX_NAME, MAX_PATH};

/// Inode 0 is always the root directory, fixed at format time.
pub(crate) const ROOT_INODE: InodeIndex = 0;

/// The result of resolving everything but the last path component: the directory it should
/// live in, plus its own (validated) name.
pub(crate) struct ResolvedParent {
    pub(crate) parent: InodeIndex,
    pub(crate) name: String,
}

/// A path component may contain only ASCII letters, digits, `.`, `_` and `-`, and must fit in
/// `MAX_NAME - 1` bytes (the last byte is reserved for the on-disk terminator).
pub(crate) fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name.len() > MAX_NAME - 1 {
        return Err(FsError::Create);
    }
    let ok = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-');
    if !ok {
        return Err(FsError::Create);
    }
    Ok(())
}

fn split_path(path: &str) -> FsResult<Vec<&str>> {
    if path.is_empty() || !path.starts_with('/') {
        return Err(FsError::General);
    }
    if path.len() >= MAX_PATH {
        return Err(FsError::General);
    }
    Ok(path.split('/').filter(|s| !s.is_empty()).collect())
}

fn walk<D: BlockDevice>(device: &D, components: &[&str]) -> FsResult<InodeIndex> {
    let mut current = ROOT_INODE;
    for comp in components {
        validate_name(comp)?;
        current = crate::dirent::find(device, current, comp)?.ok_or(FsError::General)?;
    }
    Ok(current)
}

/// Resolves an absolute path to the inode it names. `"/"` resolves to the root directory.
pub(crate) fn resolve<D: BlockDevice>(device: &D, path: &str) -> FsResult<InodeIndex> {
    if path == "/" {
        return Ok(ROOT_INODE);
    }
    let components = split_path(path)?;
    walk(device, &components)
}

/// Resolves everything but the final path component, returning the parent directory's inode
/// and the (validated, but not yet looked up) final component name. Used by every operation
/// that creates or removes a named entry.
pub(crate) fn resolve_parent<D: BlockDevice>(device: &D, path: &str) -> FsResult<ResolvedParent> {
    let components = split_path(path)?;
    let (last, dirs) = components.split_last().ok_or(FsError::General)?;
    validate_name(last)?;
    let parent = walk(device, dirs)?;
    Ok(ResolvedParent {
        parent,
        name: (*last).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;

    fn fresh() -> MemDevice {
        let mut dev = MemDevice::init();
        crate::layout::format(&mut dev).unwrap();
        dev
    }

    #[test]
    fn root_resolves_to_root_inode() {
        let dev = fresh();
        assert_eq!(resolve(&dev, "/").unwrap(), ROOT_INODE);
    }

    #[test]
    fn resolve_parent_of_top_level_path() {
        let dev = fresh();
        let r = resolve_parent(&dev, "/hello.txt").unwrap();
        assert_eq!(r.parent, ROOT_INODE);
        assert_eq!(r.name, "hello.txt");
    }

    #[test]
    fn resolve_walks_through_subdirectories() {
        let mut dev = fresh();
        crate::dirent::append(&mut dev, ROOT_INODE, "sub", 1).unwrap();
        let mut sub = crate::inode::read(&dev, 1).unwrap();
        sub = crate::inode::Inode::new(crate::inode::InodeKind::Directory);
        crate::inode::write(&mut dev, 1, &sub).unwrap();
        crate::dirent::append(&mut dev, 1, "leaf", 2).unwrap();

        assert_eq!(resolve(&dev, "/sub/leaf").unwrap(), 2);
        assert_eq!(resolve_parent(&dev, "/sub/leaf").unwrap().parent, 1);
    }

    #[test]
    fn missing_component_fails() {
        let dev = fresh();
        assert!(resolve(&dev, "/nope").is_err());
    }

    #[test]
    fn name_length_boundary() {
        assert!(validate_name(&"a".repeat(MAX_NAME - 1)).is_ok());
        assert!(validate_name(&"a".repeat(MAX_NAME)).is_err());
    }

    #[test]
    fn name_rejects_disallowed_characters() {
        assert!(validate_name("has space").is_err());
        assert!(validate_name("ok-name.txt").is_ok());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn path_must_be_absolute_and_bounded() {
        assert!(resolve_parent(&fresh(), "relative").is_err());
        let too_long = format!("/{}", "a".repeat(MAX_PATH));
        assert!(resolve_parent(&fresh(), &too_long).is_err());
    }
}
