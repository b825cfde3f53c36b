//! Filesystem helpers shared by the cache, preparer and installer.
//!
//! These return plain `io::Result`; callers attach the path context that
//! matters to them.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Recursively copy the contents of `source` into `dest`.
///
/// `dest` is created if needed. Existing files in `dest` are overwritten and
/// files that only exist in `dest` are left alone.
pub fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path)?;
        }
    }

    Ok(())
}

/// Remove a file or a whole directory tree.
pub fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Move a file or directory, creating missing parents of `dest`.
///
/// Tries a rename first and falls back to copy-then-delete, which is needed
/// when the scratch space lives on a different filesystem.
pub fn move_path(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    if fs::symlink_metadata(source)?.is_dir() {
        copy_dir_recursive(source, dest)?;
        fs::remove_dir_all(source)
    } else {
        fs::copy(source, dest)?;
        fs::remove_file(source)
    }
}

/// Clear read-only permission bits so the path can be deleted.
///
/// Symlinks are left alone; their targets may lie outside the tree.
#[cfg(unix)]
pub fn make_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if fs::symlink_metadata(path)?.file_type().is_symlink() {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(0o777))
}

/// Clear read-only permission bits so the path can be deleted.
///
/// Symlinks are left alone; their targets may lie outside the tree.
#[cfg(not(unix))]
pub fn make_writable(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }
    let mut permissions = metadata.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}

/// Lexically normalize a path: drop `.` components and trailing separators.
///
/// `..` components are kept as-is; nothing is resolved against the
/// filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Whether `path` names something strictly below its base.
///
/// Only plain name components are allowed, so `.`, `..`, absolute paths and
/// the empty path are all rejected.
pub fn is_contained_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}
