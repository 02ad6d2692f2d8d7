//! Filesystem mutation boundary.
//!
//! The trash store and the transfer engine rename and delete only through
//! [`FileOps`] and [`IndexDeleter`].

use std::fs;
use std::io;
use std::path::Path;

/// Mutating filesystem primitives used by the trash store and transfer engine.
pub trait FileOps: Send + Sync {
    /// Atomically rename `from` to `to`. Fails across filesystem boundaries.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file, symlink, or an entire directory tree.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Default implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileOps;

impl FileOps for StdFileOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        remove_path(path)
    }
}

/// Remove whatever lives at `path` without following symlinks.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Last-resort deletion for entries the regular remove could not delete,
/// such as files registered with a device-wide media index.
pub trait IndexDeleter: Send + Sync {
    fn force_delete(&self, path: &Path) -> io::Result<()>;
}

/// Clears the read-only flag on the entry and retries the removal.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionResetDeleter;

impl IndexDeleter for PermissionResetDeleter {
    #[allow(clippy::permissions_set_readonly_false)]
    fn force_delete(&self, path: &Path) -> io::Result<()> {
        let metadata = fs::symlink_metadata(path)?;
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
            log::debug!("Cleared read-only flag on {}", path.display());
        }
        remove_path(path)
    }
}
