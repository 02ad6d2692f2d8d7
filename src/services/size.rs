//! Logical size computation for files and directory trees

use std::fs;
use std::io;
use std::path::Path;

/// Total logical size of a path. Directories are walked recursively; symlinks
/// are counted as links and never followed.
pub fn tree_size(path: &Path) -> io::Result<u64> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }

    let mut total = 0u64;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        match tree_size(&entry.path()) {
            Ok(size) => total += size,
            Err(err) => {
                log::warn!("Skipping {} while sizing: {err}", entry.path().display());
            }
        }
    }
    Ok(total)
}

/// Like [`tree_size`], but unreadable paths count as zero.
#[must_use]
pub fn tree_size_or_zero(path: &Path) -> u64 {
    tree_size(path).unwrap_or_else(|err| {
        log::debug!("Cannot size {}: {err}", path.display());
        0
    })
}
