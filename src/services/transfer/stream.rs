//! Chunked byte streaming between paths.
//!
//! Targets are always created exclusively (`create_new`), so a copy can never
//! overwrite an existing file. When a copy fails, everything it created is
//! removed again; pre-existing targets are rejected before any byte is written.

use crate::services::fsops::remove_path;
use crate::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

/// Copy `src` (file, symlink, or directory tree) to the not-yet-existing `dst`.
///
/// `on_chunk` is called with the size of every chunk written; returning an error
/// aborts the stream. Returns the number of bytes copied.
pub(crate) fn copy_tree(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    on_chunk: &mut dyn FnMut(u64) -> Result<()>,
) -> Result<u64> {
    if fs::symlink_metadata(dst).is_ok() {
        return Err(Error::Conflict(dst.to_path_buf()));
    }

    let result = copy_recursive(src, dst, chunk_size, on_chunk);
    if result.is_err() {
        discard(dst);
    }
    result
}

fn copy_recursive(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    on_chunk: &mut dyn FnMut(u64) -> Result<()>,
) -> Result<u64> {
    let metadata = fs::symlink_metadata(src).map_err(|err| Error::io(src, err))?;

    if metadata.is_dir() {
        fs::create_dir(dst).map_err(|err| Error::io(dst, err))?;
        let mut total = 0u64;
        for entry in fs::read_dir(src).map_err(|err| Error::io(src, err))? {
            let entry = entry.map_err(|err| Error::io(src, err))?;
            total += copy_recursive(
                &entry.path(),
                &dst.join(entry.file_name()),
                chunk_size,
                on_chunk,
            )?;
        }
        Ok(total)
    } else if metadata.is_symlink() {
        copy_symlink(src, dst)?;
        Ok(0)
    } else {
        copy_file(src, dst, chunk_size, on_chunk)
    }
}

fn copy_file(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    on_chunk: &mut dyn FnMut(u64) -> Result<()>,
) -> Result<u64> {
    let mut reader = File::open(src).map_err(|err| Error::io(src, err))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|err| Error::io(dst, err))?;

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut written = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(Error::io(src, err)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|err| Error::io(dst, err))?;
        written += n as u64;
        log::trace!("{}: {written} bytes", dst.display());
        on_chunk(n as u64)?;
    }

    writer.sync_all().map_err(|err| Error::io(dst, err))?;

    if let Ok(modified) = reader.metadata().and_then(|m| m.modified())
        && let Err(err) = writer.set_modified(modified)
    {
        log::debug!("Could not preserve mtime on {}: {err}", dst.display());
    }

    Ok(written)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(|err| Error::io(src, err))?;
    std::os::unix::fs::symlink(&target, dst).map_err(|err| Error::io(dst, err))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .map(|_| ())
        .map_err(|err| Error::io(dst, err))
}

/// Put back whatever `original` lost from `copy`, then delete `copy`.
///
/// Used after a copy succeeded but deleting the source failed: a file source is
/// untouched, so the copy is simply discarded; a directory source may have been
/// partially deleted, so missing children are copied back first.
pub(crate) fn rollback_copy(copy: &Path, original: &Path, chunk_size: usize) -> Result<()> {
    merge_back(copy, original, chunk_size)?;
    remove_path(copy).map_err(|err| Error::io(copy, err))
}

fn merge_back(copy: &Path, original: &Path, chunk_size: usize) -> Result<()> {
    let Ok(original_meta) = fs::symlink_metadata(original) else {
        log::warn!(
            "Restoring {} from {} during rollback",
            original.display(),
            copy.display()
        );
        copy_tree(copy, original, chunk_size, &mut |_| Ok(()))?;
        return Ok(());
    };

    let copy_meta = fs::symlink_metadata(copy).map_err(|err| Error::io(copy, err))?;
    if copy_meta.is_dir() && original_meta.is_dir() {
        for entry in fs::read_dir(copy).map_err(|err| Error::io(copy, err))? {
            let entry = entry.map_err(|err| Error::io(copy, err))?;
            merge_back(&entry.path(), &original.join(entry.file_name()), chunk_size)?;
        }
    }
    Ok(())
}

/// Best-effort removal of a path this crate created.
pub(crate) fn discard(path: &Path) {
    match remove_path(path) {
        Ok(()) => log::debug!("Removed {}", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => log::warn!("Failed to remove {}: {err}", path.display()),
    }
}
