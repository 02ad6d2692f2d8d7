//! Test fixtures for deterministic testing
#![allow(dead_code)]

use filecore::services::fsops::remove_path;
use filecore::{CancellationToken, FileOps, IndexDeleter, SpaceProbe, VolumeSpace};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Write `bytes` to `path`, creating parent directories.
pub fn write_file_sync<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(path.to_path_buf())
}

/// Backdate the modification time of `path` by `days`.
pub fn age_file(path: &Path, days: u64) -> io::Result<()> {
    let then = SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60);
    fs::File::options().write(true).open(path)?.set_modified(then)
}

/// Media tree with known per-category sizes:
///
/// - image: `photos/a.jpg` 1000 + `photos/nested/b.png` 500
/// - video: `videos/clip.mp4` 2000
/// - document: `docs/report.pdf` 300 + `docs/notes.txt` 200
/// - audio: `song.mp3` 400
/// - unknown: `README` 50
/// - other: `data.bin` 100
/// - hidden: `.cache/thumb.jpg` 700 (never indexed)
pub fn create_media_fixture(base: &Path) -> io::Result<PathBuf> {
    let root = base.join("media");
    write_file_sync(root.join("photos/a.jpg"), &[1u8; 1000])?;
    write_file_sync(root.join("photos/nested/b.png"), &[2u8; 500])?;
    write_file_sync(root.join("videos/clip.mp4"), &[3u8; 2000])?;
    write_file_sync(root.join("docs/report.pdf"), &[4u8; 300])?;
    write_file_sync(root.join("docs/notes.txt"), &[5u8; 200])?;
    write_file_sync(root.join("song.mp3"), &[6u8; 400])?;
    write_file_sync(root.join("README"), &[7u8; 50])?;
    write_file_sync(root.join("data.bin"), &[8u8; 100])?;
    write_file_sync(root.join(".cache/thumb.jpg"), &[9u8; 700])?;
    Ok(root)
}

/// Total bytes of the visible files in [`create_media_fixture`].
pub const MEDIA_VISIBLE_BYTES: u64 = 1000 + 500 + 2000 + 300 + 200 + 400 + 50 + 100;

/// Every rename fails as if crossing a filesystem boundary.
#[derive(Debug, Default)]
pub struct CrossDeviceOps;

impl FileOps for CrossDeviceOps {
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::other("cross-device link"))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        remove_path(path)
    }
}

/// Renames cross devices and nothing can be removed.
#[derive(Debug, Default)]
pub struct UndeletableOps;

impl FileOps for UndeletableOps {
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::other("cross-device link"))
    }

    fn remove(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "source is locked",
        ))
    }
}

#[derive(Debug, Default)]
pub struct FailingDeleter;

impl IndexDeleter for FailingDeleter {
    fn force_delete(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::other("index refused delete"))
    }
}

/// Deletes through [`remove_path`] and remembers every path it was asked for.
#[derive(Debug, Default)]
pub struct RecordingDeleter {
    pub deleted: Mutex<Vec<PathBuf>>,
}

impl IndexDeleter for RecordingDeleter {
    fn force_delete(&self, path: &Path) -> io::Result<()> {
        self.deleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
        remove_path(path)
    }
}

/// Renames cross devices. Removing a directory deletes its child `child`
/// and then fails, leaving the directory half cleared.
#[derive(Debug)]
pub struct PartialRemoveOps {
    pub child: String,
}

impl FileOps for PartialRemoveOps {
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::other("cross-device link"))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if !path.is_dir() {
            return remove_path(path);
        }
        let child = path.join(&self.child);
        if child.exists() {
            remove_path(&child)?;
        }
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
    }
}

/// Cancels `token` on the first rename, then performs the rename.
#[derive(Debug)]
pub struct CancelOnRename {
    pub token: CancellationToken,
    pub renames: AtomicUsize,
}

impl CancelOnRename {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            renames: AtomicUsize::new(0),
        }
    }
}

impl FileOps for CancelOnRename {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.renames.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
        fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        remove_path(path)
    }
}

/// Cancels `token` and then fails the rename, forcing a copy that sees the
/// cancellation on its first chunk.
#[derive(Debug)]
pub struct CancelDuringCopy {
    pub token: CancellationToken,
}

impl FileOps for CancelDuringCopy {
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        self.token.cancel();
        Err(io::Error::other("cross-device link"))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        remove_path(path)
    }
}

/// Capacity probe returning fixed numbers.
#[derive(Debug, Clone, Copy)]
pub struct FixedSpace {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl SpaceProbe for FixedSpace {
    fn volume_space(&self, _path: &Path) -> filecore::Result<VolumeSpace> {
        Ok(VolumeSpace {
            total_bytes: self.total_bytes,
            free_bytes: self.free_bytes,
        })
    }
}

pub fn make_args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| (*s).to_string()).collect()
}
