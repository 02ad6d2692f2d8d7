//! Volume capacity queries with platform-specific implementations

use crate::{Error, Result};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Total and free bytes of the volume holding a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeSpace {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl VolumeSpace {
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }
}

/// Free/total space query.
pub trait SpaceProbe: Send + Sync {
    fn volume_space(&self, path: &Path) -> Result<VolumeSpace>;
}

/// Probe backed by `statvfs` on Unix and `GetDiskFreeSpaceExW` on Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatvfsProbe;

impl SpaceProbe for StatvfsProbe {
    fn volume_space(&self, path: &Path) -> Result<VolumeSpace> {
        let space = query_volume(path).map_err(|err| Error::io(path, err))?;
        log::debug!(
            "Volume of {}: total {} bytes, free {} bytes",
            path.display(),
            space.total_bytes,
            space.free_bytes
        );
        Ok(space)
    }
}

/// Free space counts only blocks available to unprivileged users.
#[cfg(unix)]
fn query_volume(path: &Path) -> io::Result<VolumeSpace> {
    let stat = rustix::fs::statvfs(path).map_err(io::Error::from)?;
    let fragment = stat.f_frsize;
    Ok(VolumeSpace {
        total_bytes: stat.f_blocks.saturating_mul(fragment),
        free_bytes: stat.f_bavail.saturating_mul(fragment),
    })
}

#[cfg(windows)]
fn query_volume(path: &Path) -> io::Result<VolumeSpace> {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;

    // Convert path to wide string (UTF-16)
    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    let mut free_to_caller: u64 = 0;
    let mut total: u64 = 0;
    let mut total_free: u64 = 0;

    let ok = unsafe {
        GetDiskFreeSpaceExW(
            wide.as_ptr(),
            &mut free_to_caller,
            &mut total,
            &mut total_free,
        )
    };

    if ok == 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(VolumeSpace {
        total_bytes: total,
        free_bytes: free_to_caller,
    })
}

#[cfg(not(any(unix, windows)))]
fn query_volume(path: &Path) -> io::Result<VolumeSpace> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("capacity query unsupported for {}", path.display()),
    ))
}
