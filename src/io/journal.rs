//! Trash journal read/write operations
//!
//! The journal is a single JSON array of [`TrashRecord`] objects. It is always
//! rewritten as a whole: the new content goes to a sibling temp file which is
//! synced and then renamed over the journal, so a crash mid-write leaves either
//! the old or the new journal, never a truncated one.

use crate::models::TrashRecord;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Handle to the journal file. Holds no records itself.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record. A missing or empty file is an empty journal.
    ///
    /// An unparsable journal is moved aside to `<name>.corrupt` and treated as
    /// empty, so one bad write cannot lock the user out of the bin.
    pub fn load(&self) -> Result<Vec<TrashRecord>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Error::io(&self.path, err)),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<TrashRecord>>(&raw) {
            Ok(records) => {
                log::debug!(
                    "Loaded {} trash records from {}",
                    records.len(),
                    self.path.display()
                );
                Ok(records)
            }
            Err(err) => {
                let aside = self.sibling("corrupt");
                log::warn!(
                    "Trash journal {} is unreadable ({err}); moving it to {}",
                    self.path.display(),
                    aside.display()
                );
                if let Err(rename_err) = fs::rename(&self.path, &aside) {
                    log::warn!("Could not move corrupt journal aside: {rename_err}");
                }
                Ok(Vec::new())
            }
        }
    }

    /// Replace the journal content with `records`.
    pub fn store(&self, records: &[TrashRecord]) -> Result<()> {
        let payload = serde_json::to_vec_pretty(records)?;
        let tmp = self.sibling("tmp");

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&payload)?;
            file.sync_all()
        };

        if let Err(err) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(Error::io(&tmp, err));
        }

        fs::rename(&tmp, &self.path).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            Error::io(&self.path, err)
        })?;

        log::trace!(
            "Wrote {} trash records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the journal file entirely.
    pub fn discard(&self) -> Result<()> {
        let _ = fs::remove_file(self.sibling("tmp"));
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(&self.path, err)),
        }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
