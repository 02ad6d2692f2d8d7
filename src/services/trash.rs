//! Durable soft delete.
//!
//! Trashed entries are moved into `<store>/trash/` under the name
//! `"{epochMillis}_{originalName}"` and recorded in `<store>/trash_metadata.json`.
//! Per logical file the lifecycle is `Live -> Trashed -> {Live, Gone}`; every
//! transition either completes or is reverted, so at any time exactly one of
//! the original path and the trash path holds the content.
//!
//! The in-memory record list is the authority while the store is open. Every
//! read-modify-write of it happens under one mutex and is persisted before the
//! lock is released.

use crate::io::journal::Journal;
use crate::models::{BatchReport, FileCategory, TrashRecord};
use crate::services::category;
use crate::services::fsops::{FileOps, IndexDeleter, PermissionResetDeleter, StdFileOps};
use crate::services::size;
use crate::services::transfer::stream;
use crate::{Error, Result, TrashOptions};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const TRASH_DIR_NAME: &str = "trash";
pub const JOURNAL_FILE_NAME: &str = "trash_metadata.json";

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
/// Longest original name kept in a bin file name; the id prefix needs the rest
/// of the 255 byte component limit.
const MAX_SLOT_NAME_BYTES: usize = 200;
const MAX_KEPT_EXTENSION_BYTES: usize = 16;

/// Owner of the trash directory and its journal.
pub struct TrashStore {
    files_dir: PathBuf,
    journal: Journal,
    records: Mutex<Vec<TrashRecord>>,
    options: TrashOptions,
    ops: Arc<dyn FileOps>,
    deleter: Arc<dyn IndexDeleter>,
}

impl std::fmt::Debug for TrashStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrashStore")
            .field("files_dir", &self.files_dir)
            .field("journal", &self.journal.path())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TrashStore {
    /// Open (or create) the store rooted at `store_dir`.
    pub fn open<P: AsRef<Path>>(store_dir: P, options: TrashOptions) -> Result<Self> {
        Self::with_ops(
            store_dir,
            options,
            Arc::new(StdFileOps),
            Arc::new(PermissionResetDeleter),
        )
    }

    /// Open the store with custom filesystem backends.
    pub fn with_ops<P: AsRef<Path>>(
        store_dir: P,
        options: TrashOptions,
        ops: Arc<dyn FileOps>,
        deleter: Arc<dyn IndexDeleter>,
    ) -> Result<Self> {
        let store_dir = store_dir.as_ref();
        let store_dir = std::path::absolute(store_dir).map_err(|err| Error::io(store_dir, err))?;
        let files_dir = store_dir.join(TRASH_DIR_NAME);
        fs::create_dir_all(&files_dir).map_err(|err| Error::io(&files_dir, err))?;

        let journal = Journal::new(store_dir.join(JOURNAL_FILE_NAME));
        let records = journal.load()?;
        log::debug!(
            "Opened trash store at {} with {} records",
            store_dir.display(),
            records.len()
        );

        Ok(Self {
            files_dir,
            journal,
            records: Mutex::new(records),
            options,
            ops,
            deleter,
        })
    }

    #[must_use]
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    #[must_use]
    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }

    #[must_use]
    pub fn options(&self) -> &TrashOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TrashRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current records, newest first. Phantom records are purged on the way.
    pub fn records(&self) -> Result<Vec<TrashRecord>> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|record| {
            let backed = record.is_backed();
            if !backed {
                log::warn!(
                    "Purging phantom trash record {} ({} is missing)",
                    record.id,
                    record.trash_path.display()
                );
            }
            backed
        });
        if records.len() != before {
            self.journal.store(&records)?;
        }

        let mut listed = records.clone();
        listed.sort_by(|a, b| b.date_deleted.cmp(&a.date_deleted).then(b.id.cmp(&a.id)));
        Ok(listed)
    }

    pub fn find(&self, id: i64) -> Result<Option<TrashRecord>> {
        Ok(self.records()?.into_iter().find(|record| record.id == id))
    }

    /// Bytes held by valid records.
    pub fn total_size(&self) -> Result<u64> {
        Ok(self.records()?.iter().map(|record| record.size).sum())
    }

    /// Move `path` into the bin and journal it.
    ///
    /// Tries an atomic rename first. Otherwise the entry is copied into the bin
    /// and journaled before the source is deleted; if the source cannot be
    /// deleted (even through the [`IndexDeleter`]), the copy and its record are
    /// rolled back and the call fails with the source untouched.
    pub fn move_to_trash(&self, path: &Path) -> Result<TrashRecord> {
        let metadata = fs::symlink_metadata(path).map_err(|err| Error::io(path, err))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", path.display())))?;

        let original_path = std::path::absolute(path).map_err(|err| Error::io(path, err))?;
        if original_path.starts_with(&self.files_dir) {
            return Err(Error::InvalidInput(format!(
                "{} is already in the bin",
                path.display()
            )));
        }
        if metadata.is_dir() && self.bin_is_inside(path, &original_path) {
            return Err(Error::InvalidInput(format!(
                "{} contains the bin",
                path.display()
            )));
        }

        let (size, category) = if metadata.is_dir() {
            (size::tree_size_or_zero(path), FileCategory::Other)
        } else {
            (metadata.len(), category::categorize_path(path).1)
        };

        fs::create_dir_all(&self.files_dir).map_err(|err| Error::io(&self.files_dir, err))?;

        let mut records = self.lock();
        let now = chrono::Utc::now().timestamp_millis();
        let (id, trash_path) = self.allocate_slot(&records, now, &name);

        let record = TrashRecord {
            id,
            original_path,
            trash_path: trash_path.clone(),
            name,
            size,
            date_deleted: now,
            category,
            preview: category.has_preview().then(|| trash_path.clone()),
        };

        match self.ops.rename(path, &trash_path) {
            Ok(()) => {
                records.push(record.clone());
                if let Err(err) = self.journal.store(&records) {
                    records.pop();
                    log::warn!(
                        "Journal write failed after moving {} to the bin; moving it back",
                        path.display()
                    );
                    if let Err(back_err) = self.ops.rename(&trash_path, path) {
                        log::error!(
                            "Could not move {} back to {}: {back_err}",
                            trash_path.display(),
                            path.display()
                        );
                    }
                    return Err(err);
                }
            }
            Err(err) => {
                log::debug!(
                    "Atomic rename of {} into the bin failed ({err}); copying instead",
                    path.display()
                );
                self.trash_by_copy(path, &record, &mut records)?;
            }
        }

        log::info!(
            "Moved {} to the bin as {}",
            path.display(),
            record.trash_path.display()
        );
        Ok(record)
    }

    fn trash_by_copy(
        &self,
        path: &Path,
        record: &TrashRecord,
        records: &mut Vec<TrashRecord>,
    ) -> Result<()> {
        stream::copy_tree(path, &record.trash_path, self.options.chunk_size, &mut |_| Ok(()))?;

        records.push(record.clone());
        if let Err(err) = self.journal.store(records) {
            records.pop();
            stream::discard(&record.trash_path);
            return Err(err);
        }

        let Err(remove_err) = self.ops.remove(path) else {
            return Ok(());
        };
        log::warn!(
            "Could not delete {} after copying it to the bin: {remove_err}; trying index delete",
            path.display()
        );

        let Err(force_err) = self.deleter.force_delete(path) else {
            return Ok(());
        };
        log::warn!(
            "Index delete of {} failed: {force_err}; rolling back",
            path.display()
        );

        records.pop();
        if let Err(err) = stream::rollback_copy(&record.trash_path, path, self.options.chunk_size)
        {
            log::error!(
                "Rollback of {} failed: {err}",
                record.trash_path.display()
            );
        }
        if let Err(err) = self.journal.store(records) {
            log::error!("Could not drop rolled back record {}: {err}", record.id);
        }
        Err(Error::io(path, force_err))
    }

    /// True when the bin directory lives under the directory `path`.
    fn bin_is_inside(&self, path: &Path, original_path: &Path) -> bool {
        if self.files_dir.starts_with(original_path) {
            return true;
        }
        match (fs::canonicalize(&self.files_dir), fs::canonicalize(path)) {
            (Ok(bin), Ok(source)) => bin.starts_with(source),
            _ => false,
        }
    }

    /// Pick an id at or after `now` that is unused in the journal and whose
    /// trash file name is free.
    fn allocate_slot(&self, records: &[TrashRecord], now: i64, name: &str) -> (i64, PathBuf) {
        let mut id = records
            .iter()
            .map(|record| record.id + 1)
            .max()
            .map_or(now, |next| next.max(now));

        let stem = truncate_name(name, MAX_SLOT_NAME_BYTES);
        loop {
            let candidate = self.files_dir.join(format!("{id}_{stem}"));
            if fs::symlink_metadata(&candidate).is_err() {
                return (id, candidate);
            }
            id += 1;
        }
    }

    /// Move every path into the bin, continuing past failures.
    pub fn move_all_to_trash(&self, paths: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::new(paths.len());
        for path in paths {
            match self.move_to_trash(path) {
                Ok(record) => report.record_success(record.size),
                Err(err) => {
                    log::warn!("Moving {} to the bin failed: {err}", path.display());
                    report.record_failure(path, &err);
                }
            }
        }
        report
    }

    /// Put a trashed entry back at its original path. Returns that path.
    ///
    /// A record whose trash file is gone is purged and reported as not found.
    /// An occupied original path is a conflict; nothing is overwritten.
    pub fn restore(&self, id: i64) -> Result<PathBuf> {
        let mut records = self.lock();
        let pos = records
            .iter()
            .position(|record| record.id == id)
            .ok_or(Error::RecordNotFound(id))?;
        let record = records[pos].clone();

        if !record.is_backed() {
            records.remove(pos);
            self.journal.store(&records)?;
            log::warn!(
                "Purged phantom trash record {id}: {} is missing",
                record.trash_path.display()
            );
            return Err(Error::NotFound(record.trash_path));
        }

        let original = &record.original_path;
        if fs::symlink_metadata(original).is_ok() {
            return Err(Error::Conflict(original.clone()));
        }

        if let Some(parent) = original.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }

        if let Err(err) = self.ops.rename(&record.trash_path, original) {
            log::debug!(
                "Atomic restore of {} failed ({err}); copying instead",
                original.display()
            );
            stream::copy_tree(
                &record.trash_path,
                original,
                self.options.chunk_size,
                &mut |_| Ok(()),
            )?;
            if let Err(remove_err) = self.ops.remove(&record.trash_path) {
                log::warn!(
                    "Restored {} but could not clear the bin copy: {remove_err}; rolling back",
                    original.display()
                );
                if let Err(err) =
                    stream::rollback_copy(original, &record.trash_path, self.options.chunk_size)
                {
                    log::error!("Rollback of {} failed: {err}", original.display());
                }
                return Err(Error::io(&record.trash_path, remove_err));
            }
        }

        records.remove(pos);
        if let Err(err) = self.journal.store(&records) {
            log::warn!("Restored {} but the journal write failed: {err}", original.display());
        }

        log::info!("Restored {}", original.display());
        Ok(record.original_path)
    }

    /// Restore every record, continuing past failures.
    pub fn restore_all(&self) -> BatchReport {
        let ids: Vec<(i64, PathBuf)> = self
            .lock()
            .iter()
            .map(|record| (record.id, record.original_path.clone()))
            .collect();

        let mut report = BatchReport::new(ids.len());
        for (id, original) in ids {
            match self.restore(id) {
                Ok(_) => report.record_success(0),
                Err(err) => {
                    log::warn!("Restoring {} failed: {err}", original.display());
                    report.record_failure(&original, &err);
                }
            }
        }
        report
    }

    /// Delete a record's trash copy and drop the record.
    ///
    /// Idempotent: an already missing file or record is success.
    pub fn delete_permanently(&self, id: i64) -> Result<()> {
        let mut records = self.lock();
        let Some(pos) = records.iter().position(|record| record.id == id) else {
            log::debug!("Trash record {id} already gone");
            return Ok(());
        };

        let trash_path = records[pos].trash_path.clone();
        match self.ops.remove(&trash_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(Error::io(&trash_path, err)),
        }

        records.remove(pos);
        self.journal.store(&records)?;
        log::info!("Permanently deleted {}", trash_path.display());
        Ok(())
    }

    /// Delete everything in the trash directory and discard the journal.
    ///
    /// Not transactional: a failure partway leaves the remaining files in
    /// place while the journal is cleared. Returns the number of entries removed.
    pub fn empty_trash(&self) -> Result<usize> {
        let mut records = self.lock();
        let mut removed = 0usize;
        let mut failed = 0usize;

        let entries: Vec<fs::DirEntry> = match fs::read_dir(&self.files_dir) {
            Ok(entries) => entries.filter_map(std::result::Result::ok).collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(Error::io(&self.files_dir, err)),
        };

        for entry in entries {
            let path = entry.path();
            match self.ops.remove(&path) {
                Ok(()) => removed += 1,
                Err(err) => {
                    log::warn!("Failed to delete {} from the bin: {err}", path.display());
                    failed += 1;
                }
            }
        }

        records.clear();
        self.journal.discard()?;
        log::info!("Emptied the bin: {removed} removed, {failed} failed");

        if failed > 0 {
            return Err(Error::PartialFailure {
                completed: removed,
                failed,
            });
        }
        Ok(removed)
    }

    /// Expire records older than `retention_days`. Negative disables expiry.
    pub fn cleanup_expired(&self, retention_days: i64) -> Result<usize> {
        self.cleanup_expired_at(retention_days, chrono::Utc::now().timestamp_millis())
    }

    /// Expire using the configured retention.
    pub fn cleanup_expired_default(&self) -> Result<usize> {
        self.cleanup_expired(self.options.retention_days)
    }

    /// Expire records deleted before `now_ms - retention_days`.
    pub fn cleanup_expired_at(&self, retention_days: i64, now_ms: i64) -> Result<usize> {
        if retention_days < 0 {
            return Ok(0);
        }

        let cutoff = now_ms.saturating_sub(retention_days.saturating_mul(MS_PER_DAY));
        let expired: Vec<i64> = self
            .lock()
            .iter()
            .filter(|record| record.date_deleted < cutoff)
            .map(|record| record.id)
            .collect();

        let mut removed = 0usize;
        for id in expired {
            match self.delete_permanently(id) {
                Ok(()) => removed += 1,
                Err(err) => log::warn!("Expiring trash record {id} failed: {err}"),
            }
        }

        if removed > 0 {
            log::info!("Expired {removed} trash records older than {retention_days} days");
        }
        Ok(removed)
    }
}

/// Shorten `name` to at most `max` bytes on a char boundary, keeping a short
/// extension.
fn truncate_name(name: &str, max: usize) -> Cow<'_, str> {
    if name.len() <= max {
        return Cow::Borrowed(name);
    }

    let ext = name
        .rfind('.')
        .map(|dot| &name[dot..])
        .filter(|ext| ext.len() <= MAX_KEPT_EXTENSION_BYTES)
        .unwrap_or("");
    let mut end = max - ext.len();
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}{ext}", &name[..end]))
}
