//! Copy, move and rename with observable, cancellable progress.
//!
//! Invariants enforced here:
//!
//! - A transfer never overwrites: an existing target is a conflict.
//! - Move tries an atomic rename first and falls back to copy + delete,
//!   reporting the copy through the same progress callback.
//! - Cancellation is checked before each file of a batch and between chunks;
//!   files already transferred stay transferred.

pub mod cancel;
pub mod progress;
pub(crate) mod stream;

pub use cancel::CancellationToken;
pub use progress::{
    BatchTracker, ProgressSink, ProgressThrottler, TransferEvent, TransferState,
    progress_channel,
};

use crate::models::{BatchReport, TransferKind};
use crate::services::fsops::{FileOps, StdFileOps};
use crate::services::size;
use crate::{Error, Result, TransferOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;
use std::time::Instant;

/// A set of sources transferred into one destination directory.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub kind: TransferKind,
    pub sources: Vec<PathBuf>,
    pub dest_dir: PathBuf,
}

impl TransferRequest {
    #[must_use]
    pub fn copy(sources: Vec<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: TransferKind::Copy,
            sources,
            dest_dir: dest_dir.into(),
        }
    }

    #[must_use]
    pub fn relocate(sources: Vec<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: TransferKind::Move,
            sources,
            dest_dir: dest_dir.into(),
        }
    }
}

/// A batch running on a worker thread.
#[derive(Debug)]
pub struct TransferHandle {
    pub events: Receiver<TransferEvent>,
    pub token: CancellationToken,
    join: JoinHandle<BatchReport>,
}

impl TransferHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the worker to finish and return its report.
    pub fn join(self) -> Result<BatchReport> {
        self.join
            .join()
            .map_err(|_| Error::InvalidInput("transfer worker panicked".to_string()))
    }
}

/// Copy/move/rename engine. Owns no persistent state.
#[derive(Clone)]
pub struct TransferEngine {
    options: TransferOptions,
    ops: Arc<dyn FileOps>,
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self::new(TransferOptions::default())
    }
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TransferEngine {
    #[must_use]
    pub fn new(options: TransferOptions) -> Self {
        Self::with_ops(options, Arc::new(StdFileOps))
    }

    #[must_use]
    pub fn with_ops(options: TransferOptions, ops: Arc<dyn FileOps>) -> Self {
        Self { options, ops }
    }

    #[must_use]
    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Copy `source` into `dest_dir`, keeping its base name.
    ///
    /// `on_progress(bytes_so_far, total_bytes)` is invoked at a throttled cadence
    /// and always once more when the copy completes. Returns the new path.
    pub fn copy(
        &self,
        source: &Path,
        dest_dir: &Path,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<PathBuf> {
        self.copy_with(source, dest_dir, None, on_progress)
    }

    /// Move `source` into `dest_dir`, keeping its base name.
    pub fn move_to(
        &self,
        source: &Path,
        dest_dir: &Path,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<PathBuf> {
        self.move_with(source, dest_dir, None, on_progress)
    }

    /// Rename `path` within its directory. Never replaces an existing entry.
    pub fn rename(&self, path: &Path, new_name: &str) -> Result<PathBuf> {
        validate_name(new_name)?;
        fs::symlink_metadata(path).map_err(|err| Error::io(path, err))?;

        let parent = path
            .parent()
            .ok_or_else(|| Error::InvalidInput(format!("{} has no parent", path.display())))?;
        let target = parent.join(new_name);

        if target == path {
            return Ok(target);
        }
        if fs::symlink_metadata(&target).is_ok() {
            return Err(Error::Conflict(target));
        }

        self.ops
            .rename(path, &target)
            .map_err(|err| Error::io(path, err))?;
        log::info!("Renamed {} to {}", path.display(), target.display());
        Ok(target)
    }

    /// Rename every `(path, new_name)` pair, continuing past failures.
    pub fn rename_all(&self, items: &[(PathBuf, String)]) -> BatchReport {
        let mut report = BatchReport::new(items.len());
        for (path, new_name) in items {
            match self.rename(path, new_name) {
                Ok(_) => report.record_success(0),
                Err(err) => {
                    log::warn!("Rename of {} failed: {err}", path.display());
                    report.record_failure(path, &err);
                }
            }
        }
        report
    }

    /// Run a whole batch on the calling thread.
    ///
    /// The batch denominator is the summed size of all sources, computed up
    /// front. Every event goes to `sink`; the last one is always
    /// [`TransferEvent::Finished`].
    pub fn run_batch(
        &self,
        request: &TransferRequest,
        token: &CancellationToken,
        sink: &ProgressSink,
    ) -> BatchReport {
        let sizes: Vec<u64> = request
            .sources
            .iter()
            .map(|source| size::tree_size_or_zero(source))
            .collect();
        let total_bytes: u64 = sizes.iter().sum();
        let file_count = request.sources.len();

        let mut report = BatchReport::new(file_count);
        let mut tracker = BatchTracker::new(
            request.kind,
            total_bytes,
            file_count,
            self.options.progress_interval(),
        );

        log::info!(
            "Starting {} of {file_count} items ({total_bytes} bytes) into {}",
            request.kind,
            request.dest_dir.display()
        );
        sink.publish(TransferEvent::Started {
            kind: request.kind,
            total_bytes,
            file_count,
        });

        for (idx, (source, &file_size)) in request.sources.iter().zip(&sizes).enumerate() {
            if token.is_cancelled() {
                log::info!("Batch cancelled before {}", source.display());
                report.cancelled = true;
                break;
            }

            let file_index = idx + 1;
            let name = display_name(source);
            let mut on_progress = |done: u64, _total: u64| {
                if let Some(progress) = tracker.consider(Instant::now(), &name, file_index, done) {
                    sink.publish(TransferEvent::Progress(progress));
                }
            };

            let result = match request.kind {
                TransferKind::Copy => {
                    self.copy_with(source, &request.dest_dir, Some(token), &mut on_progress)
                }
                TransferKind::Move => {
                    self.move_with(source, &request.dest_dir, Some(token), &mut on_progress)
                }
            };

            tracker.complete_file(file_size);
            match result {
                Ok(target) => {
                    log::debug!("{} -> {}", source.display(), target.display());
                    report.record_success(file_size);
                }
                Err(Error::Cancelled) => {
                    log::info!("Batch cancelled during {}", source.display());
                    report.cancelled = true;
                    break;
                }
                Err(err) => {
                    log::warn!("{} of {} failed: {err}", request.kind, source.display());
                    report.record_failure(source, &err);
                }
            }

            if let Some(progress) = tracker.consider(Instant::now(), &name, file_index, 0) {
                sink.publish(TransferEvent::Progress(progress));
            }
        }

        log::info!(
            "{} finished: {}",
            request.kind,
            report.outcome_message(request.kind.verb())
        );
        sink.publish(TransferEvent::Finished(report.clone()));
        report
    }

    /// Run a batch on a dedicated worker thread.
    pub fn spawn_batch(&self, request: TransferRequest) -> Result<TransferHandle> {
        let (sink, events) = progress_channel();
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let engine = self.clone();

        let join = std::thread::Builder::new()
            .name(format!("filecore-{}", request.kind))
            .spawn(move || engine.run_batch(&request, &worker_token, &sink))
            .map_err(|err| Error::io(PathBuf::new(), err))?;

        Ok(TransferHandle {
            events,
            token,
            join,
        })
    }

    fn copy_with(
        &self,
        source: &Path,
        dest_dir: &Path,
        token: Option<&CancellationToken>,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<PathBuf> {
        let target = resolve_target(source, dest_dir)?;
        let total = size::tree_size_or_zero(source);
        let mut throttler = ProgressThrottler::with_interval(self.options.progress_interval());
        let mut done = 0u64;

        stream::copy_tree(source, &target, self.options.chunk_size, &mut |n| {
            if token.is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Cancelled);
            }
            done += n;
            if throttler.ready(Instant::now()) {
                on_progress(done, total);
            }
            Ok(())
        })?;

        on_progress(done, total);
        log::debug!("Copied {} ({done} bytes)", source.display());
        Ok(target)
    }

    fn move_with(
        &self,
        source: &Path,
        dest_dir: &Path,
        token: Option<&CancellationToken>,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<PathBuf> {
        let target = resolve_target(source, dest_dir)?;

        match self.ops.rename(source, &target) {
            Ok(()) => {
                let total = size::tree_size_or_zero(&target);
                on_progress(total, total);
                log::debug!("Renamed {} into place", source.display());
                return Ok(target);
            }
            Err(err) => {
                log::debug!(
                    "Atomic rename of {} failed ({err}); copying instead",
                    source.display()
                );
            }
        }

        let target = self.copy_with(source, dest_dir, token, on_progress)?;

        if let Err(err) = self.ops.remove(source) {
            log::warn!(
                "Copied {} but could not delete the source: {err}; rolling back",
                source.display()
            );
            if let Err(rollback_err) =
                stream::rollback_copy(&target, source, self.options.chunk_size)
            {
                log::error!(
                    "Rollback of {} failed: {rollback_err}",
                    target.display()
                );
            }
            return Err(Error::io(source, err));
        }

        Ok(target)
    }
}

/// `dest_dir/<base name of source>`, after validating both ends.
fn resolve_target(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let metadata = fs::symlink_metadata(source).map_err(|err| Error::io(source, err))?;
    let name = source
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", source.display())))?;

    if !dest_dir.is_dir() {
        return Err(Error::NotFound(dest_dir.to_path_buf()));
    }

    let target = dest_dir.join(name);
    if fs::symlink_metadata(&target).is_ok() {
        return Err(Error::Conflict(target));
    }

    if metadata.is_dir() {
        let source_abs = fs::canonicalize(source).map_err(|err| Error::io(source, err))?;
        let dest_abs = fs::canonicalize(dest_dir).map_err(|err| Error::io(dest_dir, err))?;
        if dest_abs.starts_with(&source_abs) {
            return Err(Error::InvalidInput(format!(
                "cannot transfer {} into itself",
                source.display()
            )));
        }
    }

    Ok(target)
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidInput(format!("'{name}' is not a valid file name")));
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
