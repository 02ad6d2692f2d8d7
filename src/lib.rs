//! File Lifecycle Core
//!
//! This library provides the engine behind a file manager: a durable soft-delete
//! store ("Bin") with crash-safe moves, a cancellable copy/move engine with
//! throttled progress reporting, and a storage analyzer that categorizes usage
//! and forecasts when a volume fills up.
//!
//! None of the components serialize concurrent mutations of the same path. Callers
//! are expected to issue user-initiated mutations one at a time; only the trash
//! journal is internally guarded by a single-writer lock.

pub mod cli;
pub mod io;
pub mod models;
pub mod services;

pub use models::{
    BatchReport, ErrorItem, FileCategory, FileEntry, StorageInfo, TransferKind,
    TransferProgress, TrashRecord,
};
pub use services::analyzer::{Forecast, StorageAnalyzer, calculate_forecast};
pub use services::catalog::{FileCatalog, FileIndex, IndexQuery, IndexSort, WalkIndex};
pub use services::fsops::{FileOps, IndexDeleter, PermissionResetDeleter, StdFileOps};
pub use services::space::{SpaceProbe, StatvfsProbe, VolumeSpace};
pub use services::transfer::{
    CancellationToken, ProgressSink, TransferEngine, TransferEvent, TransferHandle,
    TransferRequest, TransferState, progress_channel,
};
pub use services::trash::TrashStore;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Custom error type for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("No trash record with id {0}")]
    RecordNotFound(i64),
    #[error("Already exists: {}", .0.display())]
    Conflict(PathBuf),
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Partial failure: {completed} completed, {failed} failed")]
    PartialFailure { completed: usize, failed: usize },
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Io,
    Cancelled,
    Invalid,
    Partial,
}

impl ErrorKind {
    #[must_use]
    pub fn as_code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "ENOENT",
            ErrorKind::Conflict => "EEXIST",
            ErrorKind::Io => "IO",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Invalid => "EINVAL",
            ErrorKind::Partial => "PARTIAL",
        }
    }
}

impl Error {
    /// Wrap an I/O error, lifting "not found" and "already exists" into their
    /// dedicated variants.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path),
            std::io::ErrorKind::AlreadyExists => Error::Conflict(path),
            _ => Error::Io { path, source },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::RecordNotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Io { .. } | Error::Json(_) => ErrorKind::Io,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::InvalidInput(_) => ErrorKind::Invalid,
            Error::PartialFailure { .. } => ErrorKind::Partial,
        }
    }

    /// Message suitable for end users. Never includes raw OS error text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Error::NotFound(_) | Error::RecordNotFound(_) => "Not found".to_string(),
            Error::Conflict(_) => "Already exists".to_string(),
            Error::Cancelled => "Cancelled".to_string(),
            Error::InvalidInput(msg) => format!("Invalid request: {msg}"),
            Error::PartialFailure { completed, failed } => {
                format!("{completed} of {} completed", completed + failed)
            }
            Error::Io { .. } | Error::Json(_) => "Operation failed".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Options for the trash store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrashOptions {
    /// Days a record is kept before expiry. Negative disables expiry.
    pub retention_days: i64,
    /// Chunk size used when a move into or out of the bin has to copy bytes.
    pub chunk_size: usize,
}

impl Default for TrashOptions {
    fn default() -> Self {
        Self {
            retention_days: 30,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Options for copy/move transfers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    pub chunk_size: usize,
    pub progress_interval_ms: u64,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_interval_ms: 333,
        }
    }
}

impl TransferOptions {
    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// How bytes held in the bin show up in a storage snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrashAccounting {
    /// Reported as their own bucket.
    #[default]
    Separate,
    /// Not measured; absorbed by the residual "other" bucket.
    Ignore,
}

/// Options for the storage analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    pub usage_window_days: u32,
    pub trash_accounting: TrashAccounting,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            usage_window_days: 30,
            trash_accounting: TrashAccounting::Separate,
        }
    }
}

/// Options for the walking file index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    pub roots: Vec<PathBuf>,
    pub include_hidden: bool,
    pub downloads_dir: Option<PathBuf>,
    pub excludes: Vec<PathBuf>,
}

/// Full configuration, loadable from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub store_dir: PathBuf,
    pub trash: TrashOptions,
    pub transfer: TransferOptions,
    pub analyzer: AnalyzerOptions,
    pub index: IndexOptions,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            trash: TrashOptions::default(),
            transfer: TransferOptions::default(),
            analyzer: AnalyzerOptions::default(),
            index: IndexOptions::default(),
        }
    }
}

impl CoreConfig {
    /// Load a configuration file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let config = serde_json::from_str(&raw)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// `$HOME/.filecore`, or `.filecore` in the working directory when no home is set.
#[must_use]
pub fn default_store_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".filecore")
}
