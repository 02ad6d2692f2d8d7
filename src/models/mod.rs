//! Data models for file entries, trash records, storage snapshots and transfers

use crate::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Semantic classification of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Apk,
    Archive,
    Download,
    Other,
    Unknown,
}

impl FileCategory {
    /// Categories measured individually by the storage analyzer.
    pub const ANALYZED: [FileCategory; 6] = [
        FileCategory::Image,
        FileCategory::Video,
        FileCategory::Audio,
        FileCategory::Document,
        FileCategory::Apk,
        FileCategory::Archive,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Document => "document",
            FileCategory::Apk => "apk",
            FileCategory::Archive => "archive",
            FileCategory::Download => "download",
            FileCategory::Other => "other",
            FileCategory::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "image" | "images" => Some(FileCategory::Image),
            "video" | "videos" => Some(FileCategory::Video),
            "audio" | "music" => Some(FileCategory::Audio),
            "document" | "documents" | "docs" => Some(FileCategory::Document),
            "apk" | "app" | "apps" => Some(FileCategory::Apk),
            "archive" | "archives" => Some(FileCategory::Archive),
            "download" | "downloads" => Some(FileCategory::Download),
            "other" => Some(FileCategory::Other),
            "unknown" => Some(FileCategory::Unknown),
            _ => None,
        }
    }

    /// Whether trashed files of this category carry a preview path.
    #[must_use]
    pub fn has_preview(&self) -> bool {
        matches!(self, FileCategory::Image | FileCategory::Video)
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileCategory::from_label(s).ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// One filesystem entry observed at enumeration time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Derived from the path; not stable across moves.
    pub id: u64,
    pub name: String,
    pub path: PathBuf,
    /// Always 0 for directories.
    pub size_bytes: u64,
    pub modified_ms: i64,
    pub mime_type: Option<String>,
    pub category: FileCategory,
    pub is_directory: bool,
    /// Always 0 for non-directories.
    pub child_count: u32,
}

/// One entry of the trash journal
///
/// Serialized field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashRecord {
    /// Creation timestamp in epoch millis, unique within the journal.
    pub id: i64,
    pub original_path: PathBuf,
    pub trash_path: PathBuf,
    pub name: String,
    pub size: u64,
    pub date_deleted: i64,
    #[serde(rename = "type")]
    pub category: FileCategory,
    pub preview: Option<PathBuf>,
}

impl TrashRecord {
    /// A record is valid only while its trash copy exists.
    #[must_use]
    pub fn is_backed(&self) -> bool {
        self.trash_path.symlink_metadata().is_ok()
    }
}

/// Snapshot of device capacity and categorized usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_bytes: u64,
    pub image_bytes: u64,
    pub video_bytes: u64,
    pub audio_bytes: u64,
    pub document_bytes: u64,
    pub app_bytes: u64,
    pub archive_bytes: u64,
    pub trash_bytes: u64,
    /// `used - sum(categories)`, never negative.
    pub other_bytes: u64,
}

impl StorageInfo {
    #[must_use]
    pub fn bytes_for(&self, category: FileCategory) -> u64 {
        match category {
            FileCategory::Image => self.image_bytes,
            FileCategory::Video => self.video_bytes,
            FileCategory::Audio => self.audio_bytes,
            FileCategory::Document => self.document_bytes,
            FileCategory::Apk => self.app_bytes,
            FileCategory::Archive => self.archive_bytes,
            FileCategory::Download | FileCategory::Other | FileCategory::Unknown => {
                self.other_bytes
            }
        }
    }

    /// Sum of every measured bucket, excluding the residual.
    #[must_use]
    pub fn category_sum(&self) -> u64 {
        self.image_bytes
            + self.video_bytes
            + self.audio_bytes
            + self.document_bytes
            + self.app_bytes
            + self.archive_bytes
            + self.trash_bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Copy,
    Move,
}

impl TransferKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Copy => "copy",
            TransferKind::Move => "move",
        }
    }

    /// Past-tense verb used in outcome messages.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            TransferKind::Copy => "Copied",
            TransferKind::Move => "Moved",
        }
    }
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient state of an in-flight transfer batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferProgress {
    pub current_file: String,
    pub kind: TransferKind,
    /// Bytes transferred divided by total batch bytes, in `0.0..=1.0`.
    pub fraction: f32,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    /// Average since the batch started.
    pub throughput_bytes_per_sec: Option<u64>,
    /// 1-based index of the current file.
    pub file_index: usize,
    pub file_count: usize,
}

/// Represents an error encountered while processing one item of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorItem {
    pub path: String,
    pub code: String,
    pub message: String,
}

impl ErrorItem {
    #[must_use]
    pub fn from_error(path: &Path, error: &Error) -> Self {
        Self {
            path: path.to_string_lossy().to_string(),
            code: error.kind().as_code().to_string(),
            message: error.user_message(),
        }
    }

    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        self.code == ErrorKind::Cancelled.as_code()
    }
}

/// Aggregate outcome of a batch operation
///
/// Batches keep going after an item fails; the report carries how many items
/// were attempted versus how many succeeded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub bytes_transferred: u64,
    pub cancelled: bool,
    pub failures: Vec<ErrorItem>,
}

impl BatchReport {
    #[must_use]
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, bytes: u64) {
        self.succeeded += 1;
        self.bytes_transferred += bytes;
    }

    pub fn record_failure(&mut self, path: &Path, error: &Error) {
        self.failures.push(ErrorItem::from_error(path, error));
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.succeeded == self.attempted
    }

    /// Human readable summary, e.g. "Copied 3 of 4 items".
    #[must_use]
    pub fn outcome_message(&self, verb: &str) -> String {
        if self.cancelled {
            return format!(
                "Cancelled after {} of {} {}",
                self.succeeded,
                self.attempted,
                items(self.attempted)
            );
        }

        if self.is_complete() {
            return format!("{verb} {} {}", self.succeeded, items(self.succeeded));
        }

        if self.attempted == 1
            && let Some(failure) = self.failures.first()
        {
            return failure.message.clone();
        }

        format!(
            "{verb} {} of {} {}",
            self.succeeded,
            self.attempted,
            items(self.attempted)
        )
    }

    /// Collapse into a `Result` for callers that only care about completion.
    pub fn into_result(self) -> crate::Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else if self.cancelled {
            Err(Error::Cancelled)
        } else {
            Err(Error::PartialFailure {
                completed: self.succeeded,
                failed: self.attempted - self.succeeded,
            })
        }
    }
}

fn items(count: usize) -> &'static str {
    if count == 1 { "item" } else { "items" }
}
