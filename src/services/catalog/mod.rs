//! Directory listings and device-wide file queries.
//!
//! The catalog holds no state of its own: every call produces fresh
//! [`FileEntry`] values, superseded by the next enumeration.

pub mod walk;

pub use walk::WalkIndex;

use crate::models::{FileCategory, FileEntry};
use crate::services::category;
use crate::{Error, Result};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, Metadata};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Ordering applied to index query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexSort {
    /// Most recently modified first.
    #[default]
    Recent,
    /// Largest first.
    Largest,
    /// Case-insensitive by name.
    Name,
}

/// Filter over indexed file records. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexQuery {
    pub category: Option<FileCategory>,
    pub modified_since_ms: Option<i64>,
    pub name_contains: Option<String>,
    pub min_size: Option<u64>,
    pub limit: Option<usize>,
    pub sort: IndexSort,
}

impl IndexQuery {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn category(mut self, category: FileCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn modified_since(mut self, epoch_ms: i64) -> Self {
        self.modified_since_ms = Some(epoch_ms);
        self
    }

    #[must_use]
    pub fn name_contains(mut self, term: impl Into<String>) -> Self {
        self.name_contains = Some(term.into().to_lowercase());
        self
    }

    #[must_use]
    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn sorted_by(mut self, sort: IndexSort) -> Self {
        self.sort = sort;
        self
    }

    /// Whether `entry` passes every filter except the `Download` category,
    /// which is location based and resolved by the index.
    #[must_use]
    pub fn matches(&self, entry: &FileEntry) -> bool {
        if let Some(category) = self.category
            && category != FileCategory::Download
            && entry.category != category
        {
            return false;
        }
        if let Some(since) = self.modified_since_ms
            && entry.modified_ms < since
        {
            return false;
        }
        if let Some(min) = self.min_size
            && entry.size_bytes < min
        {
            return false;
        }
        if let Some(term) = &self.name_contains
            && !entry.name.to_lowercase().contains(term.as_str())
        {
            return false;
        }
        true
    }

    /// Sort and truncate query results.
    #[must_use]
    pub fn finish(&self, mut entries: Vec<FileEntry>) -> Vec<FileEntry> {
        match self.sort {
            IndexSort::Recent => entries.sort_by(|a, b| b.modified_ms.cmp(&a.modified_ms)),
            IndexSort::Largest => entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
            IndexSort::Name => {
                entries.sort_by_key(|e| e.name.to_lowercase());
            }
        }

        if let Some(k) = self.limit {
            entries.truncate(k);
        }

        entries
    }
}

/// Category-aware query over device-wide file records.
pub trait FileIndex: Send + Sync {
    /// Files matching `query`, sorted and limited as requested.
    fn query(&self, query: &IndexQuery) -> Result<Vec<FileEntry>>;

    /// Summed size of the files matching `query`, ignoring its limit.
    fn total_bytes(&self, query: &IndexQuery) -> Result<u64> {
        let unlimited = IndexQuery {
            limit: None,
            ..query.clone()
        };
        Ok(self.query(&unlimited)?.iter().map(|e| e.size_bytes).sum())
    }
}

/// Enumerates directories and answers index queries.
#[derive(Clone)]
pub struct FileCatalog {
    index: Arc<dyn FileIndex>,
    include_hidden: bool,
}

impl std::fmt::Debug for FileCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCatalog")
            .field("include_hidden", &self.include_hidden)
            .finish_non_exhaustive()
    }
}

impl FileCatalog {
    #[must_use]
    pub fn new(index: Arc<dyn FileIndex>) -> Self {
        Self {
            index,
            include_hidden: false,
        }
    }

    #[must_use]
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    #[must_use]
    pub fn index(&self) -> &Arc<dyn FileIndex> {
        &self.index
    }

    /// Immediate children of `dir`: directories first, then by name.
    pub fn list_directory(&self, dir: &Path) -> Result<Vec<FileEntry>> {
        let metadata = fs::metadata(dir).map_err(|err| Error::io(dir, err))?;
        if !metadata.is_dir() {
            return Err(Error::InvalidInput(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut entries = Vec::new();
        for item in fs::read_dir(dir).map_err(|err| Error::io(dir, err))? {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    log::warn!("Skipping unreadable entry in {}: {err}", dir.display());
                    continue;
                }
            };

            let path = item.path();
            if !self.include_hidden && is_hidden(&path) {
                continue;
            }

            match fs::metadata(&path).or_else(|_| fs::symlink_metadata(&path)) {
                Ok(metadata) => entries.push(entry_from_metadata(&path, &metadata)),
                Err(err) => log::warn!("Cannot stat {}: {err}", path.display()),
            }
        }

        entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        log::debug!("Listed {} entries in {}", entries.len(), dir.display());
        Ok(entries)
    }

    /// Describe a single path.
    pub fn entry(&self, path: &Path) -> Result<FileEntry> {
        let metadata = fs::metadata(path).map_err(|err| Error::io(path, err))?;
        Ok(entry_from_metadata(path, &metadata))
    }

    pub fn by_category(&self, category: FileCategory) -> Result<Vec<FileEntry>> {
        self.index.query(&IndexQuery::all().category(category))
    }

    /// Files modified within the last `days` days, newest first.
    pub fn recent(&self, days: u32, limit: usize) -> Result<Vec<FileEntry>> {
        let since = chrono::Utc::now().timestamp_millis() - i64::from(days) * MS_PER_DAY;
        self.index
            .query(&IndexQuery::all().modified_since(since).limit(limit))
    }

    /// Case-insensitive substring search on file names.
    pub fn search(&self, term: &str) -> Result<Vec<FileEntry>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        self.index.query(
            &IndexQuery::all()
                .name_contains(term)
                .sorted_by(IndexSort::Name),
        )
    }

    /// Files of at least `min_bytes`, largest first.
    pub fn large_files(&self, min_bytes: u64) -> Result<Vec<FileEntry>> {
        self.index.query(
            &IndexQuery::all()
                .min_size(min_bytes)
                .sorted_by(IndexSort::Largest),
        )
    }

    pub fn downloads(&self) -> Result<Vec<FileEntry>> {
        self.index
            .query(&IndexQuery::all().category(FileCategory::Download))
    }
}

/// Build a [`FileEntry`] from already-fetched metadata.
#[must_use]
pub fn entry_from_metadata(path: &Path, metadata: &Metadata) -> FileEntry {
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let modified_ms = metadata
        .modified()
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis())
        .unwrap_or(0);

    let is_directory = metadata.is_dir();
    let (mime_type, category) = if is_directory {
        (None, FileCategory::Other)
    } else {
        category::categorize_path(path)
    };

    let child_count = if is_directory {
        fs::read_dir(path)
            .map(|it| u32::try_from(it.count()).unwrap_or(u32::MAX))
            .unwrap_or(0)
    } else {
        0
    };

    FileEntry {
        id: path_id(path),
        name,
        path: path.to_path_buf(),
        size_bytes: if is_directory { 0 } else { metadata.len() },
        modified_ms,
        mime_type,
        category,
        is_directory,
        child_count,
    }
}

/// Stable-for-this-path identifier.
#[must_use]
pub fn path_id(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
