//! Index implementation that walks configured roots on every query.
//!
//! Subdirectories are visited in parallel with rayon. Unreadable directories
//! and entries are logged and skipped; they never fail the whole query.
//! Symlinks are not followed.

use super::{FileIndex, IndexQuery, entry_from_metadata, is_hidden};
use crate::models::{FileCategory, FileEntry};
use crate::{IndexOptions, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct WalkIndex {
    options: IndexOptions,
}

impl WalkIndex {
    #[must_use]
    pub fn new(options: IndexOptions) -> Self {
        Self { options }
    }

    /// Index a single root with default options.
    #[must_use]
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self::new(IndexOptions {
            roots: vec![root.into()],
            ..IndexOptions::default()
        })
    }

    /// Skip `path` (and everything below it) in future walks.
    #[must_use]
    pub fn excluding(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.excludes.push(path.into());
        self
    }

    #[must_use]
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.options
            .excludes
            .iter()
            .any(|excluded| path.starts_with(excluded))
    }

    fn walk_dir(&self, dir: &Path, query: &IndexQuery) -> Vec<FileEntry> {
        let read = match fs::read_dir(dir) {
            Ok(read) => read,
            Err(err) => {
                log::warn!("Cannot read {}: {err}", dir.display());
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        for entry in read {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    log::warn!("Skipping entry in {}: {err}", dir.display());
                    continue;
                }
            };

            let path = entry.path();
            if (!self.options.include_hidden && is_hidden(&path)) || self.is_excluded(&path) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    log::warn!("Cannot stat {}: {err}", path.display());
                    continue;
                }
            };

            if metadata.is_dir() {
                subdirs.push(path);
            } else if metadata.is_file() {
                let file_entry = entry_from_metadata(&path, &metadata);
                if query.matches(&file_entry) {
                    log::trace!("Indexed {} ({} bytes)", path.display(), file_entry.size_bytes);
                    files.push(file_entry);
                }
            }
        }

        let nested: Vec<FileEntry> = subdirs
            .par_iter()
            .flat_map_iter(|subdir| self.walk_dir(subdir, query))
            .collect();
        files.extend(nested);
        files
    }
}

impl FileIndex for WalkIndex {
    fn query(&self, query: &IndexQuery) -> Result<Vec<FileEntry>> {
        let roots: Vec<&PathBuf> = if query.category == Some(FileCategory::Download) {
            self.options.downloads_dir.iter().collect()
        } else {
            self.options.roots.iter().collect()
        };

        let entries: Vec<FileEntry> = roots
            .par_iter()
            .flat_map_iter(|root| self.walk_dir(root, query))
            .collect();

        log::debug!("Index query {query:?} matched {} files", entries.len());
        Ok(query.finish(entries))
    }
}
