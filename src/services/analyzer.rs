//! Storage breakdown and capacity forecasting
//!
//! The analyzer owns no state. A snapshot is assembled in one pass from the
//! capacity probe and independent per-category index queries, which run in
//! parallel. Whatever the categories do not explain lands in the residual
//! "other" bucket.

use crate::models::{FileCategory, StorageInfo};
use crate::services::catalog::{FileIndex, IndexQuery};
use crate::services::space::{SpaceProbe, VolumeSpace};
use crate::services::trash::TrashStore;
use crate::{AnalyzerOptions, Error, Result, TrashAccounting};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Days-until-full classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forecast {
    /// No measurable growth.
    Stable,
    UnderOneDay,
    /// 1 to 29 days.
    Days(u64),
    /// 30 to 364 days, expressed in whole months.
    Months(u64),
    OverOneYear,
}

impl std::fmt::Display for Forecast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Forecast::Stable => f.write_str("Stable"),
            Forecast::UnderOneDay => f.write_str("< 1 day"),
            Forecast::Days(1) => f.write_str("Full in ~1 day"),
            Forecast::Days(n) => write!(f, "Full in ~{n} days"),
            Forecast::Months(1) => f.write_str("Full in ~1 month"),
            Forecast::Months(n) => write!(f, "Full in ~{n} months"),
            Forecast::OverOneYear => f.write_str("> 1 year left"),
        }
    }
}

/// Classify how long `free_bytes` lasts at `daily_usage_bytes` per day.
#[must_use]
pub fn calculate_forecast(free_bytes: u64, daily_usage_bytes: u64) -> Forecast {
    if daily_usage_bytes == 0 {
        return Forecast::Stable;
    }

    let days = free_bytes / daily_usage_bytes;
    match days {
        0 => Forecast::UnderOneDay,
        1..=29 => Forecast::Days(days),
        30..=364 => Forecast::Months(days / 30),
        _ => Forecast::OverOneYear,
    }
}

/// Aggregates categorized usage for one volume.
pub struct StorageAnalyzer {
    index: Arc<dyn FileIndex>,
    probe: Arc<dyn SpaceProbe>,
    volume: PathBuf,
    trash: Option<Arc<TrashStore>>,
    options: AnalyzerOptions,
}

impl std::fmt::Debug for StorageAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAnalyzer")
            .field("volume", &self.volume)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl StorageAnalyzer {
    #[must_use]
    pub fn new(
        index: Arc<dyn FileIndex>,
        probe: Arc<dyn SpaceProbe>,
        volume: impl Into<PathBuf>,
        options: AnalyzerOptions,
    ) -> Self {
        Self {
            index,
            probe,
            volume: volume.into(),
            trash: None,
            options,
        }
    }

    /// Account bin contents according to the configured [`TrashAccounting`].
    #[must_use]
    pub fn with_trash(mut self, trash: Arc<TrashStore>) -> Self {
        self.trash = Some(trash);
        self
    }

    #[must_use]
    pub fn volume(&self) -> &Path {
        &self.volume
    }

    /// Per-category byte totals, queried concurrently. A failing category
    /// query counts as zero and is left to the residual.
    pub fn breakdown(&self) -> Vec<(FileCategory, u64)> {
        FileCategory::ANALYZED
            .par_iter()
            .map(|&category| {
                let bytes = self
                    .index
                    .total_bytes(&IndexQuery::all().category(category))
                    .unwrap_or_else(|err| {
                        log::warn!("Category query for {category} failed: {err}");
                        0
                    });
                (category, bytes)
            })
            .collect()
    }

    /// One atomic snapshot of capacity and categorized usage.
    pub fn get_storage_info(&self) -> Result<StorageInfo> {
        let space = self.probe.volume_space(&self.volume)?;
        let measured = self.breakdown();
        let trash_bytes = match (&self.trash, self.options.trash_accounting) {
            (Some(trash), TrashAccounting::Separate) => trash.total_size().unwrap_or_else(|err| {
                log::warn!("Could not size the bin: {err}");
                0
            }),
            _ => 0,
        };

        Ok(assemble_snapshot(space, &measured, trash_bytes))
    }

    /// Bytes per day written over the trailing usage window. Never negative.
    pub fn get_average_daily_usage_bytes(&self) -> Result<u64> {
        let window = self.options.usage_window_days;
        if window == 0 {
            return Err(Error::InvalidInput(
                "usage window must be at least one day".to_string(),
            ));
        }

        let since = chrono::Utc::now().timestamp_millis() - i64::from(window) * MS_PER_DAY;
        let recent = self
            .index
            .total_bytes(&IndexQuery::all().modified_since(since))?;
        let rate = recent / u64::from(window);
        log::debug!("{recent} bytes modified in the last {window} days ({rate}/day)");
        Ok(rate)
    }

    /// Forecast for the analyzed volume from live measurements.
    pub fn calculate_forecast(&self) -> Result<Forecast> {
        let space = self.probe.volume_space(&self.volume)?;
        let rate = self.get_average_daily_usage_bytes()?;
        Ok(calculate_forecast(space.free_bytes, rate))
    }
}

/// Combine a capacity reading with measured buckets.
///
/// Buckets are capped in a fixed order so their sum never exceeds `used`;
/// the remainder becomes `other`.
#[must_use]
pub fn assemble_snapshot(
    space: VolumeSpace,
    measured: &[(FileCategory, u64)],
    trash_bytes: u64,
) -> StorageInfo {
    let used = space.used_bytes();
    let mut info = StorageInfo {
        total_bytes: space.total_bytes,
        free_bytes: space.free_bytes,
        used_bytes: used,
        ..StorageInfo::default()
    };

    let mut remaining = used;
    let mut take = |bytes: u64| {
        let granted = bytes.min(remaining);
        if granted < bytes {
            log::debug!("Capping bucket from {bytes} to {granted} bytes to stay within used");
        }
        remaining -= granted;
        granted
    };

    for category in FileCategory::ANALYZED {
        let bytes = measured
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, b)| *b)
            .sum();
        let granted = take(bytes);
        match category {
            FileCategory::Image => info.image_bytes = granted,
            FileCategory::Video => info.video_bytes = granted,
            FileCategory::Audio => info.audio_bytes = granted,
            FileCategory::Document => info.document_bytes = granted,
            FileCategory::Apk => info.app_bytes = granted,
            FileCategory::Archive => info.archive_bytes = granted,
            _ => {}
        }
    }
    info.trash_bytes = take(trash_bytes);
    info.other_bytes = remaining;
    info
}
