//! Output formatting for CLI

use crate::models::{BatchReport, FileCategory, FileEntry, StorageInfo, TrashRecord};
use crate::services::analyzer::Forecast;
use crate::services::format::{format_size, format_timestamp};
use serde::Serialize;
use std::fmt::Write as _;

/// Get ANSI color code based on share of used space
fn color_for_percentage(pct: f64) -> &'static str {
    if pct >= 30.0 {
        "\x1b[31m"
    } else if pct >= 15.0 {
        "\x1b[33m"
    } else if pct >= 5.0 {
        "\x1b[36m"
    } else {
        "\x1b[90m"
    }
}

const COLOR_RESET: &str = "\x1b[0m";

/// Directory listing or query result as a table
#[must_use]
pub fn format_entries(entries: &[FileEntry]) -> String {
    if entries.is_empty() {
        return "No entries found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<50} {:>10} {:<10} {:<19}", "Name", "Size", "Type", "Modified");
    let _ = writeln!(out, "{}", "─".repeat(92));
    for entry in entries {
        let (name, size) = if entry.is_directory {
            (
                format!("{}/", entry.name),
                format!("{} items", entry.child_count),
            )
        } else {
            (entry.name.clone(), format_size(entry.size_bytes))
        };
        let _ = writeln!(
            out,
            "{:<50} {:>10} {:<10} {:<19}",
            name,
            size,
            entry.category.as_str(),
            format_timestamp(entry.modified_ms)
        );
    }
    out
}

/// Bin contents, newest first
#[must_use]
pub fn format_records(records: &[TrashRecord]) -> String {
    if records.is_empty() {
        return "Bin is empty.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<15} {:>10} {:<19} {}", "Id", "Size", "Deleted", "Original path");
    let _ = writeln!(out, "{}", "─".repeat(92));
    for record in records {
        let _ = writeln!(
            out,
            "{:<15} {:>10} {:<19} {}",
            record.id,
            format_size(record.size),
            format_timestamp(record.date_deleted),
            record.original_path.display()
        );
    }
    let total: u64 = records.iter().map(|r| r.size).sum();
    let _ = writeln!(out);
    let _ = writeln!(out, "{} item(s), {}", records.len(), format_size(total));
    out
}

/// Storage snapshot with per-bucket shares of used space
#[must_use]
pub fn format_storage(info: &StorageInfo, daily_usage: u64, forecast: Forecast) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Used {} of {} ({} free)",
        format_size(info.used_bytes),
        format_size(info.total_bytes),
        format_size(info.free_bytes)
    );
    let _ = writeln!(out);

    let mut rows: Vec<(&str, u64)> = FileCategory::ANALYZED
        .iter()
        .map(|&c| (c.as_str(), info.bytes_for(c)))
        .collect();
    rows.push(("trash", info.trash_bytes));
    rows.push(("other", info.other_bytes));

    for (label, bytes) in rows {
        #[allow(clippy::cast_precision_loss)]
        let pct = if info.used_bytes > 0 {
            bytes as f64 / info.used_bytes as f64 * 100.0
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "{}{:<10}{} {:>10} {:>5.1}%",
            color_for_percentage(pct),
            label,
            COLOR_RESET,
            format_size(bytes),
            pct
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Average daily usage: {}/day", format_size(daily_usage));
    let _ = writeln!(out, "Forecast: {forecast}");
    out
}

/// One-line outcome of a batch plus up to five failures
#[must_use]
pub fn format_report(report: &BatchReport, verb: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.outcome_message(verb));

    let shown = report.failures.len().min(5);
    for failure in &report.failures[..shown] {
        let _ = writeln!(out, "  {}: {}", failure.path, failure.message);
    }
    if report.failures.len() > shown {
        let _ = writeln!(out, "  ... and {} more", report.failures.len() - shown);
    }
    out
}

#[derive(Serialize)]
struct StorageJson<'a> {
    #[serde(flatten)]
    info: &'a StorageInfo,
    average_daily_usage_bytes: u64,
    forecast: String,
}

#[must_use]
pub fn storage_json(info: &StorageInfo, daily_usage: u64, forecast: Forecast) -> String {
    format_json(&StorageJson {
        info,
        average_daily_usage_bytes: daily_usage,
        forecast: forecast.to_string(),
    })
}

/// Pretty JSON for any serializable result
#[must_use]
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
