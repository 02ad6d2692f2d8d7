//! Category resolution shared by the catalog, the trash store and the analyzer.
//!
//! Resolution order is fixed: MIME type first, then file extension, then the
//! default (`Other` when the name has an extension, `Unknown` when it has none).

use crate::models::FileCategory;
use std::path::Path;

const ARCHIVE_MIMES: &[&str] = &[
    "application/zip",
    "application/x-zip-compressed",
    "application/vnd.rar",
    "application/x-rar-compressed",
    "application/x-7z-compressed",
    "application/x-tar",
    "application/gzip",
    "application/x-gzip",
    "application/x-bzip2",
    "application/x-xz",
];

const DOCUMENT_MIMES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/rtf",
    "application/epub+zip",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
];

const DOCUMENT_MIME_PREFIXES: &[&str] = &[
    "text/",
    "application/vnd.openxmlformats-officedocument.",
    "application/vnd.oasis.opendocument.",
];

const APK_MIME: &str = "application/vnd.android.package-archive";

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "heic", "heif", "svg", "tif", "tiff",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov", "3gp", "m4v", "wmv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac", "m4a", "opus", "amr"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "odt", "ods", "odp", "csv",
    "md", "epub",
];
const APK_EXTENSIONS: &[&str] = &["apk", "xapk", "apks"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz"];

/// Resolve the category of a file from its name and optional MIME type.
#[must_use]
pub fn resolve(name: &str, mime: Option<&str>) -> FileCategory {
    let extension = extension_of(name);

    mime.and_then(from_mime)
        .or_else(|| extension.as_deref().and_then(from_extension))
        .unwrap_or(if extension.is_some() {
            FileCategory::Other
        } else {
            FileCategory::Unknown
        })
}

/// Guess a MIME type from the file name.
#[must_use]
pub fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Guess the MIME type of a path and resolve its category in one step.
#[must_use]
pub fn categorize_path(path: &Path) -> (Option<String>, FileCategory) {
    let mime = guess_mime(path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let category = resolve(&name, mime.as_deref());
    (mime, category)
}

/// Category implied by a MIME type, if any.
#[must_use]
pub fn from_mime(mime: &str) -> Option<FileCategory> {
    let mime = mime.trim().to_ascii_lowercase();

    if mime.starts_with("image/") {
        Some(FileCategory::Image)
    } else if mime.starts_with("video/") {
        Some(FileCategory::Video)
    } else if mime.starts_with("audio/") {
        Some(FileCategory::Audio)
    } else if mime == APK_MIME {
        Some(FileCategory::Apk)
    } else if ARCHIVE_MIMES.contains(&mime.as_str()) {
        Some(FileCategory::Archive)
    } else if DOCUMENT_MIMES.contains(&mime.as_str())
        || DOCUMENT_MIME_PREFIXES.iter().any(|p| mime.starts_with(p))
    {
        Some(FileCategory::Document)
    } else {
        None
    }
}

/// Category implied by a bare (dot-less) extension, if any.
#[must_use]
pub fn from_extension(extension: &str) -> Option<FileCategory> {
    let ext = extension.to_ascii_lowercase();
    let ext = ext.as_str();

    if IMAGE_EXTENSIONS.contains(&ext) {
        Some(FileCategory::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        Some(FileCategory::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        Some(FileCategory::Audio)
    } else if DOCUMENT_EXTENSIONS.contains(&ext) {
        Some(FileCategory::Document)
    } else if APK_EXTENSIONS.contains(&ext) {
        Some(FileCategory::Apk)
    } else if ARCHIVE_EXTENSIONS.contains(&ext) {
        Some(FileCategory::Archive)
    } else {
        None
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
}
