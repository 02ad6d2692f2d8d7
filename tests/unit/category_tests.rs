//! Unit tests for category resolution

use filecore::FileCategory;
use filecore::services::category::{categorize_path, from_extension, from_mime, resolve};
use std::path::Path;
use std::str::FromStr;

#[test]
fn mime_type_takes_precedence_over_extension() {
    assert_eq!(resolve("song.txt", Some("audio/mpeg")), FileCategory::Audio);
    assert_eq!(resolve("clip", Some("video/mp4")), FileCategory::Video);
}

#[test]
fn extension_is_used_when_mime_is_unhelpful() {
    assert_eq!(resolve("photo.JPG", None), FileCategory::Image);
    assert_eq!(
        resolve("bundle.apk", Some("application/octet-stream")),
        FileCategory::Apk
    );
    assert_eq!(resolve("backup.7z", None), FileCategory::Archive);
}

#[test]
fn unmatched_names_fall_back_by_extension_presence() {
    assert_eq!(resolve("data.bin", None), FileCategory::Other);
    assert_eq!(resolve("README", None), FileCategory::Unknown);
    assert_eq!(resolve(".profile", None), FileCategory::Unknown);
}

#[test]
fn mime_table_covers_documents_and_archives() {
    assert_eq!(from_mime("application/pdf"), Some(FileCategory::Document));
    assert_eq!(from_mime("text/plain"), Some(FileCategory::Document));
    assert_eq!(from_mime("Application/ZIP"), Some(FileCategory::Archive));
    assert_eq!(
        from_mime("application/vnd.android.package-archive"),
        Some(FileCategory::Apk)
    );
    assert_eq!(from_mime("application/octet-stream"), None);
}

#[test]
fn extension_table_is_case_insensitive() {
    assert_eq!(from_extension("MKV"), Some(FileCategory::Video));
    assert_eq!(from_extension("Flac"), Some(FileCategory::Audio));
    assert_eq!(from_extension("xyz"), None);
}

#[test]
fn categorize_path_guesses_mime() {
    let (mime, category) = categorize_path(Path::new("/sdcard/Docs/report.pdf"));
    assert_eq!(mime.as_deref(), Some("application/pdf"));
    assert_eq!(category, FileCategory::Document);

    let (mime, category) = categorize_path(Path::new("/sdcard/NOTES"));
    assert!(mime.is_none());
    assert_eq!(category, FileCategory::Unknown);
}

#[test]
fn labels_parse_and_serialize() {
    assert_eq!(FileCategory::from_str("Images"), Ok(FileCategory::Image));
    assert_eq!(FileCategory::from_str("apps"), Ok(FileCategory::Apk));
    assert!(FileCategory::from_str("spreadsheets").is_err());

    assert_eq!(
        serde_json::to_string(&FileCategory::Apk).unwrap(),
        "\"APK\""
    );
    assert_eq!(
        serde_json::from_str::<FileCategory>("\"DOWNLOAD\"").unwrap(),
        FileCategory::Download
    );
    assert_eq!(FileCategory::Document.to_string(), "document");
}

#[test]
fn only_visual_media_has_previews() {
    assert!(FileCategory::Image.has_preview());
    assert!(FileCategory::Video.has_preview());
    assert!(!FileCategory::Audio.has_preview());
    assert!(!FileCategory::Document.has_preview());
}
