//! Contract test for the on-disk trash journal format

use crate::fixtures::write_file_sync;
use filecore::services::trash::JOURNAL_FILE_NAME;
use filecore::{FileCategory, TrashOptions, TrashStore};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[test]
fn test_journal_field_names() {
    let temp = TempDir::new().unwrap();
    let store_dir = temp.path().join("store");
    let store = TrashStore::open(&store_dir, TrashOptions::default()).unwrap();
    let photo = write_file_sync(temp.path().join("cat.png"), &[0u8; 64]).unwrap();
    let notes = write_file_sync(temp.path().join("notes.txt"), b"todo").unwrap();

    store.move_to_trash(&photo).unwrap();
    store.move_to_trash(&notes).unwrap();

    let raw = fs::read_to_string(store_dir.join(JOURNAL_FILE_NAME)).unwrap();
    let journal: Vec<Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(journal.len(), 2);

    for entry in &journal {
        let object = entry.as_object().expect("record is an object");
        for key in [
            "id",
            "originalPath",
            "trashPath",
            "name",
            "size",
            "dateDeleted",
            "type",
            "preview",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert_eq!(object.len(), 8);
    }

    let image = journal.iter().find(|e| e["name"] == "cat.png").unwrap();
    assert_eq!(image["type"], "IMAGE");
    assert_eq!(image["size"], 64);
    assert!(image["preview"].is_string());

    let document = journal.iter().find(|e| e["name"] == "notes.txt").unwrap();
    assert_eq!(document["type"], "DOCUMENT");
    assert!(document["preview"].is_null());
}

#[test]
fn test_reads_externally_written_journal() {
    let temp = TempDir::new().unwrap();
    let store_dir = temp.path().join("store");
    let trash_file = write_file_sync(store_dir.join("trash/1000_old.zip"), &[1u8; 10]).unwrap();
    let original = temp.path().join("old.zip");
    let deleted = chrono::Utc::now().timestamp_millis() - 40 * DAY_MS;

    let journal = json!([{
        "id": 1000,
        "originalPath": original,
        "trashPath": trash_file,
        "name": "old.zip",
        "size": 10,
        "dateDeleted": deleted,
        "type": "ARCHIVE",
        "preview": null
    }]);
    fs::write(
        store_dir.join(JOURNAL_FILE_NAME),
        serde_json::to_vec(&journal).unwrap(),
    )
    .unwrap();

    let store = TrashStore::open(&store_dir, TrashOptions::default()).unwrap();
    let record = store.find(1000).unwrap().expect("record loaded");
    assert_eq!(record.category, FileCategory::Archive);
    assert_eq!(record.original_path, original);

    assert_eq!(store.cleanup_expired(30).unwrap(), 1);
    assert!(!trash_file.exists());
    assert!(store.records().unwrap().is_empty());
}

#[test]
fn test_new_ids_follow_existing_records() {
    let temp = TempDir::new().unwrap();
    let store_dir = temp.path().join("store");
    let future = chrono::Utc::now().timestamp_millis() + DAY_MS;
    let trash_file = write_file_sync(store_dir.join(format!("trash/{future}_x.txt")), b"x").unwrap();

    let journal = json!([{
        "id": future,
        "originalPath": temp.path().join("x.txt"),
        "trashPath": trash_file,
        "name": "x.txt",
        "size": 1,
        "dateDeleted": future,
        "type": "DOCUMENT",
        "preview": null
    }]);
    fs::write(
        store_dir.join(JOURNAL_FILE_NAME),
        serde_json::to_vec(&journal).unwrap(),
    )
    .unwrap();

    let store = TrashStore::open(&store_dir, TrashOptions::default()).unwrap();
    let path = write_file_sync(temp.path().join("y.txt"), b"y").unwrap();
    let record = store.move_to_trash(&path).unwrap();

    assert!(record.id > future);
}
