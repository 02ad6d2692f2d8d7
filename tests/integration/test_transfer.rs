//! Integration tests for single-item copy and move

use crate::fixtures::{CrossDeviceOps, UndeletableOps, write_file_sync};
use filecore::{Error, TransferEngine, TransferOptions};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn small_chunks() -> TransferOptions {
    TransferOptions {
        chunk_size: 1024,
        ..TransferOptions::default()
    }
}

#[test]
fn test_copy_file_reports_final_progress() {
    let temp = TempDir::new().unwrap();
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let source = write_file_sync(temp.path().join("src/big.bin"), &payload).unwrap();
    let dest = temp.path().join("dest");
    fs::create_dir_all(&dest).unwrap();

    let engine = TransferEngine::new(small_chunks());
    let mut calls = Vec::new();
    let target = engine
        .copy(&source, &dest, &mut |done, total| calls.push((done, total)))
        .unwrap();

    assert_eq!(target, dest.join("big.bin"));
    assert_eq!(fs::read(&target).unwrap(), payload);
    assert!(source.exists());
    assert_eq!(calls.last(), Some(&(10_000, 10_000)));
    assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0));
}

#[test]
fn test_copy_preserves_modification_time() {
    let temp = TempDir::new().unwrap();
    let source = write_file_sync(temp.path().join("old.txt"), b"aged").unwrap();
    let then = std::time::SystemTime::now() - Duration::from_secs(3 * 24 * 60 * 60);
    fs::File::options()
        .write(true)
        .open(&source)
        .unwrap()
        .set_modified(then)
        .unwrap();
    let dest = temp.path().join("dest");
    fs::create_dir_all(&dest).unwrap();

    let target = TransferEngine::default()
        .copy(&source, &dest, &mut |_, _| {})
        .unwrap();

    let copied = fs::metadata(&target).unwrap().modified().unwrap();
    let drift = copied
        .duration_since(then)
        .unwrap_or_else(|e| e.duration());
    assert!(drift < Duration::from_secs(2));
}

#[test]
fn test_copy_directory_tree() {
    let temp = TempDir::new().unwrap();
    write_file_sync(temp.path().join("tree/a.txt"), b"a").unwrap();
    write_file_sync(temp.path().join("tree/sub/b.txt"), b"bb").unwrap();
    fs::create_dir_all(temp.path().join("tree/empty")).unwrap();
    let dest = temp.path().join("dest");
    fs::create_dir_all(&dest).unwrap();

    let mut last = (0, 0);
    let target = TransferEngine::default()
        .copy(&temp.path().join("tree"), &dest, &mut |d, t| last = (d, t))
        .unwrap();

    assert_eq!(fs::read(target.join("sub/b.txt")).unwrap(), b"bb");
    assert!(target.join("empty").is_dir());
    assert_eq!(last, (3, 3));
}

#[test]
fn test_copy_never_overwrites() {
    let temp = TempDir::new().unwrap();
    let source = write_file_sync(temp.path().join("src/same.txt"), b"new").unwrap();
    let existing = write_file_sync(temp.path().join("dest/same.txt"), b"old").unwrap();

    let err = TransferEngine::default()
        .copy(&source, &temp.path().join("dest"), &mut |_, _| {})
        .unwrap_err();

    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(fs::read(&existing).unwrap(), b"old");
}

#[test]
fn test_copy_into_missing_destination() {
    let temp = TempDir::new().unwrap();
    let source = write_file_sync(temp.path().join("a.txt"), b"a").unwrap();

    let err = TransferEngine::default()
        .copy(&source, &temp.path().join("nope"), &mut |_, _| {})
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_copy_directory_into_itself_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_file_sync(temp.path().join("loop/inner/f.txt"), b"f").unwrap();

    let err = TransferEngine::default()
        .copy(
            &temp.path().join("loop"),
            &temp.path().join("loop/inner"),
            &mut |_, _| {},
        )
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(!temp.path().join("loop/inner/loop").exists());
}

#[test]
fn test_move_by_rename() {
    let temp = TempDir::new().unwrap();
    let source = write_file_sync(temp.path().join("a/file.txt"), b"12345").unwrap();
    let dest = temp.path().join("b");
    fs::create_dir_all(&dest).unwrap();

    let mut calls = Vec::new();
    let target = TransferEngine::default()
        .move_to(&source, &dest, &mut |d, t| calls.push((d, t)))
        .unwrap();

    assert!(!source.exists());
    assert_eq!(fs::read(&target).unwrap(), b"12345");
    assert_eq!(calls, vec![(5, 5)]);
}

#[test]
fn test_cross_device_move_copies_then_deletes() {
    let temp = TempDir::new().unwrap();
    write_file_sync(temp.path().join("a/dir/x.txt"), b"xyz").unwrap();
    let dest = temp.path().join("b");
    fs::create_dir_all(&dest).unwrap();

    let engine = TransferEngine::with_ops(small_chunks(), Arc::new(CrossDeviceOps));
    let mut calls = Vec::new();
    let target = engine
        .move_to(&temp.path().join("a/dir"), &dest, &mut |d, t| calls.push((d, t)))
        .unwrap();

    assert!(!temp.path().join("a/dir").exists());
    assert_eq!(fs::read(target.join("x.txt")).unwrap(), b"xyz");

    assert!(!calls.is_empty());
    assert!(calls.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    assert!(calls.iter().all(|&(_, total)| total == 3));
    assert_eq!(calls.last().map(|&(done, _)| done), Some(3));
}

#[test]
fn test_failed_source_delete_rolls_back_move() {
    let temp = TempDir::new().unwrap();
    let source = write_file_sync(temp.path().join("a/pinned.txt"), b"pinned").unwrap();
    let dest = temp.path().join("b");
    fs::create_dir_all(&dest).unwrap();

    let engine = TransferEngine::with_ops(small_chunks(), Arc::new(UndeletableOps));
    let err = engine.move_to(&source, &dest, &mut |_, _| {}).unwrap_err();

    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(fs::read(&source).unwrap(), b"pinned");
    assert!(!dest.join("pinned.txt").exists());
}
