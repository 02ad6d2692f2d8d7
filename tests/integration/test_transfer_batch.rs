//! Integration tests for transfer batches: progress, partial failure, cancellation

use crate::fixtures::{CancelDuringCopy, CancelOnRename, write_file_sync};
use filecore::{
    CancellationToken, ProgressSink, TransferEngine, TransferEvent, TransferKind,
    TransferOptions, TransferRequest, TransferState, progress_channel,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

fn three_sources(temp: &TempDir) -> Vec<PathBuf> {
    vec![
        write_file_sync(temp.path().join("src/one.txt"), &[1u8; 100]).unwrap(),
        write_file_sync(temp.path().join("src/two.txt"), &[2u8; 200]).unwrap(),
        write_file_sync(temp.path().join("src/three.txt"), &[3u8; 300]).unwrap(),
    ]
}

fn dest_dir(temp: &TempDir) -> PathBuf {
    let dest = temp.path().join("dest");
    fs::create_dir_all(&dest).unwrap();
    dest
}

#[test]
fn test_batch_copy_event_stream() {
    let temp = TempDir::new().unwrap();
    let sources = three_sources(&temp);
    let dest = dest_dir(&temp);
    let (sink, events) = progress_channel();

    let report = TransferEngine::default().run_batch(
        &TransferRequest::copy(sources.clone(), &dest),
        &CancellationToken::new(),
        &sink,
    );

    assert!(report.is_complete());
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.bytes_transferred, 600);
    assert_eq!(report.outcome_message(TransferKind::Copy.verb()), "Copied 3 items");
    assert!(sources.iter().all(|s| s.exists()));
    assert_eq!(fs::read(dest.join("three.txt")).unwrap(), vec![3u8; 300]);

    let events: Vec<TransferEvent> = events.try_iter().collect();
    assert!(matches!(
        events.first(),
        Some(TransferEvent::Started {
            kind: TransferKind::Copy,
            total_bytes: 600,
            file_count: 3
        })
    ));
    assert!(matches!(events.last(), Some(TransferEvent::Finished(r)) if r.succeeded == 3));

    let fractions: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            TransferEvent::Progress(p) => Some(p.fraction),
            _ => None,
        })
        .collect();
    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));

    let mut state = TransferState::default();
    for event in &events {
        state.apply(event);
    }
    assert!(state.is_idle());
}

#[test]
fn test_batch_conflict_is_partial_failure() {
    let temp = TempDir::new().unwrap();
    let sources = three_sources(&temp);
    let dest = dest_dir(&temp);
    write_file_sync(dest.join("two.txt"), b"keep me").unwrap();

    let report = TransferEngine::default().run_batch(
        &TransferRequest::copy(sources, &dest),
        &CancellationToken::new(),
        &ProgressSink::disconnected(),
    );

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].code, "EEXIST");
    assert!(report.failures[0].path.ends_with("two.txt"));
    assert_eq!(report.outcome_message("Copied"), "Copied 2 of 3 items");
    assert_eq!(fs::read(dest.join("two.txt")).unwrap(), b"keep me");
    assert!(dest.join("three.txt").exists());
    assert!(report.into_result().is_err());
}

#[test]
fn test_cancel_between_files_keeps_finished_work() {
    let temp = TempDir::new().unwrap();
    let sources = three_sources(&temp);
    let dest = dest_dir(&temp);
    let token = CancellationToken::new();
    let ops = Arc::new(CancelOnRename::new(token.clone()));
    let engine = TransferEngine::with_ops(TransferOptions::default(), ops.clone());

    let report = engine.run_batch(
        &TransferRequest::relocate(sources.clone(), &dest),
        &token,
        &ProgressSink::disconnected(),
    );

    assert!(report.cancelled);
    assert_eq!(report.succeeded, 1);
    assert_eq!(ops.renames.load(Ordering::SeqCst), 1);
    assert!(dest.join("one.txt").exists());
    assert!(!sources[0].exists());
    assert!(sources[1].exists() && sources[2].exists());
    assert_eq!(
        report.outcome_message("Moved"),
        "Cancelled after 1 of 3 items"
    );
}

#[test]
fn test_cancel_mid_copy_discards_partial_target() {
    let temp = TempDir::new().unwrap();
    let source = write_file_sync(temp.path().join("src/large.bin"), &[7u8; 8192]).unwrap();
    let dest = dest_dir(&temp);
    let token = CancellationToken::new();
    let engine = TransferEngine::with_ops(
        TransferOptions {
            chunk_size: 1024,
            ..TransferOptions::default()
        },
        Arc::new(CancelDuringCopy {
            token: token.clone(),
        }),
    );

    let report = engine.run_batch(
        &TransferRequest::relocate(vec![source.clone()], &dest),
        &token,
        &ProgressSink::disconnected(),
    );

    assert!(report.cancelled);
    assert_eq!(report.succeeded, 0);
    assert!(source.exists());
    assert!(!dest.join("large.bin").exists());
}

#[test]
fn test_precancelled_batch_does_nothing() {
    let temp = TempDir::new().unwrap();
    let sources = three_sources(&temp);
    let dest = dest_dir(&temp);
    let token = CancellationToken::new();
    token.cancel();

    let report = TransferEngine::default().run_batch(
        &TransferRequest::copy(sources, &dest),
        &token,
        &ProgressSink::disconnected(),
    );

    assert!(report.cancelled);
    assert_eq!(report.succeeded, 0);
    assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
}

#[test]
fn test_spawned_batch_streams_to_subscriber() {
    let temp = TempDir::new().unwrap();
    let sources = three_sources(&temp);
    let dest = dest_dir(&temp);

    let handle = TransferEngine::default()
        .spawn_batch(TransferRequest::relocate(sources.clone(), &dest))
        .unwrap();

    let events: Vec<TransferEvent> = handle.events.iter().collect();
    let report = handle.join().unwrap();

    assert!(report.is_complete());
    assert!(matches!(events.last(), Some(TransferEvent::Finished(_))));
    assert!(sources.iter().all(|s| !s.exists()));
    assert_eq!(fs::read_dir(&dest).unwrap().count(), 3);
}
