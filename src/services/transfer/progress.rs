//! Progress reporting primitives for transfer batches.

use crate::models::{BatchReport, TransferKind, TransferProgress};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

const DEFAULT_INTERVAL: Duration = Duration::from_millis(333);
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Time-based throttler governing progress event emission.
#[derive(Debug)]
pub struct ProgressThrottler {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl Default for ProgressThrottler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressThrottler {
    /// Construct a throttler allowing roughly three updates per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_INTERVAL)
    }

    /// Construct a throttler with the supplied minimum interval.
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            last_emit: None,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether an update may be emitted at `now`. The first call always passes.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = self
            .last_emit
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last_emit = Some(now);
        }
        due
    }
}

/// Bytes per second over `elapsed`, or `None` when no time has passed.
#[must_use]
pub fn compute_throughput(bytes: u64, elapsed: Duration) -> Option<u64> {
    let nanos = elapsed.as_nanos();
    if nanos == 0 {
        return None;
    }

    let numerator = u128::from(bytes) * 1_000_000_000u128;
    let rate = numerator / nanos;
    u64::try_from(rate.min(u128::from(u64::MAX))).ok()
}

/// Translates per-file byte counts into batch-wide [`TransferProgress`].
///
/// The batch fraction is `(bytes of finished files + bytes of the current
/// file) / total batch bytes`. Throughput is averaged since the batch started,
/// not per file.
#[derive(Debug)]
pub struct BatchTracker {
    kind: TransferKind,
    total_bytes: u64,
    file_count: usize,
    completed_bytes: u64,
    started: Instant,
    throttler: ProgressThrottler,
}

impl BatchTracker {
    #[must_use]
    pub fn new(kind: TransferKind, total_bytes: u64, file_count: usize, interval: Duration) -> Self {
        Self {
            kind,
            total_bytes,
            file_count,
            completed_bytes: 0,
            started: Instant::now(),
            throttler: ProgressThrottler::with_interval(interval),
        }
    }

    /// Build a snapshot unconditionally.
    #[must_use]
    pub fn snapshot(
        &self,
        now: Instant,
        current_file: &str,
        file_index: usize,
        file_bytes: u64,
    ) -> TransferProgress {
        let transferred = self.completed_bytes + file_bytes;
        let elapsed = now.saturating_duration_since(self.started);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let fraction = if self.total_bytes == 0 {
            1.0
        } else {
            (transferred as f64 / self.total_bytes as f64).min(1.0) as f32
        };

        TransferProgress {
            current_file: current_file.to_string(),
            kind: self.kind,
            fraction,
            bytes_transferred: transferred,
            total_bytes: self.total_bytes,
            throughput_bytes_per_sec: compute_throughput(transferred, elapsed),
            file_index,
            file_count: self.file_count,
        }
    }

    /// Build a snapshot if the throttling interval allows one.
    pub fn consider(
        &mut self,
        now: Instant,
        current_file: &str,
        file_index: usize,
        file_bytes: u64,
    ) -> Option<TransferProgress> {
        if self.throttler.ready(now) {
            Some(self.snapshot(now, current_file, file_index, file_bytes))
        } else {
            None
        }
    }

    /// Account a finished (or skipped) file towards the batch total.
    pub fn complete_file(&mut self, bytes: u64) {
        self.completed_bytes += bytes;
    }

    #[must_use]
    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes
    }
}

/// Events published by a running batch.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    Started {
        kind: TransferKind,
        total_bytes: u64,
        file_count: usize,
    },
    Progress(TransferProgress),
    /// Terminal event: completion, cancellation, or failure, per the report.
    Finished(BatchReport),
}

/// Subscriber-side view of a transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TransferState {
    #[default]
    Idle,
    Running(TransferProgress),
}

impl TransferState {
    pub fn apply(&mut self, event: &TransferEvent) {
        *self = match event {
            TransferEvent::Started {
                kind,
                total_bytes,
                file_count,
            } => TransferState::Running(TransferProgress {
                current_file: String::new(),
                kind: *kind,
                fraction: 0.0,
                bytes_transferred: 0,
                total_bytes: *total_bytes,
                throughput_bytes_per_sec: None,
                file_index: 0,
                file_count: *file_count,
            }),
            TransferEvent::Progress(progress) => TransferState::Running(progress.clone()),
            TransferEvent::Finished(_) => TransferState::Idle,
        };
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, TransferState::Idle)
    }
}

/// Publishing half of a progress channel. Cheap to clone, safe to share
/// across threads; publishing after the subscriber went away is a no-op.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<Sender<TransferEvent>>,
}

impl ProgressSink {
    /// A sink with no subscriber.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: TransferEvent) {
        if let Some(tx) = &self.tx
            && tx.send(event).is_err()
        {
            log::trace!("Progress subscriber is gone; dropping event");
        }
    }
}

/// Create a connected sink and its subscriber.
#[must_use]
pub fn progress_channel() -> (ProgressSink, Receiver<TransferEvent>) {
    let (tx, rx) = mpsc::channel();
    (ProgressSink { tx: Some(tx) }, rx)
}
