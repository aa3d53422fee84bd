use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::ErrorKind;

/// Events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    RunStarted { uploads: usize },
    ThrottleWaited { duration: Duration },
    UploadStarted { index: usize, filename: String },
    /// `error` is `None` on success.
    UploadFinished { index: usize, error: Option<ErrorKind> },
    RunFinished {
        elapsed: Duration,
        metrics: BatchMetricsSnapshot,
    },
}

/// Observer hook for batch events.
pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &BatchEvent);
}

/// A simple stderr logger for batch events.
#[derive(Default)]
pub struct StdErrBatchObserver;

impl BatchObserver for StdErrBatchObserver {
    fn on_event(&self, event: &BatchEvent) {
        eprintln!("{event:?}");
    }
}

/// Live counters for the current batch run.
///
/// The engine updates these while it runs; callers can snapshot them at any time.
pub struct BatchMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    uploads_started: AtomicU64,
    uploads_finished: AtomicU64,
    uploads_failed: AtomicU64,
    bytes_processed: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_uploads: AtomicUsize,
    max_active_uploads: AtomicUsize,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            uploads_started: AtomicU64::new(0),
            uploads_finished: AtomicU64::new(0),
            uploads_failed: AtomicU64::new(0),
            bytes_processed: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            active_uploads: AtomicUsize::new(0),
            max_active_uploads: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.uploads_started.store(0, Ordering::SeqCst);
        self.uploads_finished.store(0, Ordering::SeqCst);
        self.uploads_failed.store(0, Ordering::SeqCst);
        self.bytes_processed.store(0, Ordering::SeqCst);
        self.throttle_wait_ns.store(0, Ordering::SeqCst);
        self.active_uploads.store(0, Ordering::SeqCst);
        self.max_active_uploads.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_upload_start(&self, bytes: usize) {
        let _ = self.uploads_started.fetch_add(1, Ordering::SeqCst);
        let _ = self.bytes_processed.fetch_add(bytes as u64, Ordering::SeqCst);
        let now = self.active_uploads.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_uploads, now);
    }

    pub fn on_upload_end(&self, ok: bool) {
        let _ = self.uploads_finished.fetch_add(1, Ordering::SeqCst);
        if !ok {
            let _ = self.uploads_failed.fetch_add(1, Ordering::SeqCst);
        }
        let _ = self.active_uploads.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        let add = d.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self.throttle_wait_ns.fetch_add(add, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> BatchMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };
        // The two counters are read separately and may be mid-update.
        let finished = self.uploads_finished.load(Ordering::SeqCst);
        let failed = self.uploads_failed.load(Ordering::SeqCst);

        BatchMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            uploads_started: self.uploads_started.load(Ordering::SeqCst),
            uploads_finished: finished,
            uploads_succeeded: finished.saturating_sub(failed),
            uploads_failed: failed,
            bytes_processed: self.bytes_processed.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_uploads: self.max_active_uploads.load(Ordering::SeqCst),
        }
    }
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    let _ = dst.fetch_max(now, Ordering::SeqCst);
}

/// Immutable snapshot of [`BatchMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub uploads_started: u64,
    pub uploads_finished: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
    pub bytes_processed: u64,
    pub throttle_wait: Duration,
    pub max_active_uploads: usize,
}

impl fmt::Display for BatchMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, uploads={}/{}, ok={}, failed={}, bytes={}, max_active={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.uploads_finished,
            self.uploads_started,
            self.uploads_succeeded,
            self.uploads_failed,
            self.bytes_processed,
            self.max_active_uploads,
            self.throttle_wait,
            self.elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_successes() {
        let m = BatchMetrics::new();
        m.begin_run();
        m.on_upload_start(10);
        m.on_upload_start(20);
        m.on_upload_end(true);
        m.on_upload_end(false);

        let snap = m.snapshot();
        assert_eq!(snap.run_id, 1);
        assert_eq!(snap.uploads_finished, 2);
        assert_eq!(snap.uploads_succeeded, 1);
        assert_eq!(snap.uploads_failed, 1);
        assert_eq!(snap.bytes_processed, 30);
        assert_eq!(snap.max_active_uploads, 2);
        assert_eq!(snap.elapsed, None);
    }

    #[test]
    fn snapshot_between_counter_updates_does_not_underflow() {
        // A reset that has cleared `finished` but not yet `failed`.
        let m = BatchMetrics::new();
        m.uploads_finished.store(0, Ordering::SeqCst);
        m.uploads_failed.store(3, Ordering::SeqCst);

        let snap = m.snapshot();
        assert_eq!(snap.uploads_succeeded, 0);
        assert_eq!(snap.uploads_failed, 3);
    }
}
