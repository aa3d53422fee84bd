//! Batch engine for ingesting many uploads with configurable parallelism.
//!
//! This module sits "above" [`crate::ingestion`] and provides:
//!
//! - Parallel execution of [`ingest`] / [`validate_upload`] over independent uploads
//! - Resource limits / throttling (uploads in flight)
//! - Real-time metrics + observer hooks for monitoring
//!
//! Results always come back in input order. Uploads share nothing except the store.

mod observer;
mod semaphore;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::error::{IntakeError, IntakeResult};
use crate::ingestion::{ingest, validate_upload, IngestOutcome, IngestionOptions, ValidationReport};
use crate::storage::FileStore;
use crate::types::RawUpload;

pub use observer::{
    BatchEvent, BatchMetrics, BatchMetricsSnapshot, BatchObserver, StdErrBatchObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`BatchEngine`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on uploads processed at the same time.
    ///
    /// Each upload is held in memory as text, table and preview while in flight, so this bounds
    /// the working set independently of `num_threads`.
    pub max_in_flight: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            max_in_flight: n.max(1),
        }
    }
}

/// Runs the upload pipeline over batches of independent uploads.
pub struct BatchEngine {
    pool: ThreadPool,
    opts: BatchOptions,
    observer: Option<Arc<dyn BatchObserver>>,
    metrics: Arc<BatchMetrics>,
}

impl BatchEngine {
    /// Create a new engine with the given options.
    ///
    /// # Panics
    ///
    /// Panics if `max_in_flight == 0` or `num_threads == Some(0)`.
    pub fn new(opts: BatchOptions) -> Result<Self, ThreadPoolBuildError> {
        assert!(opts.max_in_flight > 0, "max_in_flight must be > 0");
        if let Some(n) = opts.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("intake-batch-{i}"))
            .build()?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(BatchMetrics::new()),
        })
    }

    /// Attach an observer for batch events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time batch metrics.
    pub fn metrics(&self) -> Arc<BatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Ingest every upload into `store`.
    ///
    /// One result per upload, in input order. A failed upload does not affect the others.
    pub fn ingest_all(
        &self,
        uploads: Vec<RawUpload>,
        store: &dyn FileStore,
        options: &IngestionOptions,
    ) -> Vec<IntakeResult<IngestOutcome>> {
        self.run(
            uploads,
            |u| (u.filename.clone(), u.len()),
            |u| ingest(u, store, options),
        )
    }

    /// Validate every upload without storing anything.
    pub fn validate_all(
        &self,
        uploads: &[RawUpload],
        options: &IngestionOptions,
    ) -> Vec<IntakeResult<ValidationReport>> {
        self.run(
            uploads.iter().collect(),
            |u| (u.filename.clone(), u.len()),
            |u| validate_upload(u, options),
        )
    }

    fn run<T, R, D, F>(&self, items: Vec<T>, describe: D, work: F) -> Vec<IntakeResult<R>>
    where
        T: Send,
        R: Send,
        D: Fn(&T) -> (String, usize) + Send + Sync,
        F: Fn(T) -> IntakeResult<R> + Send + Sync,
    {
        self.pool.install(|| {
            let start = Instant::now();
            self.metrics.begin_run();
            self.emit(BatchEvent::RunStarted {
                uploads: items.len(),
            });

            let sem = Semaphore::new(self.opts.max_in_flight);

            let out: Vec<IntakeResult<R>> = items
                .into_par_iter()
                .enumerate()
                .map(|(index, item)| {
                    let waited = sem.acquire();
                    if waited > Duration::ZERO {
                        self.metrics.on_throttle_wait(waited);
                        self.emit(BatchEvent::ThrottleWaited { duration: waited });
                    }

                    let (filename, bytes) = describe(&item);
                    self.metrics.on_upload_start(bytes);
                    self.emit(BatchEvent::UploadStarted { index, filename });

                    let result = work(item);

                    self.metrics.on_upload_end(result.is_ok());
                    self.emit(BatchEvent::UploadFinished {
                        index,
                        error: result.as_ref().err().map(IntakeError::kind),
                    });
                    sem.release();
                    result
                })
                .collect();

            self.metrics.end_run(start.elapsed());
            let metrics = self.metrics.snapshot();
            tracing::info!(%metrics, "intake_batch_finished");
            self.emit(BatchEvent::RunFinished {
                elapsed: start.elapsed(),
                metrics,
            });

            out
        })
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchEngine, BatchOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::{ErrorKind, IntakeError};
    use crate::execution::{BatchEvent, BatchObserver};
    use crate::ingestion::IngestionOptions;
    use crate::storage::{FileId, FileStore, MemoryStore, StoreError, StoredFile};
    use crate::types::RawUpload;

    fn csv_uploads(n: usize) -> Vec<RawUpload> {
        (0..n)
            .map(|i| RawUpload::new(format!("batch_{i}.csv"), format!("id,value\n{i},{}\n", i * 2)))
            .collect()
    }

    /// Delegates to a [`MemoryStore`] after a short sleep so uploads overlap.
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
    }

    impl FileStore for SlowStore {
        fn save(&self, bytes: &[u8], filename: &str) -> Result<FileId, StoreError> {
            std::thread::sleep(self.delay);
            self.inner.save(bytes, filename)
        }

        fn load(&self, id: &FileId) -> Result<StoredFile, StoreError> {
            self.inner.load(id)
        }
    }

    struct ConcurrencyObserver {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ConcurrencyObserver {
        fn new() -> Self {
            Self {
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }
        fn max(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }
    }

    impl BatchObserver for ConcurrencyObserver {
        fn on_event(&self, event: &BatchEvent) {
            match event {
                BatchEvent::UploadStarted { .. } => {
                    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                    let _ = self.max_active.fetch_max(now, Ordering::SeqCst);
                }
                BatchEvent::UploadFinished { .. } => {
                    let _ = self.active.fetch_sub(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn results_keep_input_order() {
        let engine = BatchEngine::new(BatchOptions {
            num_threads: Some(4),
            max_in_flight: 4,
        })
        .unwrap();
        let store = MemoryStore::new();

        let out = engine.ingest_all(csv_uploads(20), &store, &IngestionOptions::default());

        assert_eq!(out.len(), 20);
        for (i, r) in out.iter().enumerate() {
            let outcome = r.as_ref().unwrap();
            assert_eq!(outcome.file_info.filename, format!("batch_{i}.csv"));
        }
        assert_eq!(store.len(), 20);
    }

    #[test]
    fn failures_stay_isolated() {
        let engine = BatchEngine::new(BatchOptions {
            num_threads: Some(2),
            max_in_flight: 2,
        })
        .unwrap();
        let store = MemoryStore::new();
        let uploads = vec![
            RawUpload::new("good.csv", "a,b\n1,2\n"),
            RawUpload::new("bad.txt", "whatever"),
            RawUpload::new("empty.json", "[]"),
            RawUpload::new("good.json", r#"[{"a": 1}]"#),
        ];

        let out = engine.ingest_all(uploads, &store, &IngestionOptions::default());

        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(IntakeError::UnsupportedKind(_))));
        assert!(matches!(out[2], Err(IntakeError::Empty { .. })));
        assert!(out[3].is_ok());
        assert_eq!(store.len(), 2);

        let snap = engine.metrics().snapshot();
        assert_eq!(snap.uploads_started, 4);
        assert_eq!(snap.uploads_succeeded, 2);
        assert_eq!(snap.uploads_failed, 2);
    }

    #[test]
    fn max_in_flight_throttles_upload_concurrency() {
        let observer = Arc::new(ConcurrencyObserver::new());
        let obs_trait: Arc<dyn BatchObserver> = observer.clone();
        let engine = BatchEngine::new(BatchOptions {
            num_threads: Some(4),
            max_in_flight: 1,
        })
        .unwrap()
        .with_observer(obs_trait);
        let store = SlowStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(2),
        };

        let out = engine.ingest_all(csv_uploads(16), &store, &IngestionOptions::default());

        assert!(out.iter().all(|r| r.is_ok()));
        assert_eq!(observer.max(), 1);

        let snap = engine.metrics().snapshot();
        assert_eq!(snap.max_active_uploads, 1);
        assert!(snap.throttle_wait > Duration::ZERO);
        assert!(snap.elapsed.is_some());
    }

    #[test]
    fn validate_all_reports_without_storing() {
        let engine = BatchEngine::new(BatchOptions::default()).unwrap();
        let uploads = vec![
            RawUpload::new("ok.csv", "x;y\n1;2\n3;4\n"),
            RawUpload::new("nested.json", r#"{"a": {"b": 1}}"#),
        ];

        let out = engine.validate_all(&uploads, &IngestionOptions::default());

        assert_eq!(out[0].as_ref().unwrap().message(), "CSV file is valid");
        assert_eq!(
            out[1].as_ref().unwrap_err().kind(),
            ErrorKind::UnsupportedStructure
        );
        let snap = engine.metrics().snapshot();
        assert_eq!(snap.uploads_finished, 2);
        assert_eq!(
            snap.bytes_processed,
            uploads.iter().map(|u| u.len() as u64).sum::<u64>()
        );
    }
}
