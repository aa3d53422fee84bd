use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IntakeError;
use crate::storage::FileId;
use crate::types::FileKind;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntakeSeverity {
    /// Informational event.
    Info,
    /// Rejected for policy reasons (e.g. an oversized upload).
    Warning,
    /// Rejected content.
    Error,
    /// Infrastructure failure, such as the store refusing a write.
    Critical,
}

/// Which entry point produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOperation {
    Validate,
    Ingest,
}

/// Context about an intake attempt.
#[derive(Debug, Clone)]
pub struct IntakeContext {
    pub filename: String,
    /// `None` when the kind could not be resolved.
    pub kind: Option<FileKind>,
    pub operation: IntakeOperation,
}

/// Stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeStats {
    pub bytes: usize,
    pub rows: usize,
    pub columns: usize,
    /// Set for successful ingestions.
    pub identifier: Option<FileId>,
}

/// Observer interface for intake outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IntakeObserver: Send + Sync {
    fn on_success(&self, _ctx: &IntakeContext, _stats: IntakeStats) {}

    fn on_failure(&self, _ctx: &IntakeContext, _severity: IntakeSeverity, _error: &IntakeError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IntakeContext, severity: IntakeSeverity, error: &IntakeError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans callbacks out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IntakeObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn IntakeObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IntakeObserver for CompositeObserver {
    fn on_success(&self, ctx: &IntakeContext, stats: IntakeStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IntakeContext, severity: IntakeSeverity, error: &IntakeError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IntakeContext, severity: IntakeSeverity, error: &IntakeError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

fn kind_label(kind: Option<FileKind>) -> &'static str {
    kind.map(|k| k.as_str()).unwrap_or("unknown")
}

/// Logs intake events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl IntakeObserver for StdErrObserver {
    fn on_success(&self, ctx: &IntakeContext, stats: IntakeStats) {
        eprintln!(
            "[intake][ok] op={:?} kind={} file={} bytes={} rows={} columns={}",
            ctx.operation,
            kind_label(ctx.kind),
            ctx.filename,
            stats.bytes,
            stats.rows,
            stats.columns
        );
    }

    fn on_failure(&self, ctx: &IntakeContext, severity: IntakeSeverity, error: &IntakeError) {
        eprintln!(
            "[intake][{:?}] op={:?} kind={} file={} err={}",
            severity,
            ctx.operation,
            kind_label(ctx.kind),
            ctx.filename,
            error
        );
    }

    fn on_alert(&self, ctx: &IntakeContext, severity: IntakeSeverity, error: &IntakeError) {
        eprintln!(
            "[ALERT][intake][{:?}] op={:?} kind={} file={} err={}",
            severity,
            ctx.operation,
            kind_label(ctx.kind),
            ctx.filename,
            error
        );
    }
}

/// Appends intake events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IntakeObserver for FileObserver {
    fn on_success(&self, ctx: &IntakeContext, stats: IntakeStats) {
        let id = stats
            .identifier
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        self.append_line(&format!(
            "{} ok op={:?} kind={} file={} bytes={} rows={} id={}",
            unix_ts(),
            ctx.operation,
            kind_label(ctx.kind),
            ctx.filename,
            stats.bytes,
            stats.rows,
            id
        ));
    }

    fn on_failure(&self, ctx: &IntakeContext, severity: IntakeSeverity, error: &IntakeError) {
        self.append_line(&format!(
            "{} fail severity={:?} op={:?} kind={} file={} err_kind={} err={}",
            unix_ts(),
            severity,
            ctx.operation,
            kind_label(ctx.kind),
            ctx.filename,
            error.kind(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IntakeContext, severity: IntakeSeverity, error: &IntakeError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} op={:?} kind={} file={} err_kind={} err={}",
            unix_ts(),
            severity,
            ctx.operation,
            kind_label(ctx.kind),
            ctx.filename,
            error.kind(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
