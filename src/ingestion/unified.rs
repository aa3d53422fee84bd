//! Upload orchestration.
//!
//! Most callers should use [`ingest`], which runs the whole upload path:
//!
//! 1. resolve the kind (explicit [`IngestionOptions::format`] or the filename extension)
//! 2. decode, detect the CSV delimiter, validate
//! 3. load and summarize into a [`Preview`]
//! 4. hand the original bytes to the [`FileStore`]
//!
//! Any failure stops the pipeline before step 4, so a failed upload is never stored. Store
//! failures are returned as [`IntakeError::Persistence`] without retrying.
//!
//! ```rust
//! use tabular_intake::ingestion::{fetch, ingest, IngestionOptions};
//! use tabular_intake::storage::MemoryStore;
//! use tabular_intake::types::RawUpload;
//!
//! # fn main() -> Result<(), tabular_intake::IntakeError> {
//! let store = MemoryStore::new();
//! let upload = RawUpload::new("prices.csv", "item;price\napple;3\npear;4\n");
//!
//! let outcome = ingest(upload, &store, &IngestionOptions::default())?;
//! assert_eq!(outcome.preview.metadata.total_rows, 2);
//! assert_eq!(outcome.preview.metadata.columns, vec!["item", "price"]);
//!
//! let stored = fetch(&store, &outcome.identifier.to_string())?;
//! assert_eq!(stored.filename, "prices.csv");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn, Level};

use crate::config::IntakeLimits;
use crate::error::{IntakeError, IntakeResult};
use crate::response::FileInfo;
use crate::storage::{FileId, FileStore, StoredFile};
use crate::types::{FileKind, Loaded, RawUpload};

use super::csv::load_csv;
use super::decode::{decode, DecodedText, TextEncoding};
use super::delimiter::{detect_delimiter, Delimiter};
use super::json::{load_json, JsonDetails};
use super::observability::{
    IntakeContext, IntakeObserver, IntakeOperation, IntakeSeverity, IntakeStats,
};
use super::preview::{summarize, Preview};
use super::validate::{check_size, validate_with, ValidationDetails, ValidationReport};

/// Options controlling validation and ingestion.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, the kind is inferred from the filename extension.
    pub format: Option<FileKind>,
    pub limits: IntakeLimits,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IntakeObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IntakeSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("limits", &self.limits)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            limits: IntakeLimits::default(),
            observer: None,
            alert_at_or_above: IntakeSeverity::Critical,
        }
    }
}

/// Result of a successful [`ingest`].
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// Identifier the original bytes were stored under.
    pub identifier: FileId,
    pub file_info: FileInfo,
    pub kind: FileKind,
    pub encoding: TextEncoding,
    /// Delimiter used for CSV uploads.
    pub delimiter: Option<Delimiter>,
    pub preview: Preview,
}

/// Pick the kind for `filename`, honoring an explicit override.
pub fn resolve_kind(filename: &str, format: Option<FileKind>) -> IntakeResult<FileKind> {
    if let Some(kind) = format {
        return Ok(kind);
    }
    FileKind::from_filename(filename).ok_or_else(|| {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        IntakeError::UnsupportedKind(if ext.is_empty() {
            filename.to_string()
        } else {
            format!(".{ext}")
        })
    })
}

/// Load already validated text.
pub fn load(text: &DecodedText, kind: FileKind, delimiter: Option<Delimiter>) -> IntakeResult<Loaded> {
    match kind {
        FileKind::Csv => load_csv(text.as_str(), delimiter.unwrap_or_default()).map(Loaded::Table),
        FileKind::Json => load_json(text.as_str()).map(Loaded::Records),
    }
}

/// Validate an upload without loading or storing it.
pub fn validate_upload(
    upload: &RawUpload,
    options: &IngestionOptions,
) -> IntakeResult<ValidationReport> {
    let start = Instant::now();
    let span = tracing::span!(Level::INFO, "intake.validate", filename = %upload.filename);
    let _guard = span.enter();

    let kind = resolve_kind(&upload.filename, options.format);
    let ctx = IntakeContext {
        filename: upload.filename.clone(),
        kind: kind.as_ref().ok().copied(),
        operation: IntakeOperation::Validate,
    };

    let result = kind.and_then(|kind| {
        check_size(upload.len(), &options.limits)?;
        let text = decode(&upload.bytes);
        let delimiter = detect_for(&text, kind, &options.limits);
        validate_with(&text, kind, delimiter, &options.limits)
    });

    let elapsed_micros = start.elapsed().as_micros();
    match &result {
        Ok(report) => {
            let (rows, columns) = details_counts(&report.details);
            info!(kind = %report.kind, rows, columns, elapsed_micros, "intake_valid");
            notify_success(
                options,
                &ctx,
                IntakeStats {
                    bytes: upload.len(),
                    rows,
                    columns,
                    identifier: None,
                },
            );
        }
        Err(err) => {
            warn!(error = %err, error_kind = %err.kind(), elapsed_micros, "intake_invalid");
            notify_failure(options, &ctx, err);
        }
    }
    result
}

/// Validate, load, summarize and store an upload.
///
/// The store is written exactly once on success and never on failure.
pub fn ingest(
    upload: RawUpload,
    store: &dyn FileStore,
    options: &IngestionOptions,
) -> IntakeResult<IngestOutcome> {
    let start = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "intake.ingest",
        filename = %upload.filename,
        size = upload.len()
    );
    let _guard = span.enter();

    let kind = resolve_kind(&upload.filename, options.format);
    let ctx = IntakeContext {
        filename: upload.filename.clone(),
        kind: kind.as_ref().ok().copied(),
        operation: IntakeOperation::Ingest,
    };

    let result = kind.and_then(|kind| ingest_inner(upload, kind, store, &options.limits));

    let elapsed_micros = start.elapsed().as_micros();
    match &result {
        Ok(outcome) => {
            let meta = &outcome.preview.metadata;
            info!(
                identifier = %outcome.identifier,
                kind = %outcome.kind,
                encoding = %outcome.encoding,
                rows = meta.total_rows,
                columns = meta.total_columns,
                elapsed_micros,
                "intake_success"
            );
            notify_success(
                options,
                &ctx,
                IntakeStats {
                    bytes: outcome.file_info.size,
                    rows: meta.total_rows,
                    columns: meta.total_columns,
                    identifier: Some(outcome.identifier),
                },
            );
        }
        Err(err) => {
            warn!(error = %err, error_kind = %err.kind(), elapsed_micros, "intake_failure");
            notify_failure(options, &ctx, err);
        }
    }
    result
}

fn ingest_inner(
    upload: RawUpload,
    kind: FileKind,
    store: &dyn FileStore,
    limits: &IntakeLimits,
) -> IntakeResult<IngestOutcome> {
    // Reject oversized uploads before decoding them.
    check_size(upload.len(), limits)?;

    let text = decode(&upload.bytes);
    let delimiter = detect_for(&text, kind, limits);
    let report = validate_with(&text, kind, delimiter, limits)?;
    let loaded = load(&text, kind, report.delimiter)?;
    let preview = summarize(&loaded, limits);

    let identifier = store
        .save(&upload.bytes, &upload.filename)
        .map_err(IntakeError::Persistence)?;

    let RawUpload {
        bytes,
        filename,
        content_type,
    } = upload;
    Ok(IngestOutcome {
        identifier,
        file_info: FileInfo {
            filename,
            content_type,
            size: bytes.len(),
        },
        kind,
        encoding: text.encoding,
        delimiter: report.delimiter,
        preview,
    })
}

/// Retrieve a stored upload by its textual identifier.
pub fn fetch(store: &dyn FileStore, identifier: &str) -> IntakeResult<StoredFile> {
    let id: FileId = identifier.parse()?;
    let stored = store.load(&id)?;
    info!(identifier = %id, size = stored.bytes.len(), "intake_fetch");
    Ok(stored)
}

fn detect_for(text: &DecodedText, kind: FileKind, limits: &IntakeLimits) -> Option<Delimiter> {
    match kind {
        FileKind::Csv => Some(detect_delimiter(text.as_str(), limits.delimiter_sample_lines)),
        FileKind::Json => None,
    }
}

fn details_counts(details: &ValidationDetails) -> (usize, usize) {
    match details {
        ValidationDetails::Csv { rows, columns } => (*rows, *columns),
        ValidationDetails::Json(JsonDetails::List { items }) => (*items, 0),
        ValidationDetails::Json(JsonDetails::Dict { keys }) => (1, *keys),
    }
}

fn notify_success(options: &IngestionOptions, ctx: &IntakeContext, stats: IntakeStats) {
    if let Some(obs) = options.observer.as_ref() {
        obs.on_success(ctx, stats);
    }
}

fn notify_failure(options: &IngestionOptions, ctx: &IntakeContext, err: &IntakeError) {
    if let Some(obs) = options.observer.as_ref() {
        let sev = severity_for_error(err);
        obs.on_failure(ctx, sev, err);
        if sev >= options.alert_at_or_above {
            obs.on_alert(ctx, sev, err);
        }
    }
}

/// Classify a failure for observers.
pub fn severity_for_error(e: &IntakeError) -> IntakeSeverity {
    match e {
        IntakeError::Persistence(_) => IntakeSeverity::Critical,
        IntakeError::TooLarge { .. } => IntakeSeverity::Warning,
        IntakeError::NotFound(_) => IntakeSeverity::Info,
        IntakeError::UnsupportedKind(_)
        | IntakeError::Unparsable { .. }
        | IntakeError::Empty { .. }
        | IntakeError::UnsupportedStructure(_) => IntakeSeverity::Error,
    }
}
