//! Intake entrypoints and implementations.
//!
//! Most callers should use [`ingest`] / [`validate_upload`] / [`fetch`] (from [`unified`]),
//! which:
//!
//! - pick CSV or JSON from the filename extension (or [`IngestionOptions::format`])
//! - decode, validate, load and summarize the upload
//! - optionally report success/failure/alerts to an [`IntakeObserver`]
//!
//! The building blocks are public as well:
//! - [`decode`]: bytes to text
//! - [`delimiter`]: CSV separator inference
//! - [`validate`]: structural checks
//! - [`csv`] / [`json`]: loaders
//! - [`preview`]: preview truncation and metadata

pub mod csv;
pub mod decode;
pub mod delimiter;
pub mod json;
pub mod observability;
pub mod preview;
pub mod unified;
pub mod validate;

pub use decode::{DecodedText, TextEncoding};
pub use delimiter::{detect_delimiter, Delimiter};
pub use observability::{
    CompositeObserver, FileObserver, IntakeContext, IntakeObserver, IntakeOperation,
    IntakeSeverity, IntakeStats, StdErrObserver,
};
pub use preview::{normalize, summarize, ColumnTypes, Metadata, Preview, StructureType};
pub use unified::{
    fetch, ingest, load, resolve_kind, severity_for_error, validate_upload, IngestOutcome,
    IngestionOptions,
};
pub use validate::{validate, ValidationDetails, ValidationReport};
