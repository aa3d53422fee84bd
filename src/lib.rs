//! `tabular-intake` accepts uploaded CSV and JSON files, checks that they are well-formed tabular
//! data, stores the original bytes under a fresh identifier and returns a bounded preview plus
//! metadata describing the whole dataset.
//!
//! The primary entrypoint is [`ingestion::ingest`], which picks the format from the filename
//! extension (or you can force one via [`ingestion::IngestionOptions`]).
//!
//! ## What you can upload
//!
//! - **CSV**: `.csv`, separated by comma, semicolon, tab or pipe (detected automatically)
//! - **JSON**: `.json`, either a list of flat objects or a single flat object
//!
//! Text is decoded as UTF-8 when possible and as windows-1252 otherwise. Uploads above
//! [`config::MAX_UPLOAD_BYTES`] are rejected before they are read.
//!
//! ## What you get back
//!
//! [`ingestion::IngestOutcome`] carries the [`storage::FileId`] the bytes were saved under and a
//! [`ingestion::Preview`]: at most 10 CSV rows or 100 JSON elements, with
//! [`ingestion::Metadata`] (row/column counts, column names, inferred types, memory estimate)
//! computed over the full dataset. [`response`] turns outcomes and errors into client-facing
//! bodies.
//!
//! ## Quick example
//!
//! ```rust
//! use tabular_intake::ingestion::{ingest, IngestionOptions};
//! use tabular_intake::storage::MemoryStore;
//! use tabular_intake::types::{DataType, RawUpload};
//!
//! # fn main() -> Result<(), tabular_intake::IntakeError> {
//! let store = MemoryStore::new();
//! let upload = RawUpload::new("scores.csv", "name,score\nada,9.5\nlin,7\n");
//!
//! let outcome = ingest(upload, &store, &IngestionOptions::default())?;
//! let meta = &outcome.preview.metadata;
//! assert_eq!(meta.total_rows, 2);
//! assert_eq!(meta.dtypes.as_ref().unwrap().get("score"), Some(DataType::Float));
//! assert_eq!(store.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! Failed uploads are never stored:
//!
//! ```rust
//! use tabular_intake::ingestion::{ingest, IngestionOptions};
//! use tabular_intake::storage::MemoryStore;
//! use tabular_intake::types::RawUpload;
//! use tabular_intake::ErrorKind;
//!
//! let store = MemoryStore::new();
//! let err = ingest(
//!     RawUpload::new("nested.json", r#"{"user": {"id": 1}}"#),
//!     &store,
//!     &IngestionOptions::default(),
//! )
//! .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::UnsupportedStructure);
//! assert!(store.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: decoding, delimiter detection, validation, loading, preview and orchestration
//! - [`storage`]: the [`storage::FileStore`] trait with in-memory and directory backends
//! - [`execution`]: parallel batches of uploads with throttling and metrics
//! - [`response`]: serializable response bodies
//! - [`config`]: limits and preview caps
//! - [`types`]: upload, table and record types
//! - [`error`]: error types used across the crate

pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod response;
pub mod storage;
pub mod types;

pub use error::{ErrorKind, IntakeError, IntakeResult};
