use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tabular_intake::config::IntakeLimits;
use tabular_intake::ingestion::{fetch, ingest, validate_upload, IngestionOptions};
use tabular_intake::response::{ErrorResponse, IngestResponse};
use tabular_intake::storage::{FileId, FileStore, MemoryStore, StoreError, StoredFile};
use tabular_intake::types::{FileKind, RawUpload};
use tabular_intake::{ErrorKind, IntakeError};

/// Counts calls and delegates to an in-memory store.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    saves: AtomicUsize,
}

impl FileStore for CountingStore {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<FileId, StoreError> {
        let _ = self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(bytes, filename)
    }

    fn load(&self, id: &FileId) -> Result<StoredFile, StoreError> {
        self.inner.load(id)
    }
}

/// Rejects every write.
struct FailingStore;

impl FileStore for FailingStore {
    fn save(&self, _bytes: &[u8], _filename: &str) -> Result<FileId, StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    fn load(&self, id: &FileId) -> Result<StoredFile, StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }
}

#[test]
fn oversized_upload_is_rejected_without_a_save() {
    let store = CountingStore::default();
    let bytes = vec![b'a'; 25 * 1024 * 1024];

    let err = ingest(
        RawUpload::new("huge.csv", bytes),
        &store,
        &IngestionOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        IntakeError::TooLarge { size, limit } if size == 25 * 1024 * 1024 && limit == 20 * 1024 * 1024
    ));
    assert_eq!(err.http_status_code(), 413);
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[test]
fn size_limit_is_inclusive() {
    let limits = IntakeLimits {
        max_bytes: 8,
        ..IntakeLimits::default()
    };
    let opts = IngestionOptions {
        limits,
        ..IngestionOptions::default()
    };

    assert!(validate_upload(&RawUpload::new("t.csv", "a,b\n1,2\n"), &opts).is_ok());
    let err = validate_upload(&RawUpload::new("t.csv", "a,b\n1,23\n"), &opts).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooLarge);
}

#[test]
fn successful_ingest_saves_exactly_once() {
    let store = CountingStore::default();

    let outcome = ingest(
        RawUpload::new("t.csv", "a,b\n1,2\n3,4\n"),
        &store,
        &IngestionOptions::default(),
    )
    .unwrap();

    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.file_info.size, 12);
    assert_eq!(outcome.kind, FileKind::Csv);
}

#[test]
fn invalid_uploads_never_reach_the_store() {
    let store = CountingStore::default();
    let cases = [
        RawUpload::new("notes.txt", "hello"),
        RawUpload::new("t.csv", "a,b\n"),
        RawUpload::new("t.csv", "a,b\n1,2,3\n"),
        RawUpload::new("t.json", "{"),
        RawUpload::new("t.json", r#"[{"a":{"b":1}}]"#),
    ];

    for upload in cases {
        let name = upload.filename.clone();
        assert!(
            ingest(upload, &store, &IngestionOptions::default()).is_err(),
            "{name}"
        );
    }
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[test]
fn store_failures_surface_as_persistence_errors() {
    let err = ingest(
        RawUpload::new("t.csv", "a,b\n1,2\n"),
        &FailingStore,
        &IngestionOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    assert_eq!(err.http_status_code(), 500);
    assert!(err.to_string().contains("disk full"));
}

#[test]
fn stored_bytes_round_trip_through_fetch() {
    let store = MemoryStore::new();
    let bytes = b"x|y\n1|2\n".to_vec();

    let outcome = ingest(
        RawUpload::new("pipes.csv", bytes.clone()),
        &store,
        &IngestionOptions::default(),
    )
    .unwrap();
    let stored = fetch(&store, &outcome.identifier.to_string()).unwrap();

    assert_eq!(stored.id, outcome.identifier);
    assert_eq!(stored.filename, "pipes.csv");
    assert_eq!(stored.bytes, bytes);
}

#[test]
fn fetch_unknown_or_malformed_identifier_is_not_found() {
    let store = MemoryStore::new();

    let err = fetch(&store, &FileId::new().to_string()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.http_status_code(), 404);

    let err = fetch(&store, "not-a-uuid").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn each_ingest_gets_a_fresh_identifier() {
    let store = MemoryStore::new();
    let opts = IngestionOptions::default();
    let a = ingest(RawUpload::new("t.csv", "a\n1\n"), &store, &opts).unwrap();
    let b = ingest(RawUpload::new("t.csv", "a\n1\n"), &store, &opts).unwrap();

    assert_ne!(a.identifier, b.identifier);
    assert_eq!(store.len(), 2);
}

#[test]
fn unsupported_extension_names_the_extension() {
    let store = MemoryStore::new();
    let err = ingest(
        RawUpload::new("report.xlsx", "ignored"),
        &store,
        &IngestionOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedKind);
    assert!(err.to_string().contains(".xlsx"));
    assert_eq!(err.http_status_code(), 400);
}

#[test]
fn explicit_format_overrides_extension() {
    let store = MemoryStore::new();
    let opts = IngestionOptions {
        format: Some(FileKind::Json),
        ..IngestionOptions::default()
    };

    let outcome = ingest(RawUpload::new("upload.bin", r#"{"a": 1}"#), &store, &opts).unwrap();
    assert_eq!(outcome.kind, FileKind::Json);
}

#[test]
fn validation_is_idempotent() {
    let upload = RawUpload::new("t.csv", "a;b\n1;2\n");
    let opts = IngestionOptions::default();

    let first = validate_upload(&upload, &opts).unwrap();
    let second = validate_upload(&upload, &opts).unwrap();
    assert_eq!(first, second);
}

#[test]
fn ingest_response_body_shape() {
    let store = MemoryStore::new();
    let outcome = ingest(
        RawUpload::new("t.csv", "a,b\n1,x\n").with_content_type("text/csv"),
        &store,
        &IngestionOptions::default(),
    )
    .unwrap();
    let id = outcome.identifier.to_string();

    let body = serde_json::to_value(IngestResponse::from(outcome)).unwrap();

    assert_eq!(body["status"], "success");
    assert_eq!(body["identifier"], json!(id));
    assert_eq!(
        body["fileInfo"],
        json!({"filename": "t.csv", "contentType": "text/csv", "size": 8})
    );
    assert_eq!(body["data"], json!([{"a": 1, "b": "x"}]));
    assert_eq!(body["metadata"]["totalRows"], 1);
    assert_eq!(body["metadata"]["columns"], json!(["a", "b"]));
    assert_eq!(body["metadata"]["dtypes"], json!({"a": "integer", "b": "text"}));
    assert!(body["metadata"]["memoryUsage"].as_f64().unwrap() > 0.0);
}

#[test]
fn error_response_body_shape() {
    let err = IntakeError::Empty {
        kind: FileKind::Csv,
    };
    let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
    assert_eq!(
        body,
        json!({"status": "error", "kind": "empty", "message": "csv content is empty"})
    );
}
