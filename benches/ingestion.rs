use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use tabular_intake::execution::{BatchEngine, BatchOptions};
use tabular_intake::ingestion::{detect_delimiter, ingest, validate_upload, IngestionOptions};
use tabular_intake::storage::MemoryStore;
use tabular_intake::types::RawUpload;

fn csv_text(rows: usize, sep: char) -> String {
    let mut out = format!("id{sep}name{sep}score{sep}active\n");
    for i in 0..rows {
        out.push_str(&format!(
            "{i}{sep}name_{i}{sep}{}.5{sep}{}\n",
            i % 100,
            i % 2 == 0
        ));
    }
    out
}

fn json_text(items: usize) -> String {
    let body = (0..items)
        .map(|i| format!(r#"{{"id": {i}, "name": "n{i}", "tags": ["a", "b"], "ok": true}}"#))
        .collect::<Vec<_>>()
        .join(",");
    format!("[{body}]")
}

fn bench_ingest_csv_sizes(c: &mut Criterion) {
    let opts = IngestionOptions::default();
    let mut group = c.benchmark_group("ingest_csv");

    for rows in [100usize, 10_000, 100_000] {
        let text = csv_text(rows, ';');
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("rows_{rows}"), |b| {
            b.iter(|| {
                let store = MemoryStore::new();
                let upload = RawUpload::new("bench.csv", text.as_bytes());
                let _ = ingest(black_box(upload), &store, black_box(&opts))
                    .expect("ingest should succeed");
            });
        });
    }

    group.finish();
}

fn bench_validate_json(c: &mut Criterion) {
    let opts = IngestionOptions::default();
    let text = json_text(10_000);
    let upload = RawUpload::new("bench.json", text.as_bytes());

    let mut group = c.benchmark_group("validate_json");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("items_10000", |b| {
        b.iter(|| {
            let _ = validate_upload(black_box(&upload), black_box(&opts))
                .expect("validation should succeed");
        });
    });
    group.finish();
}

fn bench_detect_delimiter(c: &mut Criterion) {
    let text = csv_text(1_000, '|');
    c.bench_function("detect_delimiter_pipe", |b| {
        b.iter(|| detect_delimiter(black_box(&text), 10));
    });
}

fn bench_batch(c: &mut Criterion) {
    let opts = IngestionOptions::default();
    let engine = BatchEngine::new(BatchOptions::default()).expect("thread pool");
    let uploads: Vec<RawUpload> = (0..32)
        .map(|i| RawUpload::new(format!("batch_{i}.csv"), csv_text(2_000, ',')))
        .collect();

    c.bench_function("batch_ingest_32x2000", |b| {
        b.iter(|| {
            let store = MemoryStore::new();
            let out = engine.ingest_all(black_box(uploads.clone()), &store, &opts);
            assert!(out.iter().all(Result::is_ok));
        });
    });
}

criterion_group!(
    benches,
    bench_ingest_csv_sizes,
    bench_validate_json,
    bench_detect_delimiter,
    bench_batch
);
criterion_main!(benches);
