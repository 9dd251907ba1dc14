//! Benchmarks for Fusion Index components.
//!
//! Run with: cargo bench --package fusion-index
//!
//! ## Benchmark Categories
//!
//! - **Record Codec**: Encode/decode of raw index records
//! - **Build**: Scanning a framed data file into an index
//! - **File I/O**: Save, then load with validation
//! - **Queries**: Type, time-range and position filters

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fusion_index::index::record::{decode_records, encode_records};
use fusion_index::index::{index_path_for, FileIndex, FileIndexBuilder, IndexEntry, LoadOptions};
use fusion_index::message::{MessageHeader, MessageType};
use fusion_index::NanHint;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Generate a typical recording: 10 Hz pose, 1 Hz GNSS info, sparse events.
fn generate_typical_log(count: usize) -> FileIndex {
    let mut builder = FileIndexBuilder::with_capacity(count);
    let mut offset = 0u64;
    for i in 0..count {
        let (message_type, time, size) = match i % 11 {
            10 => (MessageType::GNSS_INFO, Some(i as f64 / 10.0), 96),
            _ if i % 97 == 0 => (MessageType::EVENT_NOTIFICATION, None, 40),
            _ => (MessageType::POSE, Some(i as f64 / 10.0), 163),
        };
        builder.append(message_type, offset, time);
        offset += size;
    }
    builder.finish()
}

/// Write a framed data file of `count` timed pose messages.
fn write_framed_log(dir: &TempDir, count: usize) -> PathBuf {
    let mut data = Vec::with_capacity(count * 64);
    for i in 0..count as u32 {
        let mut payload = Vec::with_capacity(40);
        payload.extend_from_slice(&(i / 10).to_le_bytes());
        payload.extend_from_slice(&((i % 10) * 100_000_000).to_le_bytes());
        payload.resize(40, 0);

        let mut header = MessageHeader::new(MessageType::POSE);
        header.sequence_number = i;
        header.write_message(&mut data, &payload).unwrap();
    }
    let path = dir.path().join("bench.p1log");
    fs::write(&path, data).unwrap();
    path
}

// ============================================================================
// Record Codec Benchmarks
// ============================================================================

fn bench_record_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_codec");

    for size in [1_000, 10_000, 100_000].iter() {
        let entries: Vec<IndexEntry> = generate_typical_log(*size).iter().collect();
        let buf = encode_records(&entries);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &entries, |b, entries| {
            b.iter(|| encode_records(black_box(entries)))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &buf, |b, buf| {
            b.iter(|| decode_records(black_box(buf)).unwrap())
        });
    }

    group.finish();
}

// ============================================================================
// Build Benchmarks
// ============================================================================

fn bench_build_from_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_from_file");
    group.sample_size(20);

    for size in [1_000, 10_000].iter() {
        let temp_dir = TempDir::new().unwrap();
        let data_path = write_framed_log(&temp_dir, *size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data_path, |b, path| {
            b.iter(|| FileIndexBuilder::from_file(black_box(path)).unwrap())
        });
    }

    group.finish();
}

// ============================================================================
// File I/O Benchmarks
// ============================================================================

fn bench_save_load(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let data_path = write_framed_log(&temp_dir, 10_000);
    let index_path = index_path_for(&data_path);
    let index = FileIndexBuilder::from_file(&data_path).unwrap();

    let mut group = c.benchmark_group("index_file");
    group.throughput(Throughput::Elements(index.len() as u64));

    group.bench_function("save_10k", |b| {
        b.iter(|| index.save(&index_path, Some(&data_path)).unwrap())
    });

    index.save(&index_path, Some(&data_path)).unwrap();
    let options = LoadOptions::default().with_data_path(&data_path);
    group.bench_function("load_10k", |b| {
        b.iter(|| FileIndex::load(black_box(&index_path), &options).unwrap())
    });

    group.finish();
}

// ============================================================================
// Query Benchmarks
// ============================================================================

fn bench_queries(c: &mut Criterion) {
    let index = generate_typical_log(100_000);
    let mut group = c.benchmark_group("query_100k");

    group.bench_function("by_type", |b| {
        b.iter(|| index.by_type(black_box(MessageType::POSE)))
    });

    group.bench_function("by_types", |b| {
        b.iter(|| index.by_types(black_box(&[MessageType::POSE, MessageType::GNSS_INFO])))
    });

    for hint in [NanHint::IncludeNans, NanHint::RemoveNans, NanHint::AllNans] {
        group.bench_function(BenchmarkId::new("by_time_range", hint), |b| {
            b.iter(|| {
                index
                    .by_time_range(black_box(Some(4000.0)), black_box(Some(6000.0)), hint)
                    .unwrap()
            })
        });
    }

    group.bench_function("by_range", |b| {
        b.iter(|| index.by_range(black_box(40_000usize..60_000)).unwrap())
    });

    let positions: Vec<usize> = (0..index.len()).step_by(100).collect();
    group.bench_function("by_positions", |b| {
        b.iter(|| index.by_positions(black_box(&positions)).unwrap())
    });

    group.bench_function("summary", |b| b.iter(|| index.summary()));

    group.finish();
}

criterion_group!(record_benches, bench_record_codec);

criterion_group!(build_benches, bench_build_from_file);

criterion_group!(io_benches, bench_save_load);

criterion_group!(query_benches, bench_queries);

criterion_main!(record_benches, build_benches, io_benches, query_benches);
