//! Performance benchmarks for RingCopy
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringcopy::config::CopyConfig;
use ringcopy::core::BlockCopier;
use std::fs::File;
use std::io::{Cursor, Write};
use tempfile::TempDir;

/// Create a test file of the specified size
fn create_test_file(dir: &std::path::Path, name: &str, size: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();

    let chunk_size = 64 * 1024;
    let chunk: Vec<u8> = (0..chunk_size).map(|i| (i % 251) as u8).collect();
    let mut remaining = size;

    while remaining > 0 {
        let to_write = remaining.min(chunk_size);
        file.write_all(&chunk[..to_write]).unwrap();
        remaining -= to_write;
    }

    path
}

fn copier(block_size: usize, num_blocks: usize) -> BlockCopier {
    BlockCopier::new(CopyConfig {
        block_size,
        num_blocks,
        ..Default::default()
    })
}

fn bench_block_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_size");

    let size = 32 * 1024 * 1024;
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    group.throughput(Throughput::Bytes(size as u64));

    for block_size in [4 * 1024, 64 * 1024, 1024 * 1024, 4 * 1024 * 1024] {
        group.bench_with_input(
            BenchmarkId::new("memory", humansize::format_size(block_size as u64, humansize::BINARY)),
            &block_size,
            |b, &block_size| {
                let engine = copier(block_size, 10);
                b.iter(|| {
                    let mut out = Vec::with_capacity(size);
                    let report = engine.copy(Cursor::new(&data), &mut out, size as u64);
                    black_box(report.unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_slot_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_count");

    let size = 32 * 1024 * 1024;
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    group.throughput(Throughput::Bytes(size as u64));

    for num_blocks in [1, 2, 10, 32] {
        group.bench_with_input(
            BenchmarkId::new("blocks", num_blocks),
            &num_blocks,
            |b, &num_blocks| {
                let engine = copier(256 * 1024, num_blocks);
                b.iter(|| {
                    let report = engine.copy(Cursor::new(&data), std::io::sink(), size as u64);
                    black_box(report.unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_copy_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_copy");

    for size in [1024 * 1024, 10 * 1024 * 1024, 100 * 1024 * 1024] {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let src_file = create_test_file(src_dir.path(), "large.bin", size);
        let dst_file = dst_dir.path().join("large.bin");

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("default", humansize::format_size(size as u64, humansize::BINARY)),
            &size,
            |b, _| {
                b.iter(|| {
                    let config = CopyConfig {
                        source: src_file.clone(),
                        destination: dst_file.clone(),
                        truncate: true,
                        ..Default::default()
                    };
                    let _ = black_box(BlockCopier::new(config).execute());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_block_sizes, bench_slot_counts, bench_copy_file);

criterion_main!(benches);
