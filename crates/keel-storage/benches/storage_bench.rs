//! Storage core benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keel_storage::buffer::{BufferFrame, BufferPool, BufferPoolConfig, FrameId, LruReplacer, Replacer};
use keel_storage::disk::DiskManager;
use tempfile::tempdir;

fn replacer_churn_benchmark(c: &mut Criterion) {
    c.bench_function("lru_replacer_churn_1000", |b| {
        b.iter(|| {
            let replacer = LruReplacer::new();
            for i in 0..1000 {
                replacer.unpin(FrameId::new(i));
            }
            for i in (0..1000).step_by(2) {
                replacer.pin(FrameId::new(i));
            }
            while let Some(frame_id) = replacer.victim() {
                black_box(frame_id);
            }
        })
    });
}

fn frame_pin_benchmark(c: &mut Criterion) {
    let frame = BufferFrame::new(FrameId::new(0));

    c.bench_function("frame_pin_unpin", |b| {
        b.iter(|| {
            frame.pin();
            black_box(frame.unpin())
        })
    });
}

fn pool_fetch_hit_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.kdb");

    let disk = Arc::new(DiskManager::new());
    disk.create_file(&path).unwrap();
    let file_id = disk.open_file(&path).unwrap();

    let pool = BufferPool::new(
        BufferPoolConfig::new(128),
        Arc::clone(&disk),
        Box::new(LruReplacer::new()),
    )
    .unwrap();

    let mut pages = Vec::new();
    for _ in 0..128 {
        let (page_id, _frame) = pool.new_page(file_id).unwrap().unwrap();
        pool.unpin_page(page_id, false);
        pages.push(page_id);
    }

    c.bench_function("pool_fetch_hit_128", |b| {
        b.iter(|| {
            for &page_id in &pages {
                let frame = pool.fetch_page(page_id).unwrap().unwrap();
                black_box(frame.frame_id());
                pool.unpin_page(page_id, false);
            }
        })
    });
}

criterion_group!(
    benches,
    replacer_churn_benchmark,
    frame_pin_benchmark,
    pool_fetch_hit_benchmark
);
criterion_main!(benches);
