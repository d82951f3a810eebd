//! Frame pool benchmarks: local-shard allocation against steal-heavy
//! patterns, and bucket-cache hit paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use shardpool::alloc::FramePool;
use shardpool::cache::BufferCache;
use shardpool::device::MemDevice;
use shardpool::{BlockId, CoreId, TickSource};

fn bench_local_alloc_free(c: &mut Criterion) {
    let pool = FramePool::new(256, 4);
    pool.populate(CoreId::new(0), 256);
    let core = CoreId::new(0);

    c.bench_function("pool/local_alloc_free", |b| {
        b.iter(|| {
            let frame = pool.allocate(black_box(core)).unwrap();
            pool.free(core, frame);
        });
    });
}

fn bench_steal_heavy(c: &mut Criterion) {
    // Allocate on a core whose shard is always empty: every allocation
    // steals, every free sends the frame back to the donor shard.
    let pool = FramePool::new(256, 4);
    pool.populate(CoreId::new(1), 256);

    c.bench_function("pool/steal_then_free_remote", |b| {
        b.iter(|| {
            let frame = pool.allocate(black_box(CoreId::new(0))).unwrap();
            pool.free(CoreId::new(1), frame);
            // Drain whatever the steal banked locally so the next
            // iteration steals again.
            while pool.shard_free_count(0) > 0 {
                let banked = pool.allocate(CoreId::new(0)).unwrap();
                pool.free(CoreId::new(1), banked);
            }
        });
    });
}

fn bench_cache_hit(c: &mut Criterion) {
    let cache = BufferCache::new(MemDevice::new(), Arc::new(TickSource::new()), 64, 17);
    let id = BlockId::new(1, 0);
    drop(cache.read(id).unwrap());

    c.bench_function("cache/hit", |b| {
        b.iter(|| {
            let guard = cache.read(black_box(id)).unwrap();
            black_box(guard.as_slice()[0]);
        });
    });
}

fn bench_cache_eviction_churn(c: &mut Criterion) {
    let ticks = Arc::new(TickSource::new());
    let cache = BufferCache::new(MemDevice::new(), Arc::clone(&ticks), 8, 3);
    let mut block = 0u32;

    c.bench_function("cache/eviction_churn", |b| {
        b.iter(|| {
            block = block.wrapping_add(1);
            let guard = cache.read(BlockId::new(1, black_box(block))).unwrap();
            black_box(guard.slot_id());
            ticks.advance();
        });
    });
}

criterion_group!(
    benches,
    bench_local_alloc_free,
    bench_steal_heavy,
    bench_cache_hit,
    bench_cache_eviction_churn
);
criterion_main!(benches);
