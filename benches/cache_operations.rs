//! Cache and request-path benchmarks.
//!
//! Run: cargo bench --bench cache_operations

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graph_access::cache::{LrfuCache, PrefetchCache};
use graph_access::csr::{partition_graph, with_label, Edge};
use graph_access::{
    Algorithm, Direction, EngineConfig, GraphAccessEngine, IndexLayout, MemoryStore, NeighbourRequest, ObjectStore,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_engine(node_count: u32) -> GraphAccessEngine {
    let edges: Vec<(u32, u32, u32)> = (0..node_count)
        .flat_map(|n| (0..4u32).map(move |k| (n, k % 2, (n * 13 + k * 7) % node_count)))
        .collect();
    let store = MemoryStore::new();
    for (name, bytes) in partition_graph(&edges, node_count, 256, IndexLayout::Bidirectional).unwrap() {
        store.insert(name, bytes);
    }
    let store: Arc<dyn ObjectStore> = Arc::new(store);
    GraphAccessEngine::open(store, EngineConfig::default()).unwrap()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_lrfu_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("lrfu_put");
    for lambda in [0.0, 0.5, 1.0] {
        group.bench_with_input(BenchmarkId::from_parameter(lambda), &lambda, |b, &lambda| {
            let cache = LrfuCache::new(1000, lambda).unwrap();
            let mut i = 0u32;
            b.iter(|| {
                cache.put(i % 1000, i + 1);
                i = i.wrapping_add(1);
            });
        });
    }
    group.finish();
}

fn bench_lrfu_get(c: &mut Criterion) {
    let cache = LrfuCache::new(1000, 0.5).unwrap();
    for i in 0..1000u32 {
        cache.put(i, 1000 + i);
    }
    let mut i = 0u32;
    c.bench_function("lrfu_get", |b| {
        b.iter(|| {
            black_box(cache.get(&(i % 1000)));
            i = i.wrapping_add(1);
        });
    });
}

fn bench_prefetch_cache(c: &mut Criterion) {
    let cache = PrefetchCache::new(100).unwrap();
    let mut i = 0u32;
    c.bench_function("prefetch_cache_put_get", |b| {
        b.iter(|| {
            cache.put(i, i);
            black_box(cache.get(&i.wrapping_sub(50)));
            i = i.wrapping_add(1);
        });
    });
}

fn bench_label_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("with_label");
    for size in [16usize, 256, 4096] {
        let edges: Vec<Edge> = (0..size as u32).map(|i| Edge::new(i / 8, i)).collect();
        let label = (size as u32 / 8) / 2;
        group.bench_with_input(BenchmarkId::from_parameter(size), &edges, |b, edges| {
            b.iter(|| black_box(with_label(edges, label)));
        });
    }
    group.finish();
}

fn bench_cached_request(c: &mut Criterion) {
    let engine = make_engine(4096);
    let query = engine.start_query(Algorithm::Bfs).unwrap();
    let request = NeighbourRequest::new(17, 1, Direction::Both);
    engine.get_neighbours(request, query).unwrap();

    c.bench_function("get_neighbours_cached", |b| {
        b.iter(|| black_box(engine.get_neighbours(request, query).unwrap()));
    });
    engine.end_query(query).unwrap();
}

criterion_group!(
    benches,
    bench_lrfu_put,
    bench_lrfu_get,
    bench_prefetch_cache,
    bench_label_filter,
    bench_cached_request
);
criterion_main!(benches);
