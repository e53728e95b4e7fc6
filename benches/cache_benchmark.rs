//! Performance benchmarks for tenant-cache
//!
//! Measures facade overhead over the in-memory store:
//! - write / get of structured values across payload sizes
//! - integer fast path vs. blob decode
//! - dict enumeration
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::sync::Arc;
use tenant_cache::serialization::{decode_value, serialize_for_cache};
use tenant_cache::store::{CacheStore, InMemoryStore};
use tenant_cache::{CacheSettings, TenantCache};
use tokio::runtime::Runtime;

#[derive(Clone, Serialize, Deserialize)]
struct Payload {
    id: u64,
    data: Vec<u8>,
}

fn runtime() -> Runtime {
    Runtime::new().expect("Failed to build runtime")
}

fn cache(rt: &Runtime) -> (TenantCache<InMemoryStore>, InMemoryStore) {
    let store = InMemoryStore::new();
    let cache = rt.block_on(TenantCache::with_store(
        store.clone(),
        Arc::new("bench-tenant".to_string()),
        Arc::new(CacheSettings::default()),
    ));
    (cache, store)
}

fn bench_write_get(c: &mut Criterion) {
    let rt = runtime();
    let (cache, _store) = cache(&rt);
    let mut group = c.benchmark_group("write_get");

    for size in [64usize, 1024, 16 * 1024] {
        let payload = Payload {
            id: 1,
            data: vec![7u8; size],
        };
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("write", size), &payload, |b, payload| {
            b.to_async(&rt)
                .iter(|| async { cache.write("payload", black_box(payload)).await });
        });

        rt.block_on(cache.write("payload", &payload));
        group.bench_with_input(BenchmarkId::new("get", size), &size, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(cache.get::<Payload>("payload").await) });
        });
    }

    group.finish();
}

fn bench_decode_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let blob = serialize_for_cache(&1_234_567i64).expect("Failed to serialize");
    let text = b"1234567".to_vec();

    group.bench_function("integer_text", |b| {
        b.iter(|| decode_value::<i64>(black_box(&text)))
    });
    group.bench_function("integer_blob", |b| {
        b.iter(|| decode_value::<i64>(black_box(&blob)))
    });

    group.finish();
}

fn bench_dict(c: &mut Criterion) {
    let rt = runtime();
    let (cache, store) = cache(&rt);

    rt.block_on(async {
        for i in 0..100u64 {
            let bytes = serialize_for_cache(&i).expect("Failed to serialize");
            store
                .hset(&cache.tenant_key(), &format!("field_{}", i), bytes)
                .await
                .expect("Failed to hset");
        }
    });

    c.bench_function("dict_100_fields", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cache.dict::<u64>().await) });
    });
}

criterion_group!(benches, bench_write_get, bench_decode_paths, bench_dict);
criterion_main!(benches);
