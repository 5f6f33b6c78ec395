//! Insert/lookup/remove throughput for the adaptive radix map backing
//! `DirectOrderBook`'s price and order-id indices (§4.6).

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use exchange_core::art::LongAdaptiveRadixMap;

fn sequential_keys(n: u64) -> Vec<u64> {
    (0..n).collect()
}

fn scattered_keys(n: u64) -> Vec<u64> {
    // A fixed multiplicative-hash permutation rather than a random shuffle,
    // so a rerun exercises the same key order for a fair comparison.
    (0..n).map(|i| i.wrapping_mul(0x9E3779B97F4A7C15) >> 32).collect()
}

fn insert_sequential(c: &mut Criterion) {
    let keys = sequential_keys(10_000);
    c.bench_function("art_insert_sequential_10k", |b| {
        b.iter(|| {
            let mut map = LongAdaptiveRadixMap::new();
            for &k in &keys {
                map.put(black_box(k), k);
            }
            black_box(map.len());
        });
    });
}

fn insert_scattered(c: &mut Criterion) {
    let keys = scattered_keys(10_000);
    c.bench_function("art_insert_scattered_10k", |b| {
        b.iter(|| {
            let mut map = LongAdaptiveRadixMap::new();
            for &k in &keys {
                map.put(black_box(k), k);
            }
            black_box(map.len());
        });
    });
}

fn lookup_hit(c: &mut Criterion) {
    let keys = scattered_keys(10_000);
    let mut map = LongAdaptiveRadixMap::new();
    for &k in &keys {
        map.put(k, k);
    }
    c.bench_function("art_lookup_scattered_10k", |b| {
        b.iter(|| {
            for &k in &keys {
                black_box(map.get(k));
            }
        });
    });
}

fn nearest_key_walk(c: &mut Criterion) {
    let keys = sequential_keys(10_000);
    let mut map = LongAdaptiveRadixMap::new();
    for &k in &keys {
        map.put(k, k);
    }
    c.bench_function("art_get_higher_walk_10k", |b| {
        b.iter(|| {
            let mut next = Some(0u64);
            let mut count = 0usize;
            while let Some(k) = next {
                count += 1;
                next = map.get_higher(k).map(|(k, _)| k);
            }
            black_box(count);
        });
    });
}

criterion_group!(benches, insert_sequential, insert_scattered, lookup_hit, nearest_key_walk);
criterion_main!(benches);
