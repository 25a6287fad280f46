use bptree::BpTreeMap;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;

const N: usize = 10_000;

// ─── Helper functions to generate key sequences ─────────────────────────────

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn reverse_ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).rev().collect()
}

fn random_keys(n: usize) -> Vec<i64> {
    // Use a simple LCG for deterministic pseudo-random sequence
    let mut keys = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        keys.push((x >> 33) as i64);
    }
    keys
}

// ─── Insert Benchmarks ──────────────────────────────────────────────────────

fn bench_insert_ordered(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_ordered");

    group.bench_function(BenchmarkId::new("BpTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BpTreeMap::new();
            for i in 0..N as i64 {
                let _ = map.insert(i, i);
            }
            map
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for i in 0..N as i64 {
                map.insert(i, i);
            }
            map
        });
    });

    group.finish();
}

fn bench_insert_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_reverse");

    group.bench_function(BenchmarkId::new("BpTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BpTreeMap::new();
            for i in (0..N as i64).rev() {
                let _ = map.insert(i, i);
            }
            map
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for i in (0..N as i64).rev() {
                map.insert(i, i);
            }
            map
        });
    });

    group.finish();
}

fn bench_insert_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("insert_random");

    group.bench_function(BenchmarkId::new("BpTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BpTreeMap::new();
            for &k in &keys {
                let _ = map.insert(k, k);
            }
            map
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for &k in &keys {
                map.insert(k, k);
            }
            map
        });
    });

    group.finish();
}

// ─── Get Benchmarks ─────────────────────────────────────────────────────────

fn bench_get_ordered(c: &mut Criterion) {
    let keys = ordered_keys(N);
    let bp_map: BpTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let bt_map: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();

    let mut group = c.benchmark_group("get_ordered");

    group.bench_function(BenchmarkId::new("BpTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in &keys {
                if let Some(&v) = bp_map.get(&k) {
                    sum = sum.wrapping_add(v);
                }
            }
            sum
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in &keys {
                if let Some(&v) = bt_map.get(&k) {
                    sum = sum.wrapping_add(v);
                }
            }
            sum
        });
    });

    group.finish();
}

fn bench_get_reverse(c: &mut Criterion) {
    let keys = ordered_keys(N);
    let bp_map: BpTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let bt_map: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let reverse_keys = reverse_ordered_keys(N);

    let mut group = c.benchmark_group("get_reverse");

    group.bench_function(BenchmarkId::new("BpTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in &reverse_keys {
                if let Some(&v) = bp_map.get(&k) {
                    sum = sum.wrapping_add(v);
                }
            }
            sum
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in &reverse_keys {
                if let Some(&v) = bt_map.get(&k) {
                    sum = sum.wrapping_add(v);
                }
            }
            sum
        });
    });

    group.finish();
}

fn bench_get_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let bp_map: BpTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let bt_map: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();

    let mut group = c.benchmark_group("get_random");

    group.bench_function(BenchmarkId::new("BpTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in &keys {
                if let Some(&v) = bp_map.get(&k) {
                    sum = sum.wrapping_add(v);
                }
            }
            sum
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in &keys {
                if let Some(&v) = bt_map.get(&k) {
                    sum = sum.wrapping_add(v);
                }
            }
            sum
        });
    });

    group.finish();
}

// ─── Scan Benchmarks ────────────────────────────────────────────────────────

fn bench_iter_full(c: &mut Criterion) {
    let keys = random_keys(N);
    let bp_map: BpTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let bt_map: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();

    let mut group = c.benchmark_group("iter_full");

    group.bench_function(BenchmarkId::new("BpTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for (_, &v) in bp_map.iter() {
                sum = sum.wrapping_add(v);
            }
            sum
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for (_, &v) in bt_map.iter() {
                sum = sum.wrapping_add(v);
            }
            sum
        });
    });

    group.finish();
}

fn bench_range_scan(c: &mut Criterion) {
    let keys = ordered_keys(N);
    let bp_map: BpTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let bt_map: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let lo = (N / 4) as i64;
    let hi = (3 * N / 4) as i64;

    let mut group = c.benchmark_group("range_scan");

    group.bench_function(BenchmarkId::new("BpTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for (_, &v) in bp_map.range(lo..hi) {
                sum = sum.wrapping_add(v);
            }
            sum
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for (_, &v) in bt_map.range(lo..hi) {
                sum = sum.wrapping_add(v);
            }
            sum
        });
    });

    group.finish();
}

// ─── Criterion Groups ───────────────────────────────────────────────────────

criterion_group!(insert_benches, bench_insert_ordered, bench_insert_reverse, bench_insert_random,);

criterion_group!(get_benches, bench_get_ordered, bench_get_reverse, bench_get_random,);

criterion_group!(scan_benches, bench_iter_full, bench_range_scan,);

criterion_main!(insert_benches, get_benches, scan_benches,);
