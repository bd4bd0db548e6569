//! Microbenchmarks for the `add_data_point()` hot path.
//!
//! Measures insertion below capacity, insertion with a synced eviction on
//! every call, and the same with write-behind eviction.
//!
//! Run with: `cargo bench -p flightcache -- ingest`

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use flightcache::codec::{format_line, parse_line};
use flightcache::{CacheConfig, FlightCache, LogRecord, PersistMode, WriteBehindConfig};
use tempfile::tempdir;

fn sample(t: f64) -> LogRecord {
    LogRecord {
        timestamp: t,
        latitude: 28.5721,
        longitude: -80.6480 + t * 1e-6,
        altitude: t * 15.0,
        bearing: 90.0,
        velocity: t * 3.0,
        acceleration: 30.0,
        temperature: 15.0,
        pressure: 1013.25,
    }
}

fn bench_insert_without_eviction(c: &mut Criterion) {
    let temp_dir = tempdir().unwrap();
    let config = CacheConfig::new(temp_dir.path().join("log.txt")).with_capacity(1024);
    let mut cache = FlightCache::open(config).unwrap();
    let mut t = 0.0;

    c.bench_function("ingest/no_eviction", |b| {
        b.iter(|| {
            // Clear before the ring fills so nothing is ever written.
            if cache.len() == cache.capacity() {
                cache.clear_cache();
            }
            t += 0.1;
            cache.add_data_point(black_box(sample(t))).unwrap();
        });
    });
}

fn bench_insert_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest/evicting");

    for (name, mode) in [
        ("direct", PersistMode::Direct),
        (
            "write_behind",
            PersistMode::WriteBehind(WriteBehindConfig::default()),
        ),
    ] {
        let temp_dir = tempdir().unwrap();
        let config = CacheConfig::new(temp_dir.path().join("log.txt"))
            .with_capacity(20)
            .with_persist_mode(mode);
        let mut cache = FlightCache::open(config).unwrap();
        for i in 0..20 {
            cache.add_data_point(sample(f64::from(i))).unwrap();
        }
        let mut t = 20.0;

        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, _| {
            b.iter(|| {
                t += 0.1;
                cache.add_data_point(black_box(sample(t))).unwrap();
            });
        });

        cache.shutdown().unwrap();
    }

    group.finish();
}

fn bench_analytics(c: &mut Criterion) {
    let temp_dir = tempdir().unwrap();
    let config = CacheConfig::new(temp_dir.path().join("log.txt")).with_capacity(20);
    let mut cache = FlightCache::open(config).unwrap();
    for i in 0..20 {
        cache.add_data_point(sample(f64::from(i))).unwrap();
    }

    c.bench_function("analytics/summary_20", |b| {
        b.iter(|| black_box(cache.summary()));
    });
}

fn bench_codec(c: &mut Criterion) {
    let record = sample(1234.5);
    let line = format_line(&record);

    c.bench_function("codec/format_line", |b| {
        b.iter(|| format_line(black_box(&record)));
    });
    c.bench_function("codec/parse_line", |b| {
        b.iter(|| parse_line(black_box(&line)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_insert_without_eviction,
    bench_insert_with_eviction,
    bench_analytics,
    bench_codec,
);
criterion_main!(benches);
