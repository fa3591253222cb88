use criterion::{criterion_group, criterion_main, Criterion};
use infreqcache::storage::FsStorage;
use infreqcache::Db;
use rand::{distributions::Alphanumeric, rngs::SmallRng, Rng, SeedableRng};
use std::sync::Arc;
use tempfile::TempDir;

const NUM_PARTITIONS: usize = 20;
const KEY_SEED: u64 = 757;
const VALUE_SEED: u64 = 1024;
const READ_SEED: u64 = 999;

fn get_strings(seed: u64, count: usize, size: usize) -> Vec<String> {
    let mut r: SmallRng = SeedableRng::seed_from_u64(seed);
    (0..count)
        .map(|_| r.sample_iter(&Alphanumeric).take(size).collect())
        .collect()
}

fn seed_storage(root: &std::path::Path, partitions: &[String], values: &[String]) {
    let storage = FsStorage::new(root).unwrap();
    for (part, value) in partitions.iter().zip(values) {
        let staging = TempDir::new().unwrap();
        let db = sled::open(staging.path()).unwrap();
        let tree = db.open_tree(b"bench").unwrap();
        tree.insert(b"key", value.as_bytes()).unwrap();
        db.flush().unwrap();
        drop(db);
        storage.put(part, staging.path(), true).unwrap();
    }
}

/// Benchmarks the cache-hit path: every partition is already resident,
/// so `get` never touches `Storage`.
fn bench_get_hit(c: &mut Criterion) {
    let partitions = get_strings(KEY_SEED, NUM_PARTITIONS, 12);
    let values = get_strings(VALUE_SEED, NUM_PARTITIONS, 64);

    let storage_root = TempDir::new().unwrap();
    seed_storage(storage_root.path(), &partitions, &values);

    let storage = Arc::new(FsStorage::new(storage_root.path()).unwrap());
    let db = Db::new(storage, NUM_PARTITIONS);
    for part in &partitions {
        db.get(part, b"bench", b"key").unwrap();
    }

    let mut r: SmallRng = SeedableRng::seed_from_u64(READ_SEED);
    c.bench_function("db-get-hit", |b| {
        b.iter(|| {
            let index = r.gen_range(0, NUM_PARTITIONS);
            db.get(&partitions[index], b"bench", b"key").unwrap()
        })
    });
}

/// Benchmarks the cache-miss path: capacity 1 forces every lookup to
/// evict and reload a fresh partition from `Storage`.
fn bench_get_miss(c: &mut Criterion) {
    let partitions = get_strings(KEY_SEED, NUM_PARTITIONS, 12);
    let values = get_strings(VALUE_SEED, NUM_PARTITIONS, 64);

    let storage_root = TempDir::new().unwrap();
    seed_storage(storage_root.path(), &partitions, &values);

    let storage = Arc::new(FsStorage::new(storage_root.path()).unwrap());
    let db = Db::new(storage, 1);

    let mut r: SmallRng = SeedableRng::seed_from_u64(READ_SEED);
    c.bench_function("db-get-miss", |b| {
        b.iter(|| {
            let index = r.gen_range(0, NUM_PARTITIONS);
            db.get(&partitions[index], b"bench", b"key").unwrap()
        })
    });
}

criterion_group!(group, bench_get_hit, bench_get_miss);
criterion_main!(group);
