use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use tempfile::tempdir;

use lsm_kv::{DB, Options, SyncPolicy};

const N: usize = 1_000;
const VAL_SIZE: usize = 100;

fn key(i: usize) -> Vec<u8> {
    format!("k{:06}", i).into_bytes()
}

/// A DB holding `n` keys, all flushed to tables.
fn populated(dir: &std::path::Path, n: usize) -> DB {
    let db = DB::open(dir, Options::default()).unwrap();
    for i in 0..n {
        db.put(&key(i), &vec![b'x'; VAL_SIZE]).unwrap();
    }
    db.flush().unwrap();
    db
}

fn put_no_flush(c: &mut Criterion) {
    c.bench_function("put_no_flush_1k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let options = Options::default().with_memtable_flush_threshold(N + 1);
                let db = DB::open(dir.path(), options).unwrap();
                (dir, db)
            },
            |(_dir, db)| {
                let val = vec![b'x'; VAL_SIZE];
                for i in 0..N {
                    db.put(&key(i), &val).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn put_with_flush_and_compaction(c: &mut Criterion) {
    c.bench_function("put_with_flush_5k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let db = DB::open(dir.path(), Options::default()).unwrap();
                (dir, db)
            },
            |(_dir, db)| {
                // Five flushes; the fifth triggers a compaction.
                let val = vec![b'x'; VAL_SIZE];
                for i in 0..N * 5 {
                    db.put(&key(i % (N * 2)), &val).unwrap();
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn put_sync_every_write(c: &mut Criterion) {
    c.bench_function("put_sync_every_write_100", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let options = Options::default().with_wal_sync_policy(SyncPolicy::EveryWrite);
                let db = DB::open(dir.path(), options).unwrap();
                (dir, db)
            },
            |(_dir, db)| {
                for i in 0..100 {
                    db.put(&key(i), b"v").unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn read_memtable_hit(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let options = Options::default().with_memtable_flush_threshold(N + 1);
    let db = DB::open(dir.path(), options).unwrap();
    for i in 0..N {
        db.put(&key(i), &vec![b'x'; VAL_SIZE]).unwrap();
    }

    c.bench_function("read_memtable_hit_1k", |b| {
        b.iter(|| {
            for i in 0..N {
                black_box(db.read(&key(i)).unwrap());
            }
        });
    });
}

fn read_table_hit(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = populated(dir.path(), N);

    c.bench_function("read_table_hit_1k", |b| {
        b.iter(|| {
            for i in 0..N {
                black_box(db.read(&key(i)).unwrap());
            }
        });
    });
}

fn read_range_tables(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = populated(dir.path(), N * 3);

    c.bench_function("read_range_100_of_3k", |b| {
        b.iter(|| black_box(db.read_range(&key(1_000), &key(1_099)).unwrap()));
    });
}

criterion_group!(
    benches,
    put_no_flush,
    put_with_flush_and_compaction,
    put_sync_every_write,
    read_memtable_hit,
    read_table_hit,
    read_range_tables,
);

criterion_main!(benches);
