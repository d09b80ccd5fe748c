// DB tests
// End-to-end behaviour of the engine: read-your-writes, deletes, ranges,
// flushing, compaction, close and recovery.

use lsm_kv::{DB, Error, Options, SyncPolicy};

fn small_options() -> Options {
    Options::default()
        .with_memtable_flush_threshold(10)
        .with_index_interval(4)
        .with_wal_sync_policy(SyncPolicy::EveryWrite)
}

fn table_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            let name = e.as_ref().unwrap().file_name().to_string_lossy().into_owned();
            name.starts_with("sstable_") && name.ends_with(".dat")
        })
        .count()
}

// =============================================================================
// Test 1: Read your own writes
// =============================================================================
#[test]
fn put_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open_default(dir.path()).unwrap();

    db.put(b"key", b"value").unwrap();
    assert_eq!(db.read(b"key").unwrap(), Some(b"value".to_vec()));
    assert_eq!(db.read(b"missing").unwrap(), None);

    db.put(b"key", b"value2").unwrap();
    assert_eq!(db.read(b"key").unwrap(), Some(b"value2".to_vec()));
}

// =============================================================================
// Test 2: Delete hides the key; delete of a missing key is fine
// =============================================================================
#[test]
fn delete_hides_key() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open_default(dir.path()).unwrap();

    db.put(b"key", b"value").unwrap();
    db.delete(b"key").unwrap();
    assert_eq!(db.read(b"key").unwrap(), None);

    db.delete(b"never-written").unwrap();
    assert_eq!(db.read(b"never-written").unwrap(), None);
}

// =============================================================================
// Test 3: A tombstone in memory shadows a value on disk
// =============================================================================
#[test]
fn tombstone_shadows_flushed_value() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open(dir.path(), small_options()).unwrap();

    db.put(b"key", b"on-disk").unwrap();
    db.flush().unwrap();
    assert_eq!(db.stats().table_count, 1);

    db.delete(b"key").unwrap();
    assert_eq!(db.read(b"key").unwrap(), None);
    assert!(db.read_range(b"a", b"z").unwrap().is_empty());

    // Flushed tombstone keeps shadowing.
    db.flush().unwrap();
    assert_eq!(db.read(b"key").unwrap(), None);
    assert!(db.read_range(b"a", b"z").unwrap().is_empty());
}

// =============================================================================
// Test 4: Range is inclusive, sorted, and skips deleted keys
// =============================================================================
#[test]
fn read_range_inclusive_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open_default(dir.path()).unwrap();

    for k in ["e", "a", "c", "b", "d"] {
        db.put(k.as_bytes(), k.to_uppercase().as_bytes()).unwrap();
    }
    db.delete(b"c").unwrap();

    let range = db.read_range(b"b", b"d").unwrap();
    assert_eq!(
        range,
        vec![(b"b".to_vec(), b"B".to_vec()), (b"d".to_vec(), b"D".to_vec())]
    );

    assert_eq!(db.read_range(b"a", b"a").unwrap(), vec![(b"a".to_vec(), b"A".to_vec())]);
    assert!(db.read_range(b"d", b"b").unwrap().is_empty());
    assert!(db.read_range(b"x", b"z").unwrap().is_empty());
}

// =============================================================================
// Test 5: Range merges memtable and several tables, newest wins
// =============================================================================
#[test]
fn read_range_newest_wins_across_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open(dir.path(), small_options()).unwrap();

    db.put(b"k1", b"old").unwrap();
    db.put(b"k2", b"old").unwrap();
    db.put(b"k3", b"old").unwrap();
    db.flush().unwrap();

    db.put(b"k1", b"newer").unwrap();
    db.flush().unwrap();

    db.put(b"k2", b"newest").unwrap();

    assert_eq!(db.stats().table_count, 2);
    assert_eq!(
        db.read_range(b"k1", b"k3").unwrap(),
        vec![
            (b"k1".to_vec(), b"newer".to_vec()),
            (b"k2".to_vec(), b"newest".to_vec()),
            (b"k3".to_vec(), b"old".to_vec()),
        ]
    );
}

// =============================================================================
// Test 6: Hitting the threshold flushes to a table and empties the memtable
// =============================================================================
#[test]
fn threshold_triggers_flush() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open_default(dir.path()).unwrap();

    for i in 0..999 {
        db.put(format!("key_{:04}", i).as_bytes(), b"v").unwrap();
    }
    assert_eq!(table_files(dir.path()), 0);
    assert_eq!(db.stats().memtable_entries, 999);

    db.put(b"key_0999", b"v").unwrap();
    let stats = db.stats();
    assert_eq!(table_files(dir.path()), 1);
    assert_eq!(stats.memtable_entries, 0);
    assert_eq!(stats.flush_count, 1);
    assert_eq!(std::fs::metadata(dir.path().join("wal.log")).unwrap().len(), 0);

    for i in 0..1000 {
        assert_eq!(
            db.read(format!("key_{:04}", i).as_bytes()).unwrap(),
            Some(b"v".to_vec())
        );
    }
}

// =============================================================================
// Test 7: Flushing never changes what reads see
// =============================================================================
#[test]
fn flush_is_invisible_to_reads() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open(dir.path(), small_options()).unwrap();

    for i in 0..7 {
        db.put(format!("k{}", i).as_bytes(), format!("v{}", i).as_bytes()).unwrap();
    }
    db.delete(b"k3").unwrap();

    let before_range = db.read_range(b"k0", b"k9").unwrap();
    let before_k3 = db.read(b"k3").unwrap();
    db.flush().unwrap();

    assert_eq!(db.read_range(b"k0", b"k9").unwrap(), before_range);
    assert_eq!(db.read(b"k3").unwrap(), before_k3);
    assert_eq!(db.stats().memtable_entries, 0);
}

// =============================================================================
// Test 8: Flushing an empty memtable writes nothing
// =============================================================================
#[test]
fn flush_empty_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open_default(dir.path()).unwrap();
    db.flush().unwrap();
    assert_eq!(db.stats().flush_count, 0);
    assert_eq!(table_files(dir.path()), 0);
}

// =============================================================================
// Test 9: More than four tables compacts them into one
// =============================================================================
#[test]
fn compaction_after_fifth_flush() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open(dir.path(), small_options()).unwrap();

    for round in 0..4 {
        for i in 0..10 {
            db.put(format!("key_{:02}", i).as_bytes(), format!("r{}", round).as_bytes())
                .unwrap();
        }
    }
    assert_eq!(db.stats().table_count, 4);
    assert_eq!(db.stats().compaction_count, 0);

    // Fifth flush: 9 deletes + 1 put.
    for i in 0..9 {
        db.delete(format!("key_{:02}", i).as_bytes()).unwrap();
    }
    db.put(b"key_09", b"final").unwrap();

    let stats = db.stats();
    assert_eq!(stats.flush_count, 5);
    assert_eq!(stats.compaction_count, 1);
    assert_eq!(stats.table_count, 1);
    assert_eq!(table_files(dir.path()), 1);

    for i in 0..9 {
        assert_eq!(db.read(format!("key_{:02}", i).as_bytes()).unwrap(), None);
    }
    assert_eq!(db.read(b"key_09").unwrap(), Some(b"final".to_vec()));
    assert_eq!(
        db.read_range(b"key_00", b"key_99").unwrap(),
        vec![(b"key_09".to_vec(), b"final".to_vec())]
    );
}

// =============================================================================
// Test 10: Batch put skips pairs with a missing side
// =============================================================================
#[test]
fn batch_put_skips_incomplete_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open_default(dir.path()).unwrap();

    let batch: Vec<(Option<&[u8]>, Option<&[u8]>)> = vec![
        (Some(&b"a"[..]), Some(&b"1"[..])),
        (None, Some(&b"orphan"[..])),
        (Some(&b"b"[..]), None),
        (Some(&b"c"[..]), Some(&b"3"[..])),
    ];
    db.batch_put(&batch).unwrap();

    assert_eq!(db.read(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(db.read(b"b").unwrap(), None);
    assert_eq!(db.read(b"c").unwrap(), Some(b"3".to_vec()));
    assert_eq!(db.stats().memtable_entries, 2);

    db.batch_put(&[]).unwrap();
}

// =============================================================================
// Test 11: Unflushed writes come back from the WAL after a restart
// =============================================================================
#[test]
fn recovery_replays_wal() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = DB::open_default(dir.path()).unwrap();
        db.put(b"key1", b"value1").unwrap();
        db.put(b"key2", b"value2").unwrap();
        db.delete(b"key2").unwrap();
        db.close().unwrap();
    }

    let db = DB::open_default(dir.path()).unwrap();
    assert_eq!(db.read(b"key1").unwrap(), Some(b"value1".to_vec()));
    assert_eq!(db.read(b"key2").unwrap(), None);
    assert_eq!(db.stats().memtable_entries, 2);
}

// =============================================================================
// Test 12: Dropping without close loses nothing that reached the WAL
// =============================================================================
#[test]
fn recovery_without_close() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = DB::open(dir.path(), small_options()).unwrap();
        for i in 0..25 {
            db.put(format!("k{:02}", i).as_bytes(), b"v").unwrap();
        }
        // 20 flushed into two tables, 5 still only in the WAL
    }

    let db = DB::open(dir.path(), small_options()).unwrap();
    let stats = db.stats();
    assert_eq!(stats.table_count, 2);
    assert_eq!(stats.memtable_entries, 5);
    assert_eq!(db.read_range(b"k00", b"k99").unwrap().len(), 25);
}

// =============================================================================
// Test 13: Corrupt WAL fails the open
// =============================================================================
#[test]
fn corrupt_wal_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = DB::open_default(dir.path()).unwrap();
        db.put(b"a", b"1").unwrap();
        db.put(b"b", b"2").unwrap();
        db.close().unwrap();
    }

    let wal_path = dir.path().join("wal.log");
    let mut raw = std::fs::read(&wal_path).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0xFF;
    std::fs::write(&wal_path, &raw).unwrap();

    assert!(matches!(DB::open_default(dir.path()), Err(Error::Corruption(_))));
}

// =============================================================================
// Test 14: Operations after close fail; close is idempotent
// =============================================================================
#[test]
fn operations_after_close_fail() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open_default(dir.path()).unwrap();
    db.put(b"a", b"1").unwrap();
    db.close().unwrap();
    db.close().unwrap();

    assert!(matches!(db.put(b"a", b"2"), Err(Error::Closed)));
    assert!(matches!(db.delete(b"a"), Err(Error::Closed)));
    assert!(matches!(db.read(b"a"), Err(Error::Closed)));
    assert!(matches!(db.read_range(b"a", b"z"), Err(Error::Closed)));
    assert!(matches!(db.flush(), Err(Error::Closed)));
    assert!(matches!(
        db.batch_put(&[(Some(&b"x"[..]), Some(&b"y"[..]))]),
        Err(Error::Closed)
    ));
}

// =============================================================================
// Test 15: Tables and WAL together after restart
// =============================================================================
#[test]
fn reopen_after_flush_and_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = DB::open(dir.path(), small_options()).unwrap();
        db.put(b"k", b"flushed").unwrap();
        db.put(b"gone", b"soon").unwrap();
        db.flush().unwrap();
        db.put(b"k", b"in-wal").unwrap();
        db.delete(b"gone").unwrap();
        db.close().unwrap();
    }

    let db = DB::open(dir.path(), small_options()).unwrap();
    assert_eq!(db.read(b"k").unwrap(), Some(b"in-wal".to_vec()));
    assert_eq!(db.read(b"gone").unwrap(), None);
    assert_eq!(
        db.read_range(b"a", b"z").unwrap(),
        vec![(b"k".to_vec(), b"in-wal".to_vec())]
    );
}

// =============================================================================
// Test 16: Empty keys and values are legal
// =============================================================================
#[test]
fn empty_key_and_value() {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::open(dir.path(), small_options()).unwrap();

    db.put(b"", b"empty-key").unwrap();
    db.put(b"empty-value", b"").unwrap();
    db.flush().unwrap();

    assert_eq!(db.read(b"").unwrap(), Some(b"empty-key".to_vec()));
    assert_eq!(db.read(b"empty-value").unwrap(), Some(Vec::new()));
}

// =============================================================================
// Test 17: Default options
// =============================================================================
#[test]
fn default_options() {
    let options = Options::default();
    assert_eq!(options.memtable_flush_threshold, 1000);
    assert_eq!(options.compaction_trigger, 4);
    assert_eq!(options.index_interval, 128);
    assert_eq!(options.wal_sync_policy, SyncPolicy::EveryNWrites(100));
}
