//! The LSM engine: WAL + memtable + tables behind one read-write lock.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::engine::StorageEngine;
use crate::error::{Error, Result};
use crate::iterator::MergeIterator;
use crate::manifest::TableManager;
use crate::memtable::MemTable;
use crate::sstable::index::DEFAULT_INDEX_INTERVAL;
use crate::types::{Entry, Key, Value, check_field_len};
use crate::wal::{RecordType, SyncPolicy, WAL_FILE_NAME, WriteAheadLog};

/// Engine configuration. `Default` gives the standard tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Flush the memtable once it holds this many keys.
    pub memtable_flush_threshold: usize,
    /// Compact once there are more than this many tables.
    pub compaction_trigger: usize,
    /// When the WAL is fsync'd.
    pub wal_sync_policy: SyncPolicy,
    /// Records between sparse index entries.
    pub index_interval: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            memtable_flush_threshold: 1000,
            compaction_trigger: 4,
            wal_sync_policy: SyncPolicy::default(),
            index_interval: DEFAULT_INDEX_INTERVAL,
        }
    }
}

impl Options {
    pub fn with_memtable_flush_threshold(mut self, entries: usize) -> Self {
        self.memtable_flush_threshold = entries.max(1);
        self
    }

    pub fn with_compaction_trigger(mut self, tables: usize) -> Self {
        self.compaction_trigger = tables;
        self
    }

    pub fn with_wal_sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.wal_sync_policy = policy;
        self
    }

    pub fn with_index_interval(mut self, records: usize) -> Self {
        self.index_interval = records.max(1);
        self
    }
}

/// Point-in-time engine counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub memtable_entries: usize,
    pub memtable_bytes: usize,
    pub table_count: usize,
    /// Flushes since open.
    pub flush_count: u64,
    /// Compactions since open.
    pub compaction_count: u64,
}

struct State {
    /// `None` once closed.
    wal: Option<WriteAheadLog>,
    memtable: MemTable,
    tables: TableManager,
    flush_count: u64,
    compaction_count: u64,
}

impl State {
    fn wal(&mut self) -> Result<&mut WriteAheadLog> {
        self.wal.as_mut().ok_or(Error::Closed)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.wal {
            Some(_) => Ok(()),
            None => Err(Error::Closed),
        }
    }
}

/// Embedded LSM key-value store over one data directory.
///
/// Write path: WAL append → memtable → (threshold reached) flush to a new
/// table → WAL reset → maybe compact. Read path: memtable, then tables
/// newest to oldest; the first value or tombstone found decides.
///
/// Concurrency: writers hold the lock exclusively for the whole write,
/// including any flush and compaction it triggers. Readers share it.
pub struct DB {
    dir: PathBuf,
    options: Options,
    state: RwLock<State>,
}

impl DB {
    /// Open the store in `dir`, creating the directory if needed.
    ///
    /// Recovery: load existing tables (rebuilding their indexes), then
    /// replay the WAL into a fresh memtable. A corrupt WAL or table fails
    /// the open; nothing is partially recovered.
    pub fn open(dir: impl AsRef<Path>, options: Options) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let tables = TableManager::open(&dir, options.index_interval, options.compaction_trigger)?;
        let mut wal = WriteAheadLog::open(&dir.join(WAL_FILE_NAME), options.wal_sync_policy)?;

        let mut memtable = MemTable::new();
        let replayed = wal.replay(|record| {
            match record.record_type {
                RecordType::Put => memtable.put(record.key, record.value),
                RecordType::Delete => memtable.delete(record.key),
            }
            Ok(())
        })?;

        info!(
            dir = %dir.display(),
            tables = tables.len(),
            wal_records = replayed,
            memtable_entries = memtable.len(),
            "database opened"
        );

        Ok(DB {
            dir,
            options,
            state: RwLock::new(State {
                wal: Some(wal),
                memtable,
                tables,
                flush_count: 0,
                compaction_count: 0,
            }),
        })
    }

    /// Open with default options.
    pub fn open_default(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir, Options::default())
    }

    /// Store `value` under `key`.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        check_field_len("key", key.len())?;
        check_field_len("value", value.len())?;

        let mut guard = self.state.write();
        let state = &mut *guard;
        state.wal()?.append_put(key, value)?;
        state.memtable.put(key.to_vec(), value.to_vec());
        self.maybe_flush(state)
    }

    /// Delete `key` by writing a tombstone.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        check_field_len("key", key.len())?;

        let mut guard = self.state.write();
        let state = &mut *guard;
        state.wal()?.append_delete(key)?;
        state.memtable.delete(key.to_vec());
        self.maybe_flush(state)
    }

    /// Live value for `key`.
    pub fn read(&self, key: &[u8]) -> Result<Option<Value>> {
        let state = self.state.read();
        state.ensure_open()?;

        if let Some(entry) = state.memtable.get(key) {
            return Ok(entry.value().map(<[u8]>::to_vec));
        }
        Ok(state.tables.get(key)?.and_then(Entry::into_value))
    }

    /// Live pairs in `[start, end]`, ascending. The memtable beats every
    /// table, and newer tables beat older ones.
    pub fn read_range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Key, Value)>> {
        let state = self.state.read();
        state.ensure_open()?;
        if start > end {
            return Ok(Vec::new());
        }

        let mut sources = vec![state.memtable.read_key_range(start, end)];
        sources.extend(state.tables.range_sources(start, end)?);

        Ok(MergeIterator::new(sources)
            .filter_map(|(key, entry)| entry.into_value().map(|v| (key, v)))
            .collect())
    }

    /// Independent puts; `None` on either side skips the pair.
    pub fn batch_put(&self, entries: &[(Option<&[u8]>, Option<&[u8]>)]) -> Result<()> {
        let mut skipped = 0usize;
        for (key, value) in entries {
            match (key, value) {
                (Some(key), Some(value)) => self.put(key, value)?,
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(skipped, total = entries.len(), "batch put skipped incomplete pairs");
        }
        Ok(())
    }

    /// Flush the memtable now, whatever its size. No-op when empty.
    pub fn flush(&self) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.ensure_open()?;
        self.flush_locked(state)
    }

    /// Sync and close the WAL. The memtable is *not* flushed: its contents
    /// come back from the WAL on the next open. Closing twice is fine.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        if let Some(wal) = state.wal.take() {
            wal.close()?;
            info!(
                dir = %self.dir.display(),
                memtable_entries = state.memtable.len(),
                "database closed"
            );
        }
        Ok(())
    }

    pub fn stats(&self) -> Stats {
        let state = self.state.read();
        Stats {
            memtable_entries: state.memtable.len(),
            memtable_bytes: state.memtable.approximate_byte_size(),
            table_count: state.tables.len(),
            flush_count: state.flush_count,
            compaction_count: state.compaction_count,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn maybe_flush(&self, state: &mut State) -> Result<()> {
        if state.memtable.len() >= self.options.memtable_flush_threshold {
            self.flush_locked(state)?;
        }
        Ok(())
    }

    /// Memtable → new table → register → clear memtable → reset WAL →
    /// compact. The WAL is only reset after the table is fsync'd and
    /// renamed into place.
    fn flush_locked(&self, state: &mut State) -> Result<()> {
        if state.memtable.is_empty() {
            return Ok(());
        }

        let entries = state.memtable.len();
        let bytes = state.memtable.approximate_byte_size();
        // Tombstones go to disk too: they must shadow older tables.
        let table = state.tables.write_table(state.memtable.iter())?;
        let id = table.id();
        state.tables.register(table);
        state.memtable.clear();
        state.wal()?.reset()?;
        state.flush_count += 1;

        debug!(table_id = id, entries, approximate_bytes = bytes, "memtable flushed");

        if state.tables.compact()?.is_some() {
            state.compaction_count += 1;
        }
        Ok(())
    }
}

impl StorageEngine for DB {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        DB::put(self, key, value)
    }

    fn read(&self, key: &[u8]) -> Result<Option<Value>> {
        DB::read(self, key)
    }

    fn read_range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Key, Value)>> {
        DB::read_range(self, start, end)
    }

    fn batch_put(&self, entries: &[(Option<&[u8]>, Option<&[u8]>)]) -> Result<()> {
        DB::batch_put(self, entries)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        DB::delete(self, key)
    }

    fn close(&self) -> Result<()> {
        DB::close(self)
    }
}
