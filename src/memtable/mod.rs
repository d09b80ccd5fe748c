pub mod skiplist;

use skiplist::{SkipList, SkipListIterator};

use crate::types::{Entry, Key, Value};

/// Fixed bookkeeping cost charged per entry in `approximate_byte_size`.
pub const ENTRY_OVERHEAD: usize = 32;

/// In-memory sorted buffer for writes. Wraps a SkipList.
///
/// Every write goes here first (after the WAL). Once the entry count
/// reaches the engine's flush threshold, the contents are written to a
/// table file and the memtable is cleared.
///
/// Deletes are stored as `Entry::Tombstone`. You can't just remove the key
/// because older versions may exist in tables on disk.
///
/// No internal locking: the engine only touches it under its own lock.
pub struct MemTable {
    data: SkipList<Entry>,
    approximate_bytes: usize,
}

impl MemTable {
    /// Create a new empty memtable.
    pub fn new() -> Self {
        MemTable {
            data: SkipList::new(),
            approximate_bytes: 0,
        }
    }

    /// Insert or update a key-value pair.
    pub fn put(&mut self, key: Key, value: Value) {
        self.approximate_bytes += key.len() + value.len() + ENTRY_OVERHEAD;
        self.data.insert(key, Entry::Value(value));
    }

    /// Mark a key as deleted by writing a tombstone.
    pub fn delete(&mut self, key: Key) {
        self.approximate_bytes += key.len() + ENTRY_OVERHEAD;
        self.data.insert(key, Entry::Tombstone);
    }

    /// Look up a key. A tombstone is returned as-is so the caller knows not
    /// to look further down.
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        self.data.get(key)
    }

    /// Entries with `start <= key <= end`, ascending, tombstones included.
    pub fn read_key_range(&self, start: &[u8], end: &[u8]) -> Vec<(Key, Entry)> {
        if start > end {
            return Vec::new();
        }
        self.data
            .seek(start)
            .take_while(|(k, _)| *k <= end)
            .map(|(k, e)| (k.to_vec(), e.clone()))
            .collect()
    }

    /// Return a sorted iterator over all entries (including tombstones).
    pub fn iter(&self) -> SkipListIterator<'_, Entry> {
        self.data.iter()
    }

    /// Number of distinct keys (tombstones count).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Running total of key + value + overhead bytes written since the last
    /// clear. Overwrites are not subtracted, so this is for diagnostics only.
    pub fn approximate_byte_size(&self) -> usize {
        self.approximate_bytes
    }

    /// Drop all entries. Call only after they are durable in a table.
    pub fn clear(&mut self) {
        self.data.clear();
        self.approximate_bytes = 0;
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
