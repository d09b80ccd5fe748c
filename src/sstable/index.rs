use std::collections::BTreeMap;
use std::ops::Bound;

use crate::types::Key;

/// Default distance (in records) between indexed keys.
pub const DEFAULT_INDEX_INTERVAL: usize = 128;

/// Sparse key → file offset index over one table.
///
/// Holds every Nth key (the 0th, Nth, 2Nth, …) with the byte offset of its
/// record. A lookup seeks to the floor entry and scans forward at most N
/// records. Never persisted: rebuilt from a full scan when a table is
/// opened, or filled in by the builder while the table is written.
#[derive(Debug, Clone, Default)]
pub struct SparseIndex {
    entries: BTreeMap<Key, u64>,
}

impl SparseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the record with ordinal `n` should be indexed.
    pub fn should_index(n: u64, interval: usize) -> bool {
        n % interval.max(1) as u64 == 0
    }

    pub fn add(&mut self, key: Key, offset: u64) {
        self.entries.insert(key, offset);
    }

    /// Offset of the greatest indexed key <= `key`.
    pub fn floor(&self, key: &[u8]) -> Option<u64> {
        self.entries
            .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
            .next_back()
            .map(|(_, offset)| *offset)
    }

    /// Where a forward scan for `key` should start. Falls back to the
    /// beginning of the file when `key` sorts before every indexed key.
    pub fn seek_offset(&self, key: &[u8]) -> u64 {
        self.floor(key).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
