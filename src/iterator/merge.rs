use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::{Entry, Key};

/// Merges several sorted entry streams into one sorted stream.
///
/// Used for range scans across the memtable and every table on disk.
///
/// Sources are ordered by priority: index 0 = newest (memtable), higher
/// indices = older tables. Each source must be strictly ascending by key.
/// When several sources hold the same key, only the entry from the
/// lowest-indexed (newest) source is yielded. Tombstones are yielded too;
/// the caller decides whether to drop them.
pub struct MergeIterator {
    sources: Vec<std::vec::IntoIter<(Key, Entry)>>,
    heap: BinaryHeap<HeapItem>,
}

/// Heap slot: the current head of one source.
struct HeapItem {
    key: Key,
    source: usize,
    entry: Entry,
}

// BinaryHeap is a max-heap, so "greater" here means "pops first":
// smaller key first, then newer source first.
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.source.cmp(&self.source))
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}

impl Eq for HeapItem {}

impl MergeIterator {
    /// Build the merge from sources ordered newest first.
    pub fn new(sources: Vec<Vec<(Key, Entry)>>) -> Self {
        let mut merge = MergeIterator {
            sources: sources.into_iter().map(Vec::into_iter).collect(),
            heap: BinaryHeap::new(),
        };
        for source in 0..merge.sources.len() {
            merge.advance(source);
        }
        merge
    }

    /// Push the next entry of `source` onto the heap.
    fn advance(&mut self, source: usize) {
        if let Some((key, entry)) = self.sources[source].next() {
            self.heap.push(HeapItem { key, source, entry });
        }
    }
}

impl Iterator for MergeIterator {
    type Item = (Key, Entry);

    fn next(&mut self) -> Option<Self::Item> {
        let top = self.heap.pop()?;
        self.advance(top.source);

        // Older copies of the same key are shadowed.
        while self.heap.peek().is_some_and(|item| item.key == top.key) {
            if let Some(stale) = self.heap.pop() {
                self.advance(stale.source);
            }
        }
        Some((top.key, top.entry))
    }
}
