//! Full compaction: once there are too many tables, merge all of them
//! into one.
//!
//! Runs synchronously on the writer path; readers and writers wait until
//! it finishes.

use std::collections::BTreeMap;
use std::fs;

use tracing::info;

use crate::error::Result;
use crate::manifest::TableManager;
use crate::sstable::SSTable;
use crate::types::{Entry, Key};

/// Outcome of one compaction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionResult {
    /// Tables merged (all of them).
    pub input_tables: usize,
    /// Id of the table written, `None` if everything merged away.
    pub output_id: Option<u64>,
    /// Live entries written.
    pub output_entries: u64,
    /// Tombstones elided.
    pub dropped_tombstones: u64,
}

/// Fold tables, oldest first, into one map. Later tables overwrite earlier
/// ones for duplicate keys, so each key ends up with its newest entry.
pub fn merge_tables(tables: &[SSTable]) -> Result<BTreeMap<Key, Entry>> {
    let mut merged = BTreeMap::new();
    for table in tables {
        merged.extend(table.read_all_entries()?);
    }
    Ok(merged)
}

impl TableManager {
    /// Compact if the number of live tables exceeds the trigger.
    ///
    /// Returns `None` when nothing was done.
    pub fn compact(&mut self) -> Result<Option<CompactionResult>> {
        if self.tables.len() <= self.compaction_trigger {
            return Ok(None);
        }
        self.compact_all().map(Some)
    }

    /// Merge every live table into a single new one.
    ///
    /// Tombstones are dropped: the merge covers every table, so nothing
    /// older remains for them to shadow.
    ///
    /// Crash safety: the output gets a sequence number newer than every
    /// input and is durable before any input is deleted. Inputs are deleted
    /// oldest first, so a crash part-way never leaves an old value visible
    /// with the tombstone that hid it already gone.
    pub fn compact_all(&mut self) -> Result<CompactionResult> {
        let input_tables = self.tables.len();
        let merged = merge_tables(&self.tables)?;

        let live = merged.iter().filter(|(_, e)| !e.is_tombstone()).count() as u64;
        let dropped_tombstones = merged.len() as u64 - live;

        let output = if live > 0 {
            let entries = merged
                .iter()
                .filter(|(_, e)| !e.is_tombstone())
                .map(|(k, e)| (k.as_slice(), e));
            Some(self.write_table(entries)?)
        } else {
            None
        };
        let output_id = output.as_ref().map(SSTable::id);

        let old = std::mem::take(&mut self.tables);
        if let Some(table) = output {
            self.register(table);
        }
        for table in &old {
            fs::remove_file(table.path())?;
        }

        info!(
            input_tables,
            output_id = ?output_id,
            output_entries = live,
            dropped_tombstones,
            "compaction finished"
        );

        Ok(CompactionResult {
            input_tables,
            output_id,
            output_entries: live,
            dropped_tombstones,
        })
    }
}
