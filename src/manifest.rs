//! Registry of the live table files in a data directory.
//!
//! There is no manifest file: the directory listing *is* the manifest.
//! Table files are named `sstable_<seq>.dat`, and sorting by `seq` gives
//! creation order, which is also recency (last = newest). Newest-wins
//! resolution therefore needs no per-entry timestamps.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::iterator::MergeIterator;
use crate::sstable::format::{TMP_FILE_SUFFIX, parse_table_file_name, table_file_name};
use crate::sstable::{SSTable, SSTableBuilder};
use crate::types::{Entry, Key};

/// Owns every table file of one engine instance.
///
/// No other component opens, creates, or deletes table files.
pub struct TableManager {
    pub(crate) dir: PathBuf,
    /// Creation order: oldest first.
    pub(crate) tables: Vec<SSTable>,
    pub(crate) next_id: u64,
    pub(crate) index_interval: usize,
    pub(crate) compaction_trigger: usize,
}

impl TableManager {
    /// Discover the tables already in `dir` and rebuild their indexes.
    ///
    /// Leftover `*.tmp` files from an interrupted flush or compaction are
    /// removed; they were never registered.
    pub fn open(dir: &Path, index_interval: usize, compaction_trigger: usize) -> Result<Self> {
        let mut found: Vec<(u64, PathBuf)> = Vec::new();

        for dir_entry in fs::read_dir(dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if let Some(id) = parse_table_file_name(name) {
                found.push((id, path));
            } else if name.ends_with(TMP_FILE_SUFFIX)
                && name.strip_suffix(TMP_FILE_SUFFIX).and_then(parse_table_file_name).is_some()
            {
                warn!(path = %path.display(), "removing unfinished table file");
                fs::remove_file(&path)?;
            }
        }

        found.sort_by_key(|(id, _)| *id);

        let mut tables = Vec::with_capacity(found.len());
        for (id, path) in &found {
            tables.push(SSTable::open(path, *id, index_interval)?);
        }
        let next_id = found.last().map_or(1, |(id, _)| id + 1);

        info!(
            dir = %dir.display(),
            tables = tables.len(),
            next_id,
            "table manager opened"
        );

        Ok(TableManager {
            dir: dir.to_path_buf(),
            tables,
            next_id,
            index_interval,
            compaction_trigger,
        })
    }

    /// Claim the next sequence number and its file path.
    ///
    /// Every call yields a distinct name that sorts after every existing
    /// table, inside the directory that `open` scans.
    pub fn next_table_path(&mut self) -> (u64, PathBuf) {
        let id = self.next_id;
        self.next_id += 1;
        (id, self.dir.join(table_file_name(id)))
    }

    /// Write `entries` (strictly ascending) to a new table file.
    ///
    /// The table is not registered; call `register` once the caller is
    /// ready for readers to see it.
    pub fn write_table<'a, I>(&mut self, entries: I) -> Result<SSTable>
    where
        I: IntoIterator<Item = (&'a [u8], &'a Entry)>,
    {
        let (id, path) = self.next_table_path();
        let mut builder = SSTableBuilder::new(&path, id, self.index_interval)?;
        for (key, entry) in entries {
            builder.add(key, entry)?;
        }
        builder.finish()
    }

    /// Append a finished table as the newest.
    pub fn register(&mut self, table: SSTable) {
        self.tables.push(table);
    }

    /// Point lookup across all tables, newest to oldest.
    ///
    /// The first table that knows the key decides, whether it holds a value
    /// or a tombstone; older tables are not consulted.
    pub fn get(&self, key: &[u8]) -> Result<Option<Entry>> {
        for table in self.tables.iter().rev() {
            if let Some(entry) = table.get(key)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Per-table range results for `[start, end]`, newest table first.
    ///
    /// Suitable as `MergeIterator` sources (after any fresher source).
    pub fn range_sources(&self, start: &[u8], end: &[u8]) -> Result<Vec<Vec<(Key, Entry)>>> {
        self.tables
            .iter()
            .rev()
            .map(|table| table.range(start, end))
            .collect()
    }

    /// Range scan across all tables. For a key present in several tables
    /// the newest table's entry wins. Tombstones are included.
    pub fn get_range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Key, Entry)>> {
        let sources = self.range_sources(start, end)?;
        Ok(MergeIterator::new(sources).collect())
    }

    /// Live tables, oldest first.
    pub fn tables(&self) -> &[SSTable] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
