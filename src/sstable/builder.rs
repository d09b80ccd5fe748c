use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::sstable::format::{SSTableMeta, TMP_FILE_SUFFIX, encode_record};
use crate::sstable::index::SparseIndex;
use crate::sstable::reader::SSTable;
use crate::types::{Entry, Key, check_field_len};

/// Builds a table file from a sorted stream of entries.
///
/// Used during:
/// - Memtable flush (tombstones kept)
/// - Compaction (the caller leaves tombstones out)
///
/// Build process:
/// 1. Add entries one by one (strictly ascending keys)
/// 2. Every Nth record's offset goes into the sparse index
/// 3. finish() flushes, fsyncs, and renames `<name>.tmp` into place
pub struct SSTableBuilder {
    writer: BufWriter<File>,
    path: PathBuf,
    tmp_path: PathBuf,
    id: u64,
    index: SparseIndex,
    index_interval: usize,
    /// Current write position in the file.
    offset: u64,
    entry_count: u64,
    min_key: Option<Key>,
    /// Last key added; also the max key once the build is done.
    last_key: Option<Key>,
    buf: Vec<u8>,
}

impl SSTableBuilder {
    /// Start a new table that will appear at `path` once finished.
    pub fn new(path: &Path, id: u64, index_interval: usize) -> Result<Self> {
        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(TMP_FILE_SUFFIX);
        let tmp_path = PathBuf::from(tmp_name);

        let file = File::create(&tmp_path)?;
        Ok(SSTableBuilder {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            tmp_path,
            id,
            index: SparseIndex::new(),
            index_interval,
            offset: 0,
            entry_count: 0,
            min_key: None,
            last_key: None,
            buf: Vec::new(),
        })
    }

    /// Add one entry. Keys MUST arrive in strictly ascending order.
    pub fn add(&mut self, key: &[u8], entry: &Entry) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(Error::InvalidArgument(
                    "table keys must be added in strictly ascending order".into(),
                ));
            }
        }
        check_field_len("key", key.len())?;
        if let Entry::Value(v) = entry {
            check_field_len("value", v.len())?;
        }

        if SparseIndex::should_index(self.entry_count, self.index_interval) {
            self.index.add(key.to_vec(), self.offset);
        }

        self.buf.clear();
        encode_record(key, entry, &mut self.buf);
        self.writer.write_all(&self.buf)?;

        self.offset += self.buf.len() as u64;
        self.entry_count += 1;
        if self.min_key.is_none() {
            self.min_key = Some(key.to_vec());
        }
        self.last_key = Some(key.to_vec());
        Ok(())
    }

    /// Number of entries added so far.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Finalize the table: flush, fsync, rename into place.
    ///
    /// Returns the opened table with its in-memory index, ready to be
    /// registered.
    pub fn finish(mut self) -> Result<SSTable> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.tmp_path, &self.path)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            sync_dir(dir)?;
        }

        let meta = SSTableMeta {
            id: self.id,
            path: self.path,
            entry_count: self.entry_count,
            file_size: self.offset,
            min_key: self.min_key,
            max_key: self.last_key,
        };
        Ok(SSTable::from_parts(meta, self.index))
    }
}

/// Make a rename inside `dir` durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
