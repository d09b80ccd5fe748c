use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::error;

use crate::error::{Error, Result};
use crate::sstable::format::{RECORD_HEADER_SIZE, RecordHeader, SSTableMeta};
use crate::sstable::index::SparseIndex;
use crate::types::{Entry, Key};

/// An immutable table file plus its in-memory sparse index.
///
/// Reads open their own file handle, so any number of readers can use the
/// same table at once.
#[derive(Debug)]
pub struct SSTable {
    meta: SSTableMeta,
    index: SparseIndex,
}

impl SSTable {
    /// Open an existing table file.
    ///
    /// The index is not stored on disk, so this scans every record once to
    /// rebuild it. The scan also validates the file: a malformed record or
    /// keys out of order fail the open with a corruption error.
    pub fn open(path: &Path, id: u64, index_interval: usize) -> Result<Self> {
        let mut cursor = SSTableIterator::open(path, 0)?;
        let file_size = cursor.end;

        let mut index = SparseIndex::new();
        let mut entry_count = 0u64;
        let mut min_key: Option<Key> = None;
        let mut last_key: Option<Key> = None;

        loop {
            let offset = cursor.position();
            let (key, _) = match cursor.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    error!(path = %path.display(), offset, error = %e, "table scan failed");
                    return Err(e);
                }
            };

            if let Some(last) = &last_key {
                if key.as_slice() <= last.as_slice() {
                    error!(path = %path.display(), offset, "table keys out of order");
                    return Err(Error::Corruption(format!(
                        "{}: keys out of order at offset {offset}",
                        path.display()
                    )));
                }
            }
            if SparseIndex::should_index(entry_count, index_interval) {
                index.add(key.clone(), offset);
            }
            if min_key.is_none() {
                min_key = Some(key.clone());
            }
            last_key = Some(key);
            entry_count += 1;
        }

        let meta = SSTableMeta {
            id,
            path: path.to_path_buf(),
            entry_count,
            file_size,
            min_key,
            max_key: last_key,
        };
        Ok(SSTable { meta, index })
    }

    /// Wrap a table whose index was built while writing it.
    pub(crate) fn from_parts(meta: SSTableMeta, index: SparseIndex) -> Self {
        SSTable { meta, index }
    }

    /// Point lookup.
    ///
    /// Algorithm:
    /// 1. Key outside [min_key, max_key] → not here
    /// 2. Seek to the index floor of `key`
    /// 3. Scan forward; stop as soon as a key > target shows up
    ///
    /// A tombstone is returned as `Some(Entry::Tombstone)`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Entry>> {
        if !self.meta.may_contain(key) {
            return Ok(None);
        }

        let mut cursor = SSTableIterator::open(&self.meta.path, self.index.seek_offset(key))?;
        while let Some((k, entry)) = cursor.next_record()? {
            match k.as_slice().cmp(key) {
                std::cmp::Ordering::Less => continue,
                std::cmp::Ordering::Equal => return Ok(Some(entry)),
                std::cmp::Ordering::Greater => break,
            }
        }
        Ok(None)
    }

    /// Every record with `start <= key <= end`, ascending, tombstones included.
    pub fn range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Key, Entry)>> {
        let mut out = Vec::new();
        if start > end || !self.meta.overlaps(start, end) {
            return Ok(out);
        }

        let mut cursor = SSTableIterator::open(&self.meta.path, self.index.seek_offset(start))?;
        while let Some((k, entry)) = cursor.next_record()? {
            if k.as_slice() > end {
                break;
            }
            if k.as_slice() >= start {
                out.push((k, entry));
            }
        }
        Ok(out)
    }

    /// Read the whole table into a map. Used by compaction.
    pub fn read_all_entries(&self) -> Result<BTreeMap<Key, Entry>> {
        self.iter()?.collect()
    }

    /// Iterate over every record from the start of the file.
    pub fn iter(&self) -> Result<SSTableIterator> {
        SSTableIterator::open(&self.meta.path, 0)
    }

    pub fn meta(&self) -> &SSTableMeta {
        &self.meta
    }

    pub fn index(&self) -> &SparseIndex {
        &self.index
    }

    pub fn id(&self) -> u64 {
        self.meta.id
    }

    pub fn path(&self) -> &Path {
        &self.meta.path
    }
}

/// Forward cursor over the records of one table file.
///
/// Ends cleanly only when positioned exactly at end-of-file; a record cut
/// short anywhere else is corruption.
pub struct SSTableIterator {
    reader: BufReader<File>,
    path: PathBuf,
    pos: u64,
    end: u64,
    failed: bool,
}

impl SSTableIterator {
    /// Open `path` positioned at `offset` (a record boundary).
    pub fn open(path: &Path, offset: u64) -> Result<Self> {
        let mut file = File::open(path)?;
        let end = file.metadata()?.len();
        if offset > end {
            return Err(Error::Corruption(format!(
                "{}: seek offset {offset} past end of file ({end} bytes)",
                path.display()
            )));
        }
        file.seek(SeekFrom::Start(offset))?;
        Ok(SSTableIterator {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            pos: offset,
            end,
            failed: false,
        })
    }

    /// Byte offset of the next record.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Decode the next record, or `None` at a clean end-of-file.
    pub fn next_record(&mut self) -> Result<Option<(Key, Entry)>> {
        if self.pos == self.end {
            return Ok(None);
        }
        let remaining = self.end - self.pos;
        if remaining < RECORD_HEADER_SIZE as u64 {
            return Err(self.truncated());
        }

        let mut raw = [0u8; RECORD_HEADER_SIZE];
        self.read_exact(&mut raw)?;
        let header = RecordHeader::decode(&raw).map_err(|e| match e {
            Error::Corruption(msg) => Error::Corruption(format!(
                "{}: {msg} at offset {}",
                self.path.display(),
                self.pos
            )),
            other => other,
        })?;
        if header.body_len() > remaining - RECORD_HEADER_SIZE as u64 {
            return Err(self.truncated());
        }

        let mut key = vec![0u8; header.key_len];
        self.read_exact(&mut key)?;
        let entry = match header.value_len {
            Some(len) => {
                let mut value = vec![0u8; len];
                self.read_exact(&mut value)?;
                Entry::Value(value)
            }
            None => Entry::Tombstone,
        };

        self.pos += RECORD_HEADER_SIZE as u64 + header.body_len();
        Ok(Some((key, entry)))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                self.truncated()
            } else {
                Error::Io(e)
            }
        })
    }

    fn truncated(&self) -> Error {
        Error::Corruption(format!(
            "{}: truncated record at offset {}",
            self.path.display(),
            self.pos
        ))
    }
}

impl Iterator for SSTableIterator {
    type Item = Result<(Key, Entry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
