use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::wal::record::WALRecord;

/// Reads WAL records for crash recovery.
///
/// Loads the entire log into memory, then iterates record by record.
/// The log is truncated after every flush, so it never holds more than one
/// memtable's worth of mutations.
pub struct WALReader {
    data: Vec<u8>,
}

impl WALReader {
    /// Open a WAL file for reading.
    pub fn new(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(WALReader { data })
    }

    /// Wrap bytes already read from the log.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        WALReader { data }
    }

    /// Create an iterator over all records in the WAL.
    pub fn iter(&self) -> WALIterator<'_> {
        WALIterator {
            data: &self.data,
            offset: 0,
            failed: false,
        }
    }
}

/// Iterator over WAL records in file order (oldest first).
///
/// A malformed record yields one `Err` and ends the iteration. Nothing
/// after a bad record is trusted: recovery must abort rather than resume
/// from a guessed position.
pub struct WALIterator<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl WALIterator<'_> {
    /// Byte offset of the next record to decode.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for WALIterator<'_> {
    type Item = Result<WALRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        match WALRecord::decode(&self.data[self.offset..]) {
            Ok(record) => {
                self.offset += record.encoded_size();
                Some(Ok(record))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
