//! On-disk record layout and table file naming.
//!
//! A table file is nothing but records sorted ascending by key; there is no
//! header or footer. Each record:
//!
//! ```text
//! ┌─────────────┬─────────────┬───────────┬────────────────────────┐
//! │ KeyLen (4B) │ ValLen (4B) │ Key (var) │ Val (ValLen bytes, or  │
//! │     i32     │     i32     │           │ nothing if ValLen = -1)│
//! └─────────────┴─────────────┴───────────┴────────────────────────┘
//! ```
//!
//! Lengths are little-endian `i32`. `ValLen == -1` marks a tombstone.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::{Entry, Key};

/// `ValLen` sentinel for a tombstone.
pub const TOMBSTONE_LEN: i32 = -1;

/// Size of the two length fields in front of every record.
pub const RECORD_HEADER_SIZE: usize = 8;

pub const TABLE_FILE_PREFIX: &str = "sstable_";
pub const TABLE_FILE_SUFFIX: &str = ".dat";
/// Suffix of a table still being written. Never picked up by discovery.
pub const TMP_FILE_SUFFIX: &str = ".tmp";

/// File name for the table with sequence number `id`, e.g. `sstable_000042.dat`.
pub fn table_file_name(id: u64) -> String {
    format!("{TABLE_FILE_PREFIX}{id:06}{TABLE_FILE_SUFFIX}")
}

/// Inverse of `table_file_name`. Returns `None` for anything that is not a
/// finished table file.
pub fn parse_table_file_name(name: &str) -> Option<u64> {
    let seq = name
        .strip_prefix(TABLE_FILE_PREFIX)?
        .strip_suffix(TABLE_FILE_SUFFIX)?;
    if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seq.parse().ok()
}

/// Append one record to `buf`.
pub fn encode_record(key: &[u8], entry: &Entry, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(key.len() as i32).to_le_bytes());
    match entry {
        Entry::Value(v) => {
            buf.extend_from_slice(&(v.len() as i32).to_le_bytes());
            buf.extend_from_slice(key);
            buf.extend_from_slice(v);
        }
        Entry::Tombstone => {
            buf.extend_from_slice(&TOMBSTONE_LEN.to_le_bytes());
            buf.extend_from_slice(key);
        }
    }
}

/// Parsed length fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub key_len: usize,
    /// `None` for a tombstone.
    pub value_len: Option<usize>,
}

impl RecordHeader {
    /// Validate the raw length fields.
    pub fn decode(raw: &[u8; RECORD_HEADER_SIZE]) -> Result<Self> {
        let key_len = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let value_len = i32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);

        if key_len < 0 {
            return Err(Error::Corruption(format!("negative key length: {key_len}")));
        }
        let value_len = match value_len {
            TOMBSTONE_LEN => None,
            n if n < 0 => {
                return Err(Error::Corruption(format!("invalid value length: {n}")));
            }
            n => Some(n as usize),
        };
        Ok(RecordHeader {
            key_len: key_len as usize,
            value_len,
        })
    }

    /// Bytes following the header.
    pub fn body_len(&self) -> u64 {
        self.key_len as u64 + self.value_len.unwrap_or(0) as u64
    }
}

/// Metadata about a table file, rebuilt whenever the file is opened.
#[derive(Debug, Clone)]
pub struct SSTableMeta {
    /// Sequence number taken from the file name; higher is newer.
    pub id: u64,
    pub path: PathBuf,
    /// Number of records (including tombstones).
    pub entry_count: u64,
    /// File size in bytes.
    pub file_size: u64,
    /// Smallest key, `None` for an empty table.
    pub min_key: Option<Key>,
    /// Largest key, `None` for an empty table.
    pub max_key: Option<Key>,
}

impl SSTableMeta {
    /// Whether `key` can possibly be in this table.
    pub fn may_contain(&self, key: &[u8]) -> bool {
        match (&self.min_key, &self.max_key) {
            (Some(min), Some(max)) => key >= min.as_slice() && key <= max.as_slice(),
            _ => false,
        }
    }

    /// Whether `[start, end]` intersects this table's key range.
    pub fn overlaps(&self, start: &[u8], end: &[u8]) -> bool {
        match (&self.min_key, &self.max_key) {
            (Some(min), Some(max)) => start <= max.as_slice() && end >= min.as_slice(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_roundtrip() {
        assert_eq!(table_file_name(42), "sstable_000042.dat");
        assert_eq!(parse_table_file_name("sstable_000042.dat"), Some(42));
        assert_eq!(parse_table_file_name(&table_file_name(1_234_567)), Some(1_234_567));
    }

    #[test]
    fn foreign_names_are_ignored() {
        assert_eq!(parse_table_file_name("wal.log"), None);
        assert_eq!(parse_table_file_name("sstable_000001.dat.tmp"), None);
        assert_eq!(parse_table_file_name("sstable_.dat"), None);
        assert_eq!(parse_table_file_name("sstable_12a.dat"), None);
        assert_eq!(parse_table_file_name("data.sstable"), None);
    }

    #[test]
    fn tombstone_record_layout() {
        let mut buf = Vec::new();
        encode_record(b"gone", &Entry::Tombstone, &mut buf);
        assert_eq!(buf.len(), RECORD_HEADER_SIZE + 4);

        let header = RecordHeader::decode(buf[..8].try_into().unwrap()).unwrap();
        assert_eq!(header.key_len, 4);
        assert_eq!(header.value_len, None);
        assert_eq!(header.body_len(), 4);
    }

    #[test]
    fn bad_lengths_are_corruption() {
        let mut raw = [0u8; RECORD_HEADER_SIZE];
        raw[..4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(RecordHeader::decode(&raw), Err(Error::Corruption(_))));

        raw[..4].copy_from_slice(&3i32.to_le_bytes());
        raw[4..].copy_from_slice(&(-2i32).to_le_bytes());
        assert!(matches!(RecordHeader::decode(&raw), Err(Error::Corruption(_))));
    }

    #[test]
    fn key_range_checks() {
        let meta = SSTableMeta {
            id: 1,
            path: PathBuf::from("sstable_000001.dat"),
            entry_count: 2,
            file_size: 0,
            min_key: Some(b"c".to_vec()),
            max_key: Some(b"m".to_vec()),
        };
        assert!(meta.may_contain(b"c"));
        assert!(meta.may_contain(b"m"));
        assert!(!meta.may_contain(b"a"));
        assert!(!meta.may_contain(b"n"));
        assert!(meta.overlaps(b"a", b"c"));
        assert!(meta.overlaps(b"m", b"z"));
        assert!(!meta.overlaps(b"n", b"z"));
    }
}
