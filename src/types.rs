use crate::error::{Error, Result};

/// Raw key bytes. Keys compare lexicographically.
pub type Key = Vec<u8>;

/// Raw value bytes.
pub type Value = Vec<u8>;

/// Longest key or value whose length still fits the `i32` length fields
/// used by both the WAL and the table format.
pub const MAX_FIELD_LEN: usize = i32::MAX as usize;

/// A value slot: either live bytes or a deletion tombstone.
///
/// A key that was never written is represented by its absence from a map,
/// never by an `Entry`. Tombstones have to be kept (and flushed) because
/// older tables on disk may still hold a value for the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A live value.
    Value(Value),
    /// The key was deleted.
    Tombstone,
}

impl Entry {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Entry::Tombstone)
    }

    /// The live value, or `None` for a tombstone.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Tombstone => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Tombstone => None,
        }
    }
}

/// Rejects fields that cannot be represented by an `i32` length prefix.
pub(crate) fn check_field_len(what: &str, len: usize) -> Result<()> {
    if len > MAX_FIELD_LEN {
        return Err(Error::InvalidArgument(format!(
            "{what} length {len} exceeds maximum of {MAX_FIELD_LEN} bytes"
        )));
    }
    Ok(())
}
