use crate::error::Result;
use crate::types::{Key, Value};

/// What a storage backend offers to its callers (request servers, the
/// string façade, replication hooks). `DB` is the LSM implementation.
///
/// Every method is safe to call from many threads at once.
pub trait StorageEngine: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// The live value for `key`, or `None` if absent or deleted.
    fn read(&self, key: &[u8]) -> Result<Option<Value>>;

    /// Live pairs with `start <= key <= end`, ascending by key.
    fn read_range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Key, Value)>>;

    /// Apply each pair as an independent `put`, skipping pairs with a
    /// missing key or value. Not atomic: on error, the pairs before the
    /// failing one stay applied.
    fn batch_put(&self, entries: &[(Option<&[u8]>, Option<&[u8]>)]) -> Result<()>;

    /// Remove `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Make everything acknowledged so far durable and release the log.
    fn close(&self) -> Result<()>;
}
