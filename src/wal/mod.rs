pub mod reader;
pub mod record;
pub mod writer;

pub use record::{RecordType, WALRecord};
pub use writer::WriteAheadLog;

/// File name of the log inside a data directory.
pub const WAL_FILE_NAME: &str = "wal.log";

/// Controls when the WAL is fsync'd to disk.
///
/// Trade-off: durability vs throughput.
///   - EveryWrite: zero data loss, every append waits for the disk
///   - EveryNWrites: batched durability, lose up to N appends on crash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fsync after every record. Safest, slowest.
    EveryWrite,
    /// fsync every N records. `EveryNWrites(0)` behaves like `EveryWrite`.
    EveryNWrites(usize),
}

impl SyncPolicy {
    /// Number of appends allowed between physical syncs.
    pub fn period(&self) -> usize {
        match *self {
            SyncPolicy::EveryWrite => 1,
            SyncPolicy::EveryNWrites(n) => n.max(1),
        }
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy::EveryNWrites(100)
    }
}
