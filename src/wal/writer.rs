use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::Result;
use crate::types::check_field_len;
use crate::wal::SyncPolicy;
use crate::wal::reader::WALReader;
use crate::wal::record::WALRecord;

/// Append-only durable log of mutations not yet flushed to a table.
///
/// Appends go straight to the file (one `write` per record) and reach the
/// OS page cache immediately; `sync_all` pushes them to the disk. With
/// `SyncPolicy::EveryNWrites(n)` at most `n - 1` acknowledged appends can
/// be lost on power failure.
///
/// Invariant: replaying the log from offset 0 rebuilds exactly the memtable
/// that was live when the last append returned.
pub struct WriteAheadLog {
    path: PathBuf,
    file: File,
    /// Current end of the log (bytes).
    len: u64,
    sync_policy: SyncPolicy,
    writes_since_sync: usize,
    sync_count: u64,
}

impl WriteAheadLog {
    /// Open (or create) the log at `path`, positioned at its end.
    pub fn open(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.seek(SeekFrom::End(0))?;

        Ok(WriteAheadLog {
            path: path.to_path_buf(),
            file,
            len,
            sync_policy,
            writes_since_sync: 0,
            sync_count: 0,
        })
    }

    /// Log a put.
    pub fn append_put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        check_field_len("key", key.len())?;
        check_field_len("value", value.len())?;
        self.append(&WALRecord::put(key.to_vec(), value.to_vec()))
    }

    /// Log a delete.
    pub fn append_delete(&mut self, key: &[u8]) -> Result<()> {
        check_field_len("key", key.len())?;
        self.append(&WALRecord::delete(key.to_vec()))
    }

    /// Append a record at the end of the log.
    /// Depending on the SyncPolicy, may fsync after this write.
    pub fn append(&mut self, record: &WALRecord) -> Result<()> {
        let encoded = record.encode();

        self.file.seek(SeekFrom::Start(self.len))?;
        self.file.write_all(&encoded)?;
        self.len += encoded.len() as u64;
        self.writes_since_sync += 1;

        if self.writes_since_sync >= self.sync_policy.period() {
            self.sync()?;
        }
        Ok(())
    }

    /// Feed every record, oldest first, to `handler`.
    ///
    /// The write position is restored afterwards so appends can continue.
    /// The first malformed record aborts the replay with a corruption error;
    /// records before it have already been handed to `handler`, so callers
    /// must discard whatever state they were building.
    pub fn replay<F>(&mut self, mut handler: F) -> Result<usize>
    where
        F: FnMut(WALRecord) -> Result<()>,
    {
        let data = self.read_all()?;
        let reader = WALReader::from_bytes(data);

        let mut applied = 0;
        let mut iter = reader.iter();
        while let Some(record) = iter.next() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    error!(
                        path = %self.path.display(),
                        offset = iter.offset(),
                        error = %e,
                        "WAL replay aborted"
                    );
                    return Err(e);
                }
            };
            handler(record)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.len as usize);
        let read = self
            .file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut data));
        self.file.seek(SeekFrom::Start(self.len))?;
        read?;
        Ok(data)
    }

    /// Force fsync to disk regardless of the sync policy.
    pub fn force_sync(&mut self) -> Result<()> {
        self.sync()
    }

    fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        self.writes_since_sync = 0;
        self.sync_count += 1;
        Ok(())
    }

    /// Empty the log.
    ///
    /// Only safe once everything the log protected is durable elsewhere
    /// (i.e. the memtable has been written to a table and fsync'd).
    pub fn reset(&mut self) -> Result<()> {
        self.sync()?;
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_all()?;
        debug!(path = %self.path.display(), truncated_bytes = self.len, "WAL reset");
        self.len = 0;
        Ok(())
    }

    /// Sync and release the file.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    /// Appends since the last physical sync.
    pub fn writes_since_sync(&self) -> usize {
        self.writes_since_sync
    }

    /// Physical syncs performed since open.
    pub fn sync_count(&self) -> u64 {
        self.sync_count
    }

    /// Current length of the log in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
