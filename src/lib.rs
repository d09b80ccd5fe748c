//! # LSM Key-Value Store
//!
//! An embedded, single-node key-value store using the Log-Structured
//! Merge-Tree design.
//!
//! ## Core idea
//! Instead of updating data in place (B-Tree), buffer writes in memory,
//! flush them as sorted immutable files, and merge those files from time
//! to time. Every write is logged to a WAL first, so the in-memory buffer
//! can be rebuilt after a crash.
//!
//! ```no_run
//! use lsm_kv::{DB, Options};
//!
//! let db = DB::open("./data", Options::default())?;
//! db.put(b"key", b"value")?;
//! assert_eq!(db.read(b"key")?, Some(b"value".to_vec()));
//! db.close()?;
//! # Ok::<(), lsm_kv::Error>(())
//! ```

pub mod compaction;
pub mod db;
pub mod engine;
pub mod error;
pub mod facade;
pub mod iterator;
pub mod manifest;
pub mod memtable;
pub mod sstable;
pub mod types;
pub mod wal;

// Public re-exports for the top-level API
pub use db::{DB, Options, Stats};
pub use engine::StorageEngine;
pub use error::{Error, Result};
pub use facade::KeyValueFacade;
pub use types::{Entry, Key, Value};
pub use wal::SyncPolicy;
