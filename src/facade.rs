use std::sync::Arc;

use crate::engine::StorageEngine;
use crate::error::{Error, Result};

/// Text keys and values over any `StorageEngine`, encoded as UTF-8.
///
/// Adds no storage logic. Stored bytes that are not valid UTF-8 (written
/// through the byte API) come back as `Error::InvalidArgument`.
#[derive(Clone)]
pub struct KeyValueFacade {
    engine: Arc<dyn StorageEngine>,
}

impl KeyValueFacade {
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        KeyValueFacade { engine }
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.engine.put(key.as_bytes(), value.as_bytes())
    }

    pub fn read(&self, key: &str) -> Result<Option<String>> {
        self.engine.read(key.as_bytes())?.map(into_string).transpose()
    }

    pub fn read_range(&self, start: &str, end: &str) -> Result<Vec<(String, String)>> {
        self.engine
            .read_range(start.as_bytes(), end.as_bytes())?
            .into_iter()
            .map(|(k, v)| Ok((into_string(k)?, into_string(v)?)))
            .collect()
    }

    pub fn batch_put(&self, entries: &[(&str, &str)]) -> Result<()> {
        let pairs: Vec<(Option<&[u8]>, Option<&[u8]>)> = entries
            .iter()
            .map(|(k, v)| (Some(k.as_bytes()), Some(v.as_bytes())))
            .collect();
        self.engine.batch_put(&pairs)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.engine.delete(key.as_bytes())
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidArgument(format!("stored bytes are not valid UTF-8: {e}")))
}
