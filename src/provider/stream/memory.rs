use std::collections::HashMap;
use std::sync::RwLock;

use super::StreamStore;
use crate::provider::ProviderError;

/// HashMap-backed stream store for tests and development.
#[derive(Default)]
pub struct MemoryStreamStore {
    streams: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(path: &[String], field: &str) -> String {
        let mut key = path.join("/");
        key.push('/');
        key.push_str(field);
        key
    }

    pub fn len(&self) -> usize {
        self.streams.read().map(|streams| streams.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StreamStore for MemoryStreamStore {
    fn open(&self, path: &[String], field: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| ProviderError::LockPoisoned("stream read"))?;
        Ok(streams.get(&Self::make_key(path, field)).cloned())
    }

    fn save(&self, path: &[String], field: &str, content: &[u8]) -> Result<bool, ProviderError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| ProviderError::LockPoisoned("stream write"))?;
        let key = Self::make_key(path, field);
        if streams.get(&key).map(|existing| existing.as_slice()) == Some(content) {
            return Ok(false);
        }
        streams.insert(key, content.to_vec());
        Ok(true)
    }

    fn delete(&self, path: &[String], field: &str) -> Result<bool, ProviderError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| ProviderError::LockPoisoned("stream write"))?;
        Ok(streams.remove(&Self::make_key(path, field)).is_some())
    }

    fn url(&self, path: &[String], field: &str) -> Option<String> {
        Some(format!("memory://{}", Self::make_key(path, field)))
    }
}
