use std::collections::HashMap;
use std::sync::Mutex;

use packread_types::error::{PackreadError, Result};

use crate::StorageBackend;

/// In-memory storage backend for testing. Thread-safe via Mutex.
pub struct MemoryBackend {
    data: Mutex<HashMap<String, Vec<u8>>>,
    fail_next: Mutex<Option<std::io::ErrorKind>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(None),
        }
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
    }

    /// Make the next `get_range` call fail with an I/O error of `kind`.
    pub fn fail_next_with(&self, kind: std::io::ErrorKind) {
        *self.fail_next.lock().unwrap() = Some(kind);
    }
}

impl StorageBackend for MemoryBackend {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let map = self.data.lock().unwrap();
        Ok(map.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    fn get_range(&self, key: &str, offset: u64, length: u64) -> Result<Option<Vec<u8>>> {
        if let Some(kind) = self.fail_next.lock().unwrap().take() {
            return Err(PackreadError::Io(std::io::Error::new(kind, "injected failure")));
        }
        let map = self.data.lock().unwrap();
        Ok(map.get(key).map(|data| {
            let start = (offset as usize).min(data.len());
            let end = start.saturating_add(length as usize).min(data.len());
            data[start..end].to_vec()
        }))
    }
}
