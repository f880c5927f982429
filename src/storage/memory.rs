//! InMemoryStorage - HashMap-backed storage for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::DurableStorage;
use crate::error::{CacheError, Result};

/// In-memory storage backed by a HashMap. Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
    writes: Arc<RwLock<Vec<String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in the order they were written, one entry per write
    pub fn write_log(&self) -> Vec<String> {
        self.writes.read().map(|w| w.clone()).unwrap_or_default()
    }
}

fn poisoned() -> CacheError {
    CacheError::Storage("in-memory storage lock poisoned".into())
}

impl DurableStorage for InMemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        self.writes
            .write()
            .map_err(|_| poisoned())?
            .push(key.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
