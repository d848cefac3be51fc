use std::collections::BTreeMap;

use crate::collection::{Collection, CollectionError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid collection under key {key}: {source}")]
    Invalid {
        key: String,
        source: CollectionError,
    },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Key-value service holding named collections, keyed by normalized URL.
///
/// The export engine performs no storage I/O itself; its callers read and
/// write collections through this boundary before and after an export.
pub trait CollectionStore {
    fn get(&self, key: &str) -> Result<Option<Collection>, StoreError>;
    fn set(&mut self, key: &str, collection: Collection) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    /// Home-list index of known collection keys, sorted.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CollectionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Collection>, StoreError> {
        match self.entries.get(key) {
            Some(collection) => {
                collection.validate().map_err(|source| StoreError::Invalid {
                    key: key.to_string(),
                    source,
                })?;
                Ok(Some(collection.clone()))
            }
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, collection: Collection) -> Result<(), StoreError> {
        collection.validate().map_err(|source| StoreError::Invalid {
            key: key.to_string(),
            source,
        })?;
        self.entries.insert(key.to_string(), collection);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
