use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use linkbinder_core::{Collection, CollectionStore, StoreError};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// The on-disk shape of the collections file: a single JSON document mapping
/// normalized page URLs to collections.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    collections: BTreeMap<String, Collection>,
}

/// [`CollectionStore`] backed by one JSON file.
///
/// Every read loads the file fresh and every write replaces it atomically
/// (temp file then rename), so concurrent linkbinder invocations never see a
/// half-written store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<StoreFile, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreFile::default());
            }
            Err(err) => {
                return Err(StoreError::Backend(format!(
                    "failed to read {:?}: {err}",
                    self.path
                )));
            }
        };
        serde_json::from_str(&content).map_err(|err| {
            StoreError::Backend(format!("failed to parse {:?}: {err}", self.path))
        })
    }

    fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(file)
            .map_err(|err| StoreError::Backend(format!("failed to serialize store: {err}")))?;
        let dir = parent_dir(&self.path);
        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|err| StoreError::Backend(format!("failed to create temp file: {err}")))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.flush())
            .map_err(|err| StoreError::Backend(format!("failed to write store: {err}")))?;
        tmp.persist(&self.path).map_err(|err| {
            StoreError::Backend(format!("failed to replace {:?}: {}", self.path, err.error))
        })?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl CollectionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Collection>, StoreError> {
        let file = self.load()?;
        match file.collections.get(key) {
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
        let mut file = self.load()?;
        file.collections.insert(key.to_string(), collection);
        self.save(&file)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut file = self.load()?;
        if file.collections.remove(key).is_some() {
            self.save(&file)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load()?.collections.keys().cloned().collect())
    }
}
