//! In-memory data set storage.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    catalog_key, AllocationSpec, DatasetMetadata, DatasetStorage, StorageError, StorageResult,
};
use crate::binding::RecordFormat;

#[derive(Debug, Clone)]
struct Entry {
    record_format: RecordFormat,
    record_length: u32,
    volumes: Vec<String>,
    content: Vec<u8>,
}

/// Data sets held in a locked map, keyed by uppercase name.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl InMemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog an existing FB-80 data set with the given content.
    pub fn insert(&self, name: &str, content: impl Into<Vec<u8>>) {
        self.lock().insert(
            catalog_key(name),
            Entry {
                record_format: RecordFormat::FB,
                record_length: 80,
                volumes: Vec::new(),
                content: content.into(),
            },
        );
    }

    /// Whether a data set is cataloged.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(&catalog_key(name))
    }

    /// Names of all cataloged data sets, sorted.
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of cataloged data sets.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is cataloged.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DatasetStorage for InMemoryStorage {
    fn allocate(&self, spec: &AllocationSpec) -> StorageResult<String> {
        let key = catalog_key(&spec.name);
        let mut entries = self.lock();
        if entries.contains_key(&key) {
            return Err(StorageError::AlreadyExists(key));
        }
        entries.insert(
            key.clone(),
            Entry {
                record_format: spec.record_format,
                record_length: spec.record_length,
                volumes: spec.volumes.clone(),
                content: Vec::new(),
            },
        );
        Ok(key)
    }

    fn write(&self, name: &str, content: &[u8]) -> StorageResult<()> {
        let key = catalog_key(name);
        match self.lock().get_mut(&key) {
            Some(entry) => {
                entry.content = content.to_vec();
                Ok(())
            }
            None => Err(StorageError::NotFound(key)),
        }
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        let key = catalog_key(name);
        match self.lock().remove(&key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key)),
        }
    }

    fn read_content(&self, name: &str) -> StorageResult<Vec<u8>> {
        let key = catalog_key(name);
        self.lock()
            .get(&key)
            .map(|entry| entry.content.clone())
            .ok_or(StorageError::NotFound(key))
    }

    fn read_metadata(&self, name: &str) -> StorageResult<DatasetMetadata> {
        let key = catalog_key(name);
        let entries = self.lock();
        let entry = entries.get(&key).ok_or_else(|| StorageError::NotFound(key.clone()))?;
        Ok(DatasetMetadata {
            used_bytes: entry.content.len() as u64,
            record_format: entry.record_format,
            record_length: entry.record_length,
            volumes: entry.volumes.clone(),
            name: key,
        })
    }
}
