//! Directory-backed data set storage.
//!
//! Each qualifier becomes a path component below the base directory:
//! `MY.DATA.SET` → `<base>/MY/DATA/SET`, and a member reference
//! `MY.PDS(MEM)` → `<base>/MY/PDS/MEM`. Partitioned data sets are
//! directories.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{
    catalog_key, AllocationSpec, DatasetMetadata, DatasetStorage, StorageError, StorageResult,
};
use crate::binding::dataset::validate_dsname;
use crate::binding::RecordFormat;

#[derive(Debug, Clone)]
struct Dcb {
    record_format: RecordFormat,
    record_length: u32,
    volumes: Vec<String>,
    partitioned: bool,
}

impl Default for Dcb {
    fn default() -> Self {
        Self {
            record_format: RecordFormat::FB,
            record_length: 80,
            volumes: Vec::new(),
            partitioned: false,
        }
    }
}

/// Data sets stored as files under a base directory.
///
/// Files found on disk but not allocated through this storage are
/// reported as FB-80. A directory is a data set only when it was allocated
/// here as partitioned; otherwise it is just a qualifier prefix.
#[derive(Debug)]
pub struct DirectoryStorage {
    base_dir: PathBuf,
    dcbs: Mutex<HashMap<String, Dcb>>,
}

impl DirectoryStorage {
    /// Storage rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            dcbs: Mutex::new(HashMap::new()),
        }
    }

    /// Base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a data set name to its path.
    pub fn resolve(&self, name: &str) -> StorageResult<PathBuf> {
        let key = catalog_key(name);
        validate_dsname(&key).map_err(|reason| StorageError::Rejected {
            name: key.clone(),
            reason,
        })?;

        let (base, member) = match key.find('(') {
            Some(pos) => (&key[..pos], Some(key[pos + 1..].trim_end_matches(')'))),
            None => (key.as_str(), None),
        };

        let mut path = self.base_dir.clone();
        for qualifier in base.split('.') {
            path.push(qualifier);
        }
        if let Some(member) = member {
            path.push(member);
        }
        Ok(path)
    }

    fn dcbs(&self) -> MutexGuard<'_, HashMap<String, Dcb>> {
        self.dcbs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up the data set at `path`, returning whether it is partitioned.
    fn locate(&self, key: &str, path: &Path) -> StorageResult<bool> {
        let meta = fs::metadata(path).map_err(|e| io_error(key, e))?;
        if !meta.is_dir() {
            return Ok(false);
        }
        if self.dcbs().get(key).is_some_and(|dcb| dcb.partitioned) {
            Ok(true)
        } else {
            Err(StorageError::NotFound(key.to_string()))
        }
    }
}

fn io_error(name: &str, source: std::io::Error) -> StorageError {
    if source.kind() == ErrorKind::NotFound {
        StorageError::NotFound(name.to_string())
    } else {
        StorageError::Io {
            name: name.to_string(),
            source,
        }
    }
}

fn directory_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        total += if meta.is_dir() {
            directory_size(&entry.path())?
        } else {
            meta.len()
        };
    }
    Ok(total)
}

impl DatasetStorage for DirectoryStorage {
    fn allocate(&self, spec: &AllocationSpec) -> StorageResult<String> {
        let key = catalog_key(&spec.name);
        let path = self.resolve(&key)?;
        if path.exists() {
            return Err(StorageError::AlreadyExists(key));
        }

        let partitioned = spec.data_set_type.is_some_and(|t| t.is_partitioned());
        if partitioned {
            fs::create_dir_all(&path).map_err(|e| io_error(&key, e))?;
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| io_error(&key, e))?;
            }
            fs::write(&path, b"").map_err(|e| io_error(&key, e))?;
        }
        debug!(dsname = %key, path = %path.display(), partitioned, "allocated data set");

        self.dcbs().insert(
            key.clone(),
            Dcb {
                record_format: spec.record_format,
                record_length: spec.record_length,
                volumes: spec.volumes.clone(),
                partitioned,
            },
        );
        Ok(key)
    }

    fn write(&self, name: &str, content: &[u8]) -> StorageResult<()> {
        let key = catalog_key(name);
        let path = self.resolve(&key)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(key));
        }
        fs::write(&path, content).map_err(|e| io_error(&key, e))
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        let key = catalog_key(name);
        let path = self.resolve(&key)?;
        let result = if self.locate(&key, &path)? {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| io_error(&key, e))?;
        self.dcbs().remove(&key);
        debug!(dsname = %key, "deleted data set");
        Ok(())
    }

    fn read_content(&self, name: &str) -> StorageResult<Vec<u8>> {
        let key = catalog_key(name);
        let path = self.resolve(&key)?;
        if self.locate(&key, &path)? {
            return Err(StorageError::NotSequential(key));
        }
        fs::read(&path).map_err(|e| io_error(&key, e))
    }

    fn read_metadata(&self, name: &str) -> StorageResult<DatasetMetadata> {
        let key = catalog_key(name);
        let path = self.resolve(&key)?;
        let used_bytes = if self.locate(&key, &path)? {
            directory_size(&path).map_err(|e| io_error(&key, e))?
        } else {
            fs::metadata(&path).map_err(|e| io_error(&key, e))?.len()
        };
        let dcb = self.dcbs().get(&key).cloned().unwrap_or_default();
        Ok(DatasetMetadata {
            name: key,
            used_bytes,
            record_format: dcb.record_format,
            record_length: dcb.record_length,
            volumes: dcb.volumes,
        })
    }
}
