//! Data set storage collaborator.
//!
//! The runner never touches a catalog directly. Everything it needs from
//! data set storage goes through [`DatasetStorage`]: allocate a new data
//! set, write inline content, delete temporaries, and read content and
//! metadata back after the program ran.
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryStorage`]: a locked map, used by tests and check runs
//! - [`DirectoryStorage`]: data sets as files under a base directory
//!   (`MY.DATA.SET` → `<base>/MY/DATA/SET`)

pub mod directory;
pub mod memory;

pub use directory::DirectoryStorage;
pub use memory::InMemoryStorage;

use miette::Diagnostic;
use thiserror::Error;

use crate::binding::{
    AllocationAttributes, DatasetType, EncryptionKey, RecordFormat, SpaceType,
};

/// Errors reported by a storage implementation.
#[derive(Debug, Error, Diagnostic)]
pub enum StorageError {
    /// No such data set.
    #[error("data set '{0}' not found")]
    #[diagnostic(code(mvsraw::storage::not_found))]
    NotFound(String),

    /// The data set already exists and cannot be allocated again.
    #[error("data set '{0}' already exists")]
    #[diagnostic(code(mvsraw::storage::already_exists))]
    AlreadyExists(String),

    /// A partitioned data set was read as a sequential one.
    #[error("data set '{0}' is partitioned and has no sequential content")]
    #[diagnostic(code(mvsraw::storage::not_sequential))]
    NotSequential(String),

    /// The storage refused the request.
    #[error("request for '{name}' rejected: {reason}")]
    #[diagnostic(code(mvsraw::storage::rejected))]
    Rejected { name: String, reason: String },

    /// Underlying I/O failure.
    #[error("I/O error on '{name}'")]
    #[diagnostic(code(mvsraw::storage::io))]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Whether the error means the data set does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Storage result type alias.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// What to allocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSpec {
    /// Data set name.
    pub name: String,
    /// Record format.
    pub record_format: RecordFormat,
    /// Logical record length.
    pub record_length: u32,
    /// Block size in bytes.
    pub block_size: Option<u64>,
    /// Organization.
    pub data_set_type: Option<DatasetType>,
    /// Space unit.
    pub space_type: Option<SpaceType>,
    /// Primary quantity.
    pub space_primary: Option<u32>,
    /// Secondary quantity.
    pub space_secondary: Option<u32>,
    /// Volume serials.
    pub volumes: Vec<String>,
    /// SMS storage class.
    pub storage_class: Option<String>,
    /// SMS management class.
    pub management_class: Option<String>,
    /// SMS data class.
    pub data_class: Option<String>,
    /// Key length (VSAM KSDS).
    pub key_length: Option<u32>,
    /// Data set key label for encryption.
    pub key_label: Option<String>,
    /// Key-encrypting keys, in order.
    pub encryption_keys: Vec<EncryptionKey>,
}

impl AllocationSpec {
    /// Allocation for `name` using the binding's attributes.
    pub fn from_attributes(name: impl Into<String>, attrs: &AllocationAttributes) -> Self {
        Self {
            name: name.into(),
            record_format: attrs.effective_record_format(),
            record_length: attrs.effective_record_length(),
            block_size: attrs.block_size,
            data_set_type: attrs.data_set_type,
            space_type: attrs.space_type,
            space_primary: attrs.space_primary,
            space_secondary: attrs.space_secondary,
            volumes: attrs.volumes.clone(),
            storage_class: attrs.sms_storage_class.clone(),
            management_class: attrs.sms_management_class.clone(),
            data_class: attrs.sms_data_class.clone(),
            key_length: attrs.key_length,
            key_label: attrs.key_label.clone(),
            encryption_keys: [&attrs.encryption_key_1, &attrs.encryption_key_2]
                .into_iter()
                .flatten()
                .cloned()
                .collect(),
        }
    }

    /// Sequential FB data set with the given record length.
    pub fn sequential(name: impl Into<String>, record_length: u32) -> Self {
        Self {
            record_format: RecordFormat::FB,
            record_length,
            ..Self::from_attributes(name, &AllocationAttributes::default())
        }
    }
}

/// Metadata reported for an existing data set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMetadata {
    /// Data set name.
    pub name: String,
    /// Bytes in use.
    pub used_bytes: u64,
    /// Record format.
    pub record_format: RecordFormat,
    /// Logical record length.
    pub record_length: u32,
    /// Volume serials.
    pub volumes: Vec<String>,
}

/// Data set storage used by the runner.
///
/// Methods take `&self`; implementations that keep state use interior
/// locking so one storage can back concurrent invocations.
pub trait DatasetStorage {
    /// Allocate a data set and return its name.
    fn allocate(&self, spec: &AllocationSpec) -> StorageResult<String>;

    /// Replace the content of a data set.
    fn write(&self, name: &str, content: &[u8]) -> StorageResult<()>;

    /// Delete a data set.
    fn delete(&self, name: &str) -> StorageResult<()>;

    /// Read the content of a data set.
    fn read_content(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Read the metadata of a data set.
    fn read_metadata(&self, name: &str) -> StorageResult<DatasetMetadata>;
}

impl<S: DatasetStorage + ?Sized> DatasetStorage for &S {
    fn allocate(&self, spec: &AllocationSpec) -> StorageResult<String> {
        (**self).allocate(spec)
    }

    fn write(&self, name: &str, content: &[u8]) -> StorageResult<()> {
        (**self).write(name, content)
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        (**self).delete(name)
    }

    fn read_content(&self, name: &str) -> StorageResult<Vec<u8>> {
        (**self).read_content(name)
    }

    fn read_metadata(&self, name: &str) -> StorageResult<DatasetMetadata> {
        (**self).read_metadata(name)
    }
}

/// Normalized catalog key: uppercase, surrounding blanks removed.
pub(crate) fn catalog_key(name: &str) -> String {
    name.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::KeyEncoding;

    #[test]
    fn allocation_spec_defaults() {
        let spec = AllocationSpec::from_attributes("A.B", &AllocationAttributes::default());
        assert_eq!(spec.record_format, RecordFormat::FB);
        assert_eq!(spec.record_length, 80);
        assert!(spec.volumes.is_empty());

        let seq = AllocationSpec::sequential("A.C", 120);
        assert_eq!(seq.record_length, 120);
    }

    #[test]
    fn allocation_spec_copies_attributes() {
        let attrs = AllocationAttributes {
            record_format: Some(RecordFormat::VB),
            volumes: vec!["VOL001".to_string()],
            space_primary: Some(5),
            key_label: Some("DSKEY01".to_string()),
            encryption_key_2: Some(EncryptionKey {
                label: "KEK.LABEL".to_string(),
                encoding: KeyEncoding::Hash,
            }),
            ..Default::default()
        };
        let spec = AllocationSpec::from_attributes("A.B", &attrs);
        assert_eq!(spec.record_format, RecordFormat::VB);
        assert_eq!(spec.record_length, 137);
        assert_eq!(spec.volumes, ["VOL001"]);
        assert_eq!(spec.space_primary, Some(5));
        assert_eq!(spec.key_label.as_deref(), Some("DSKEY01"));
        assert_eq!(spec.encryption_keys.len(), 1);
        assert_eq!(spec.encryption_keys[0].label, "KEK.LABEL");
        assert_eq!(spec.encryption_keys[0].encoding, KeyEncoding::Hash);
    }

    #[test]
    fn not_found_detection() {
        assert!(StorageError::NotFound("A".into()).is_not_found());
        assert!(!StorageError::AlreadyExists("A".into()).is_not_found());
        assert!(!StorageError::NotSequential("A".into()).is_not_found());
    }
}
