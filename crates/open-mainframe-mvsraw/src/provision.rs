//! Resource provisioning: new data sets, inline input data sets, OCREAT files.
//!
//! Provisioning walks the bindings in request order and resolves each one to
//! the concrete target the launcher is given. Everything it creates that is
//! due for deletion is queued in the caller's [`TemporaryResourceSet`] as soon
//! as it exists, so a failure later in the walk still cleans it up.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use tracing::{debug, info};

use crate::binding::{Binding, DatasetBinding, InlineBinding, PathStatus, UssBinding};
use crate::cleanup::{Fate, ResourceKind, TemporaryResource, TemporaryResourceSet};
use crate::config::InlineInputMode;
use crate::error::{MvsRawError, Result};
use crate::request::InvocationRequest;
use crate::storage::{AllocationSpec, DatasetStorage, StorageError};

/// Minimum record length of an inline input data set.
const INLINE_MIN_LRECL: u32 = 80;

/// Largest sequence number that still fits an 8-character qualifier.
const SEQ_LIMIT: u32 = 10_000_000;

/// Generator of temporary data set names.
///
/// Names look like `<HLQ>.MVSRAW.P<pid>.S<stamp>.N<seq>`: pid and creation
/// time in 7 hex digits, then a sequence number private to this generator.
#[derive(Debug)]
pub struct TempNamer {
    hlq: String,
    pid: u32,
    stamp: u32,
    seq: AtomicU32,
}

impl TempNamer {
    /// Generator for names under `hlq`.
    pub fn new(hlq: impl Into<String>) -> Self {
        let stamp = (Utc::now().timestamp_millis() as u64 & 0x0FFF_FFFF) as u32;
        Self {
            hlq: hlq.into().to_uppercase(),
            pid: std::process::id() & 0x0FFF_FFFF,
            stamp,
            seq: AtomicU32::new(1),
        }
    }

    /// The next unused name.
    pub fn next_name(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) % SEQ_LIMIT;
        format!(
            "{}.MVSRAW.P{:07X}.S{:07X}.N{:07}",
            self.hlq, self.pid, self.stamp, seq
        )
    }
}

/// The concrete target a binding was resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Data set names of a `dd_dataset`, in concatenation order.
    Datasets(Vec<String>),
    /// Temporary data set holding inline input.
    InlineDataset(String),
    /// Inline input piped to standard input.
    Stdin,
    /// The binding is passed through as written.
    AsRequested,
}

/// Resolutions, one per binding, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBindings {
    resolutions: Vec<Resolution>,
}

impl ResolvedBindings {
    /// Resolution of the binding at `index`.
    pub fn get(&self, index: usize) -> Option<&Resolution> {
        self.resolutions.get(index)
    }

    /// Number of resolved bindings.
    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    /// Whether no binding was resolved.
    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }

    /// All resolutions.
    pub fn iter(&self) -> impl Iterator<Item = &Resolution> {
        self.resolutions.iter()
    }
}

impl FromIterator<Resolution> for ResolvedBindings {
    fn from_iter<I: IntoIterator<Item = Resolution>>(iter: I) -> Self {
        Self {
            resolutions: iter.into_iter().collect(),
        }
    }
}

/// Allocates what the bindings of one request need.
pub struct Provisioner<'a, S: DatasetStorage> {
    storage: &'a S,
    namer: &'a TempNamer,
    inline_input: InlineInputMode,
}

impl<'a, S: DatasetStorage> Provisioner<'a, S> {
    /// Provisioner allocating through `storage`.
    pub fn new(storage: &'a S, namer: &'a TempNamer, inline_input: InlineInputMode) -> Self {
        Self {
            storage,
            namer,
            inline_input,
        }
    }

    /// Resolve every binding, creating what is missing.
    ///
    /// Resources are queued in `queue` as soon as they exist. On error the
    /// resources created for earlier bindings remain queued.
    pub fn provision(
        &self,
        request: &InvocationRequest,
        queue: &mut TemporaryResourceSet,
    ) -> Result<ResolvedBindings> {
        let mut resolved = Vec::with_capacity(request.bindings.len());
        for binding in &request.bindings {
            let resolution = match binding {
                Binding::Dataset(dd) if dd.is_new() => self.allocate_new(dd, queue)?,
                Binding::Dataset(dd) => Resolution::Datasets(dd.targets.clone()),
                Binding::InlineInput(dd) => self.stage_inline(dd, queue)?,
                Binding::UssFile(dd) => {
                    self.create_uss(dd, queue)?;
                    Resolution::AsRequested
                }
                Binding::Sysout(_) | Binding::Dummy(_) => Resolution::AsRequested,
            };
            resolved.push(resolution);
        }
        Ok(ResolvedBindings {
            resolutions: resolved,
        })
    }

    /// Resolve every binding the way [`provision`](Self::provision) would,
    /// without creating anything.
    pub fn plan(&self, request: &InvocationRequest) -> ResolvedBindings {
        request
            .bindings
            .iter()
            .map(|binding| match binding {
                Binding::Dataset(dd) => Resolution::Datasets(self.target_names(dd)),
                Binding::InlineInput(_) => match self.inline_input {
                    InlineInputMode::Dataset => Resolution::InlineDataset(self.namer.next_name()),
                    InlineInputMode::Stdin => Resolution::Stdin,
                },
                Binding::UssFile(_) | Binding::Sysout(_) | Binding::Dummy(_) => {
                    Resolution::AsRequested
                }
            })
            .collect()
    }

    fn target_names(&self, dd: &DatasetBinding) -> Vec<String> {
        if dd.targets.is_empty() && dd.is_new() {
            vec![self.namer.next_name()]
        } else {
            dd.targets.clone()
        }
    }

    fn allocate_new(
        &self,
        dd: &DatasetBinding,
        queue: &mut TemporaryResourceSet,
    ) -> Result<Resolution> {
        let generated = dd.targets.is_empty();
        let mut names = Vec::new();
        for dsn in self.target_names(dd) {
            let spec = AllocationSpec::from_attributes(&dsn, &dd.allocation);
            let name = self.storage.allocate(&spec).map_err(|source| {
                MvsRawError::Allocation {
                    binding: dd.name.clone(),
                    dsname: dsn.clone(),
                    source,
                }
            })?;
            info!(
                binding = %dd.name,
                dsname = %name,
                recfm = %spec.record_format,
                lrecl = spec.record_length,
                "allocated new data set"
            );

            if generated && dd.normal.is_none() && dd.abnormal.is_none() {
                queue.push(TemporaryResource::scratch(
                    ResourceKind::Dataset(name.clone()),
                    &dd.name,
                ));
            } else if dd.deletes() {
                queue.push(TemporaryResource {
                    kind: ResourceKind::Dataset(name.clone()),
                    binding: dd.name.clone(),
                    normal: dd.normal.map(Fate::from),
                    abnormal: dd.abnormal.map(Fate::from),
                });
            }
            names.push(name);
        }
        Ok(Resolution::Datasets(names))
    }

    fn stage_inline(
        &self,
        dd: &InlineBinding,
        queue: &mut TemporaryResourceSet,
    ) -> Result<Resolution> {
        if self.inline_input == InlineInputMode::Stdin {
            return Ok(Resolution::Stdin);
        }

        let dsn = self.namer.next_name();
        let lrecl = (dd.content.longest_line() as u32).max(INLINE_MIN_LRECL);
        let allocation_error = |source: StorageError| MvsRawError::Allocation {
            binding: dd.name.clone(),
            dsname: dsn.clone(),
            source,
        };

        let name = self
            .storage
            .allocate(&AllocationSpec::sequential(&dsn, lrecl))
            .map_err(allocation_error)?;
        queue.push(TemporaryResource::scratch(
            ResourceKind::Dataset(name.clone()),
            &dd.name,
        ));
        self.storage
            .write(&name, dd.content.to_text().as_bytes())
            .map_err(allocation_error)?;
        debug!(binding = %dd.name, dsname = %name, lrecl, "staged inline input");
        Ok(Resolution::InlineDataset(name))
    }

    fn create_uss(&self, dd: &UssBinding, queue: &mut TemporaryResourceSet) -> Result<()> {
        if !dd.creates() {
            return Ok(());
        }
        let exists = dd.path.exists();
        if exists && dd.status.contains(&PathStatus::Oexcl) {
            return Err(uss_error(
                dd,
                StorageError::AlreadyExists(dd.path.display().to_string()),
            ));
        }
        if exists {
            return Ok(());
        }

        create_file(&dd.path, dd.mode_bits()).map_err(|source| {
            uss_error(
                dd,
                StorageError::Io {
                    name: dd.path.display().to_string(),
                    source,
                },
            )
        })?;
        info!(
            binding = %dd.name,
            path = %dd.path.display(),
            mode = format_args!("{:o}", dd.mode_bits()),
            "created file"
        );

        if dd.deletes() {
            queue.push(TemporaryResource {
                kind: ResourceKind::UssFile(dd.path.clone()),
                binding: dd.name.clone(),
                normal: dd.normal.map(Fate::from),
                abnormal: dd.abnormal.map(Fate::from),
            });
        }
        Ok(())
    }
}

fn uss_error(dd: &UssBinding, source: StorageError) -> MvsRawError {
    MvsRawError::Allocation {
        binding: dd.name.clone(),
        dsname: dd.path.display().to_string(),
        source,
    }
}

fn create_file(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    match options.open(path) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
        Err(e) => return Err(e),
    }
    // The process umask may have cleared bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}
