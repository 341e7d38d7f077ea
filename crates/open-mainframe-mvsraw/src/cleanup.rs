//! Cleanup of temporary resources.
//!
//! Every data set or file the provisioner creates for one invocation is
//! queued in a [`TemporaryResourceSet`]. The [`CleanupCoordinator`] owns
//! that set and drains it exactly once: explicitly through
//! [`CleanupCoordinator::finish`], or from `Drop` when the invocation
//! unwinds before reaching it.

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::binding::{DispositionAction, PathDisposition};
use crate::storage::DatasetStorage;

/// What happens to a resource at the end of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    /// Remove it.
    Delete,
    /// Leave it in place.
    Keep,
}

impl From<DispositionAction> for Fate {
    fn from(action: DispositionAction) -> Self {
        match action {
            DispositionAction::Delete => Self::Delete,
            DispositionAction::Keep | DispositionAction::Catalog | DispositionAction::Uncatalog => {
                Self::Keep
            }
        }
    }
}

impl From<PathDisposition> for Fate {
    fn from(disp: PathDisposition) -> Self {
        match disp {
            PathDisposition::Delete => Self::Delete,
            PathDisposition::Keep => Self::Keep,
        }
    }
}

/// How the invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The program ran and returned an exit code.
    Normal,
    /// Anything else: errors, unwinding, no exit code.
    Abnormal,
}

/// Which queued resources are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Follow each resource's normal/abnormal disposition.
    #[default]
    Disposition,
    /// Delete every queued resource.
    Always,
}

/// A queued resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// Cataloged data set.
    Dataset(String),
    /// UNIX file.
    UssFile(PathBuf),
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset(name) => f.write_str(name),
            Self::UssFile(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A resource created for one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryResource {
    /// The resource.
    pub kind: ResourceKind,
    /// Owning DD name.
    pub binding: String,
    /// Fate after normal termination.
    pub normal: Option<Fate>,
    /// Fate after abnormal termination.
    pub abnormal: Option<Fate>,
}

impl TemporaryResource {
    /// A scratch resource deleted whatever happens.
    pub fn scratch(kind: ResourceKind, binding: impl Into<String>) -> Self {
        Self {
            kind,
            binding: binding.into(),
            normal: Some(Fate::Delete),
            abnormal: Some(Fate::Delete),
        }
    }

    fn should_delete(&self, policy: CleanupPolicy, termination: Termination) -> bool {
        match policy {
            CleanupPolicy::Always => true,
            CleanupPolicy::Disposition => {
                let fate = match termination {
                    Termination::Normal => self.normal,
                    Termination::Abnormal => self.abnormal.or(self.normal),
                };
                fate == Some(Fate::Delete)
            }
        }
    }
}

/// Resources created during one invocation, in creation order.
#[derive(Debug, Default)]
pub struct TemporaryResourceSet {
    resources: Vec<TemporaryResource>,
}

impl TemporaryResourceSet {
    /// Queue a resource.
    pub fn push(&mut self, resource: TemporaryResource) {
        debug!(binding = %resource.binding, resource = %resource.kind, "queued for cleanup");
        self.resources.push(resource);
    }

    /// Number of queued resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Queued resources.
    pub fn iter(&self) -> impl Iterator<Item = &TemporaryResource> {
        self.resources.iter()
    }

    fn take(&mut self) -> Vec<TemporaryResource> {
        std::mem::take(&mut self.resources)
    }
}

/// A resource that could not be deleted. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionWarning {
    /// Data set name or path.
    pub resource: String,
    /// Why deletion failed.
    pub reason: String,
}

/// Scoped owner of one invocation's [`TemporaryResourceSet`].
pub struct CleanupCoordinator<'a, S: DatasetStorage> {
    storage: &'a S,
    policy: CleanupPolicy,
    resources: TemporaryResourceSet,
}

impl<'a, S: DatasetStorage> CleanupCoordinator<'a, S> {
    /// Coordinator deleting through `storage`.
    pub fn new(storage: &'a S, policy: CleanupPolicy) -> Self {
        Self {
            storage,
            policy,
            resources: TemporaryResourceSet::default(),
        }
    }

    /// The queue the provisioner records into.
    pub fn resources_mut(&mut self) -> &mut TemporaryResourceSet {
        &mut self.resources
    }

    /// The queued resources.
    pub fn resources(&self) -> &TemporaryResourceSet {
        &self.resources
    }

    /// Drain the queue and return the deletions that failed.
    pub fn finish(mut self, termination: Termination) -> Vec<DeletionWarning> {
        self.drain(termination)
    }

    fn drain(&mut self, termination: Termination) -> Vec<DeletionWarning> {
        let mut warnings = Vec::new();
        for resource in self.resources.take() {
            if !resource.should_delete(self.policy, termination) {
                info!(
                    binding = %resource.binding,
                    resource = %resource.kind,
                    "retained by disposition"
                );
                continue;
            }
            if let Err(reason) = self.delete(&resource.kind) {
                warn!(
                    binding = %resource.binding,
                    resource = %resource.kind,
                    %reason,
                    "cleanup failed"
                );
                warnings.push(DeletionWarning {
                    resource: resource.kind.to_string(),
                    reason,
                });
            }
        }
        warnings
    }

    fn delete(&self, kind: &ResourceKind) -> std::result::Result<(), String> {
        let result = match kind {
            ResourceKind::Dataset(name) => match self.storage.delete(name) {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map_err(|e| e.to_string()),
            },
            ResourceKind::UssFile(path) => match std::fs::remove_file(path) {
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                other => other.map_err(|e| e.to_string()),
            },
        };
        if result.is_ok() {
            debug!(resource = %kind, "deleted");
        }
        result
    }
}

impl<S: DatasetStorage> Drop for CleanupCoordinator<'_, S> {
    fn drop(&mut self) {
        if self.resources.is_empty() {
            return;
        }
        warn!(
            count = self.resources.len(),
            "invocation ended without cleanup, deleting queued resources"
        );
        let warnings = self.drain(Termination::Abnormal);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "resources left behind after unwinding");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AllocationSpec, InMemoryStorage};

    fn queued(
        storage: &InMemoryStorage,
        name: &str,
        normal: Fate,
        abnormal: Option<Fate>,
    ) -> TemporaryResource {
        storage.allocate(&AllocationSpec::sequential(name, 80)).unwrap();
        TemporaryResource {
            kind: ResourceKind::Dataset(name.to_string()),
            binding: "SYSUT1".to_string(),
            normal: Some(normal),
            abnormal,
        }
    }

    #[test]
    fn finish_deletes_by_disposition() {
        let storage = InMemoryStorage::new();
        let mut cleanup = CleanupCoordinator::new(&storage, CleanupPolicy::Disposition);
        cleanup.resources_mut().push(queued(&storage, "A.DEL", Fate::Delete, None));
        cleanup.resources_mut().push(queued(&storage, "A.KEEP", Fate::Keep, Some(Fate::Delete)));

        let warnings = cleanup.finish(Termination::Normal);
        assert!(warnings.is_empty());
        assert_eq!(storage.names(), ["A.KEEP"]);
    }

    #[test]
    fn abnormal_falls_back_to_normal() {
        let storage = InMemoryStorage::new();
        let mut cleanup = CleanupCoordinator::new(&storage, CleanupPolicy::Disposition);
        cleanup.resources_mut().push(queued(&storage, "A.FALLBACK", Fate::Delete, None));
        cleanup.resources_mut().push(queued(&storage, "A.ABEND", Fate::Keep, Some(Fate::Delete)));

        cleanup.finish(Termination::Abnormal);
        assert!(storage.is_empty());
    }

    #[test]
    fn always_policy_ignores_dispositions() {
        let storage = InMemoryStorage::new();
        let mut cleanup = CleanupCoordinator::new(&storage, CleanupPolicy::Always);
        cleanup.resources_mut().push(queued(&storage, "A.KEEP", Fate::Keep, Some(Fate::Keep)));
        cleanup.finish(Termination::Normal);
        assert!(storage.is_empty());
    }

    #[test]
    fn already_deleted_is_success() {
        let storage = InMemoryStorage::new();
        let mut cleanup = CleanupCoordinator::new(&storage, CleanupPolicy::Disposition);
        cleanup.resources_mut().push(TemporaryResource::scratch(
            ResourceKind::Dataset("GONE.ALREADY".to_string()),
            "SYSIN",
        ));
        cleanup.resources_mut().push(TemporaryResource::scratch(
            ResourceKind::UssFile(PathBuf::from("/nonexistent/mvsraw/file")),
            "SYSUT2",
        ));
        assert!(cleanup.finish(Termination::Normal).is_empty());
    }

    #[test]
    fn drop_drains_unfinished_queue() {
        let storage = InMemoryStorage::new();
        {
            let mut cleanup = CleanupCoordinator::new(&storage, CleanupPolicy::Disposition);
            cleanup.resources_mut().push(queued(&storage, "A.TEMP", Fate::Delete, None));
        }
        assert!(storage.is_empty());
    }

    #[test]
    fn uss_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, b"data").unwrap();

        let storage = InMemoryStorage::new();
        let mut cleanup = CleanupCoordinator::new(&storage, CleanupPolicy::Disposition);
        cleanup
            .resources_mut()
            .push(TemporaryResource::scratch(ResourceKind::UssFile(path.clone()), "SYSUT2"));
        assert!(cleanup.finish(Termination::Normal).is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn failed_deletion_becomes_warning() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InMemoryStorage::new();
        let mut cleanup = CleanupCoordinator::new(&storage, CleanupPolicy::Disposition);
        // A directory cannot be removed with remove_file.
        cleanup.resources_mut().push(TemporaryResource::scratch(
            ResourceKind::UssFile(dir.path().to_path_buf()),
            "SYSUT2",
        ));
        let warnings = cleanup.finish(Termination::Normal);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].resource, dir.path().display().to_string());
    }
}
