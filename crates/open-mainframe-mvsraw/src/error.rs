//! MVSRAW error types.

use miette::Diagnostic;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned while running a program under DD bindings.
///
/// A non-zero program return code is not an error: it is carried by the
/// [`InvocationReport`](crate::report::InvocationReport).
#[derive(Debug, Error, Diagnostic)]
pub enum MvsRawError {
    /// The request itself is unusable (e.g. no program name).
    #[error("{reason}")]
    #[diagnostic(code(mvsraw::invalid_request))]
    InvalidRequest { reason: String },

    /// A DD binding is malformed, duplicated or unresolvable.
    #[error("invalid DD '{name}': {reason}")]
    #[diagnostic(
        code(mvsraw::invalid_binding),
        help("DD names must be unique within one request")
    )]
    InvalidBinding { name: String, reason: String },

    /// A data set or file required by a binding could not be created.
    #[error("allocation of '{dsname}' for DD '{binding}' failed")]
    #[diagnostic(code(mvsraw::allocation_failed))]
    Allocation {
        binding: String,
        dsname: String,
        #[source]
        source: StorageError,
    },

    /// The launcher could not be spawned or talked to.
    #[error("failed to execute launcher '{launcher}'")]
    #[diagnostic(
        code(mvsraw::execution_failed),
        help("check that the launcher is installed and on PATH")
    )]
    Execution {
        launcher: String,
        #[source]
        source: std::io::Error,
    },

    /// An artifact expected after the run is missing.
    #[error("no data set or file '{target}' found for DD '{binding}': {reason}")]
    #[diagnostic(code(mvsraw::resource_not_found))]
    ResourceNotFound {
        binding: String,
        target: String,
        reason: String,
    },

    /// Storage failed while reading back a binding's data set.
    #[error("cannot read '{target}' for DD '{binding}'")]
    #[diagnostic(code(mvsraw::storage))]
    Storage {
        binding: String,
        target: String,
        #[source]
        source: StorageError,
    },

    /// A configuration or request document could not be loaded.
    #[error("cannot load '{path}': {reason}")]
    #[diagnostic(code(mvsraw::config))]
    Config { path: String, reason: String },
}

impl MvsRawError {
    pub(crate) fn invalid_binding(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// MVSRAW result type alias.
pub type Result<T> = std::result::Result<T, MvsRawError>;
