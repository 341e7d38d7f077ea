//! # MVS Raw Program Runner
//!
//! Runs one z/OS program under a set of DD bindings through the `mvscmd` /
//! `mvscmdauth` launcher, and reports the return code together with what each
//! DD holds afterwards.
//!
//! ## Components
//!
//! - **Binding**: the five DD kinds (`dd_dataset`, `dd_input`, `dd_sysout`,
//!   `dd_uss`, `dd_dummy`) as one closed enum
//! - **Request**: program, arguments and bindings; JSON request documents
//! - **Provision**: new data sets, inline input data sets, OCREAT files
//! - **Builder**: the launcher argument vector
//! - **Executor**: the `Launcher` trait and a process-spawning launcher
//! - **Extract**: per-DD content, record and byte counts
//! - **Cleanup**: scoped deletion of temporary resources
//! - **Runner**: the invocation state machine tying it together
//!
//! ## Example
//!
//! ```no_run
//! use open_mainframe_mvsraw::{
//!     DirectoryStorage, InlineBinding, InvocationRequest, ProgramRunner, ReturnContent,
//!     SysoutBinding, SystemLauncher,
//! };
//!
//! let runner = ProgramRunner::new(DirectoryStorage::new("datasets"), SystemLauncher::new());
//! let request = InvocationRequest::new("IDCAMS")
//!     .authorized(true)
//!     .bind(InlineBinding::text("SYSIN", " LISTCAT ENTRIES('USER.DATA')"))
//!     .bind(SysoutBinding::new("SYSPRINT").return_content(ReturnContent::Text));
//! let report = runner.run(&request)?;
//! println!("{}", report.ret_code.msg_txt);
//! # Ok::<(), open_mainframe_mvsraw::MvsRawError>(())
//! ```

#![forbid(unsafe_code)]

pub mod binding;
pub mod builder;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod provision;
pub mod report;
pub mod request;
pub mod runner;
pub mod storage;

pub use binding::{
    Binding, DatasetBinding, DatasetStatus, DispositionAction, InlineBinding, ReturnContent,
    SysoutBinding, UssBinding,
};
pub use builder::{build_invocation, Invocation};
pub use cleanup::{CleanupCoordinator, CleanupPolicy, DeletionWarning, Termination};
pub use config::{InlineInputMode, LauncherConfig, RunnerConfig};
pub use error::{MvsRawError, Result};
pub use executor::{ExecutionOutcome, Launcher, SystemLauncher};
pub use report::{BindingResult, InvocationReport, ReturnCode};
pub use request::InvocationRequest;
pub use runner::{ProgramRunner, Stage};
pub use storage::{
    AllocationSpec, DatasetMetadata, DatasetStorage, DirectoryStorage, InMemoryStorage,
    StorageError,
};
