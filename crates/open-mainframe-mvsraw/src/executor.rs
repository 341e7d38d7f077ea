//! Launcher execution.

use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::builder::Invocation;
use crate::config::LauncherConfig;
use crate::error::{MvsRawError, Result};

/// What the launcher left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Exit code, or -1 when the process ended without one.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl ExecutionOutcome {
    /// Whether the process returned an exit code.
    pub fn has_exit_code(&self) -> bool {
        self.exit_code >= 0
    }
}

/// Runs a built invocation to completion.
///
/// A non-zero exit code is a successful launch; only failing to start or
/// talk to the process is an error.
pub trait Launcher {
    /// Run `invocation` and wait for it.
    fn launch(&self, invocation: &Invocation) -> Result<ExecutionOutcome>;
}

impl<L: Launcher + ?Sized> Launcher for &L {
    fn launch(&self, invocation: &Invocation) -> Result<ExecutionOutcome> {
        (**self).launch(invocation)
    }
}

/// Spawns the launcher as a child process, without a shell.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    working_dir: Option<PathBuf>,
}

impl SystemLauncher {
    /// Launcher running in the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher running in `dir`.
    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }

    /// Launcher as configured.
    pub fn from_config(config: &LauncherConfig) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
        }
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, invocation: &Invocation) -> Result<ExecutionOutcome> {
        let launcher = invocation.command().to_string();
        let execution_error = |source: std::io::Error| MvsRawError::Execution {
            launcher: launcher.clone(),
            source,
        };
        if launcher.is_empty() {
            return Err(execution_error(std::io::Error::new(
                ErrorKind::InvalidInput,
                "empty launcher command",
            )));
        }

        let mut cmd = Command::new(&launcher);
        cmd.args(invocation.args());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(command = %invocation, "spawning launcher");
        let mut child = cmd.spawn().map_err(execution_error)?;

        // stdin is written while stdout/stderr are drained.
        let writer = match (child.stdin.take(), invocation.stdin.clone()) {
            (Some(mut pipe), Some(data)) => Some(std::thread::spawn(move || pipe.write_all(&data))),
            _ => None,
        };

        let output = child.wait_with_output().map_err(execution_error)?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("launcher exited before reading all of stdin");
                }
                Ok(Err(e)) => return Err(execution_error(e)),
                Err(_) => {
                    return Err(execution_error(std::io::Error::other(
                        "stdin writer panicked",
                    )))
                }
            }
        }

        let exit_code = output.status.code().unwrap_or(-1);
        info!(
            launcher = %launcher,
            rc = exit_code,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "launcher finished"
        );
        Ok(ExecutionOutcome {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
