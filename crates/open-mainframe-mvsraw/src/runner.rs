//! Program runner: one invocation from request to report.
//!
//! ```text
//! Validated → Provisioning → Building → Executing → Extracting → CleaningUp → Done
//!      ╰──────────────┴────────────┴──────────┴───────────╯→ Failed → CleaningUp → Done
//! ```
//!
//! Once provisioning has begun, cleanup runs exactly once on every path out
//! of [`ProgramRunner::run`], including unwinding.

use std::fmt;

use tracing::{debug, info};

use crate::builder::{build_invocation, Invocation};
use crate::cleanup::{CleanupCoordinator, Termination};
use crate::config::RunnerConfig;
use crate::error::Result;
use crate::executor::{ExecutionOutcome, Launcher};
use crate::extract::extract_results;
use crate::provision::{Provisioner, TempNamer};
use crate::report::{BindingResult, InvocationReport, ReturnCode};
use crate::request::InvocationRequest;
use crate::storage::DatasetStorage;

/// Invocation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Request checked.
    Validated,
    /// Allocating resources.
    Provisioning,
    /// Building the argument vector.
    Building,
    /// Launcher running.
    Executing,
    /// Collecting results.
    Extracting,
    /// Draining temporary resources.
    CleaningUp,
    /// Finished.
    Done,
    /// A stage failed.
    Failed,
}

impl Stage {
    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        match (self, next) {
            (Validated, Provisioning)
            | (Provisioning, Building)
            | (Building, Executing)
            | (Executing, Extracting)
            | (Extracting, CleaningUp)
            | (Failed, CleaningUp)
            | (CleaningUp, Done) => true,
            (Done | Failed, _) => false,
            (_, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Stage tracker of one invocation.
#[derive(Debug)]
struct Lifecycle<'a> {
    program: &'a str,
    stage: Stage,
}

impl<'a> Lifecycle<'a> {
    fn new(program: &'a str) -> Self {
        debug!(program, stage = %Stage::Validated, "invocation validated");
        Self {
            program,
            stage: Stage::Validated,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {} -> {}",
            self.stage,
            next
        );
        debug!(program = self.program, from = %self.stage, to = %next, "invocation stage");
        self.stage = next;
    }
}

/// Runs programs under DD bindings.
///
/// `ProgramRunner` is `Sync` when its storage and launcher are; concurrent
/// invocations draw distinct temporary names from the same runner.
#[derive(Debug)]
pub struct ProgramRunner<S, L> {
    storage: S,
    launcher: L,
    config: RunnerConfig,
    namer: TempNamer,
}

impl<S: DatasetStorage, L: Launcher> ProgramRunner<S, L> {
    /// Runner with the default configuration.
    pub fn new(storage: S, launcher: L) -> Self {
        Self::with_config(storage, launcher, RunnerConfig::default())
    }

    /// Runner with `config`.
    pub fn with_config(storage: S, launcher: L, config: RunnerConfig) -> Self {
        let namer = TempNamer::new(&config.temp_hlq);
        Self {
            storage,
            launcher,
            config,
            namer,
        }
    }

    /// The storage collaborator.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The launcher.
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// The configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the program and report what each DD holds afterwards.
    ///
    /// A non-zero return code is reported, not raised.
    pub fn run(&self, request: &InvocationRequest) -> Result<InvocationReport> {
        request.validate()?;
        info!(
            program = %request.program,
            authorized = request.authorized,
            bindings = request.bindings.len(),
            "running program"
        );

        let mut lifecycle = Lifecycle::new(&request.program);
        let mut cleanup = CleanupCoordinator::new(&self.storage, self.config.cleanup.policy);
        let result = self.execute_stages(request, &mut lifecycle, &mut cleanup);

        let termination = match &result {
            Ok((_, outcome, _)) if outcome.has_exit_code() => Termination::Normal,
            _ => Termination::Abnormal,
        };
        if result.is_err() {
            lifecycle.advance(Stage::Failed);
        }
        lifecycle.advance(Stage::CleaningUp);
        let warnings = cleanup.finish(termination);
        lifecycle.advance(Stage::Done);

        let (invocation, outcome, results) = result?;
        let ret_code = ReturnCode::from_exit(outcome.exit_code);
        info!(
            program = %request.program,
            rc = outcome.exit_code,
            warnings = warnings.len(),
            "{}",
            ret_code.msg_txt
        );
        Ok(InvocationReport {
            changed: true,
            ret_code,
            dd_names: results,
            warnings,
            invocation: invocation.argv,
        })
    }

    /// Validate and build the invocation without allocating or running anything.
    pub fn plan(&self, request: &InvocationRequest) -> Result<InvocationReport> {
        request.validate()?;
        let provisioner = Provisioner::new(&self.storage, &self.namer, self.config.inline_input);
        let resolved = provisioner.plan(request);
        let invocation = build_invocation(request, &resolved, &self.config.launcher)?;
        info!(program = %request.program, command = %invocation, "check mode");
        Ok(InvocationReport {
            changed: false,
            ret_code: ReturnCode::not_run(),
            dd_names: Vec::new(),
            warnings: Vec::new(),
            invocation: invocation.argv,
        })
    }

    fn execute_stages(
        &self,
        request: &InvocationRequest,
        lifecycle: &mut Lifecycle<'_>,
        cleanup: &mut CleanupCoordinator<'_, S>,
    ) -> Result<(Invocation, ExecutionOutcome, Vec<BindingResult>)> {
        lifecycle.advance(Stage::Provisioning);
        let provisioner = Provisioner::new(&self.storage, &self.namer, self.config.inline_input);
        let resolved = provisioner.provision(request, cleanup.resources_mut())?;

        lifecycle.advance(Stage::Building);
        let invocation = build_invocation(request, &resolved, &self.config.launcher)?;

        lifecycle.advance(Stage::Executing);
        let outcome = self.launcher.launch(&invocation)?;

        lifecycle.advance(Stage::Extracting);
        let results = extract_results(request, &resolved, &outcome, &self.storage)?;
        Ok((invocation, outcome, results))
    }
}
