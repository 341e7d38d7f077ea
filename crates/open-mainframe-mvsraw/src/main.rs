//! `mvsraw`: run a z/OS program under DD bindings from a JSON request document.
//!
//! The report is printed as JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::warn;

use open_mainframe_mvsraw::{
    DirectoryStorage, InvocationReport, InvocationRequest, ProgramRunner, RunnerConfig,
    SystemLauncher,
};

/// Exit status when the report has cleanup warnings and they are fatal.
const EXIT_CLEANUP_WARNINGS: u8 = 2;

/// mvsraw CLI.
#[derive(Parser)]
#[command(name = "mvsraw", version, about = "Run a z/OS program under DD bindings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the program and print the report.
    Run(RunArgs),
    /// Print the launcher argument vector without running anything.
    Args(ArgsArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// JSON request document.
    #[arg(short, long)]
    request: PathBuf,

    /// TOML runner configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding data sets.
    #[arg(long = "storage-dir", default_value = "datasets")]
    storage_dir: PathBuf,

    /// Validate and plan only.
    #[arg(long)]
    check: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Exit with status 2 when cleanup left resources behind.
    #[arg(long = "fail-on-cleanup-warning")]
    fail_on_cleanup_warning: bool,
}

#[derive(Parser)]
struct ArgsArgs {
    /// JSON request document.
    #[arg(short, long)]
    request: PathBuf,

    /// TOML runner configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Run(args) if args.verbose);
    init_tracing(verbose);

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Args(args) => print_args(args),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (or `debug` with `--verbose`).
fn init_tracing(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    match path {
        Some(path) => RunnerConfig::from_file(path)
            .wrap_err_with(|| format!("Failed to load configuration: {}", path.display())),
        None => Ok(RunnerConfig::default()),
    }
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let request = InvocationRequest::from_file(&args.request)
        .wrap_err_with(|| format!("Failed to read request: {}", args.request.display()))?;

    let launcher = SystemLauncher::from_config(&config.launcher);
    let storage = DirectoryStorage::new(&args.storage_dir);
    let runner = ProgramRunner::with_config(storage, launcher, config);

    let report = if args.check {
        runner.plan(&request)?
    } else {
        runner.run(&request)?
    };
    print_report(&report)?;

    if report.has_warnings() {
        for warning in &report.warnings {
            warn!(resource = %warning.resource, reason = %warning.reason, "not cleaned up");
        }
        if args.fail_on_cleanup_warning {
            return Ok(ExitCode::from(EXIT_CLEANUP_WARNINGS));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_args(args: ArgsArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let request = InvocationRequest::from_file(&args.request)
        .wrap_err_with(|| format!("Failed to read request: {}", args.request.display()))?;

    let runner = ProgramRunner::with_config(
        open_mainframe_mvsraw::InMemoryStorage::new(),
        SystemLauncher::from_config(&config.launcher),
        config,
    );
    let report = runner.plan(&request)?;
    let json = serde_json::to_string_pretty(&report.invocation).into_diagnostic()?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &InvocationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .into_diagnostic()
        .wrap_err("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}
