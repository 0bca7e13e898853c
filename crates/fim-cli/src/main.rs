use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use fim_core::{Algorithm, CheckSummary, Monitor, MonitorConfig, Status};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod report;
mod traverse;

use crate::traverse::ExtensionFilter;

/// Exit status when a check finds modified, missing or unreadable files.
const EXIT_FINDINGS: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "fim", author, version, about = "File integrity monitor", long_about = None)]
struct Cli {
    /// Registry database file (default: integrity_database.json)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Hash algorithm for new registrations: md5, sha1, sha256, sha512
    #[arg(short, long, global = true)]
    algorithm: Option<Algorithm>,

    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a file for monitoring
    Add { file: PathBuf },

    /// Register every file in a directory
    AddDir {
        dir: PathBuf,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Only include these extensions (e.g. .txt .rs)
        #[arg(short, long, num_args = 1..)]
        extensions: Vec<String>,
    },

    /// Verify one monitored file
    Check { file: PathBuf },

    /// Verify every monitored file
    CheckAll {
        /// Worker threads (0 = one per core)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Stop monitoring a file
    Remove { file: PathBuf },

    /// List monitored files
    List,

    /// Verify every file and write a text report
    Report {
        #[arg(short, long, default_value = "integrity_report.txt")]
        output: PathBuf,
        /// Worker threads (0 = one per core)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = MonitorConfig::resolve(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    let algorithm = cli.algorithm.unwrap_or(config.default_algorithm);

    match cli.command {
        Commands::Add { file } => add(&Monitor::open(config), &file, algorithm),
        Commands::AddDir {
            dir,
            recursive,
            extensions,
        } => add_dir(&Monitor::open(config), &dir, recursive, &extensions, algorithm),
        Commands::Check { file } => check(&Monitor::open(config), &file),
        Commands::CheckAll { jobs } => {
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            check_all(&Monitor::open(config))
        }
        Commands::Remove { file } => remove(&Monitor::open(config), &file),
        Commands::List => {
            print!("{}", report::render_listing(&Monitor::open(config).list()));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Report { output, jobs } => {
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            write_report(&Monitor::open(config), &output)
        }
    }
}

fn add(monitor: &Monitor, file: &Path, algorithm: Algorithm) -> Result<ExitCode> {
    let record = monitor
        .register(file, algorithm)
        .with_context(|| format!("cannot add {}", file.display()))?;
    println!("Monitoring {}", record.path);
    println!("   {} fingerprint: {}", algorithm.as_str().to_uppercase(), record.fingerprint);
    Ok(ExitCode::SUCCESS)
}

fn add_dir(
    monitor: &Monitor,
    dir: &Path,
    recursive: bool,
    extensions: &[String],
    algorithm: Algorithm,
) -> Result<ExitCode> {
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }
    let candidates = traverse::candidates(dir, recursive, ExtensionFilter::new(extensions));
    let outcome = monitor.register_many(candidates, algorithm);
    for (path, e) in &outcome.failures {
        eprintln!("skipped {}: {e}", path.display());
    }
    println!("{} files added from {}", outcome.registered, dir.display());
    Ok(ExitCode::SUCCESS)
}

fn check(monitor: &Monitor, file: &Path) -> Result<ExitCode> {
    let result = monitor
        .check(file)
        .with_context(|| format!("cannot record check of {}", file.display()))?;
    println!("{}", report::render_result(&result));
    Ok(match result.status {
        Status::Intact => ExitCode::SUCCESS,
        Status::Unknown => ExitCode::FAILURE,
        Status::Modified | Status::Missing | Status::Error => ExitCode::from(EXIT_FINDINGS),
    })
}

fn check_all(monitor: &Monitor) -> Result<ExitCode> {
    println!("Verifying {} files...", monitor.len());
    let summary = monitor.check_all().context("cannot save check results")?;
    for result in summary.iter() {
        println!("{}", report::render_result(result));
    }
    println!(
        "\n{} intact, {} modified, {} missing, {} errors",
        summary.intact.len(),
        summary.modified.len(),
        summary.missing.len(),
        summary.errors.len()
    );
    Ok(summary_exit(&summary))
}

fn remove(monitor: &Monitor, file: &Path) -> Result<ExitCode> {
    let removed = monitor
        .unregister(file)
        .with_context(|| format!("cannot remove {}", file.display()))?;
    if removed {
        println!("Stopped monitoring {}", file.display());
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("not monitored: {}", file.display());
        Ok(ExitCode::FAILURE)
    }
}

fn write_report(monitor: &Monitor, output: &Path) -> Result<ExitCode> {
    let summary = monitor.check_all().context("cannot save check results")?;
    let text = report::render_report(&summary, Local::now());
    std::fs::write(output, text).with_context(|| format!("cannot write report {}", output.display()))?;
    println!("Report written: {}", output.display());
    Ok(summary_exit(&summary))
}

fn summary_exit(summary: &CheckSummary) -> ExitCode {
    if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FINDINGS)
    }
}
