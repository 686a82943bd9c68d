//! msync - marker-guarded directory sync
//!
//! Mirrors SOURCE into DEST, resuming transfers that a previous run left
//! unfinished.

use clap::{ArgAction, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use marksync::{Error as SyncError, FailurePolicy, SyncOptions, SyncStats, scan_orphans, sync_dir};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const JSON_SCHEMA_VERSION: &str = "1.0";

/// msync - one-way directory sync that survives interruptions
///
/// Copies files that are new or newer than their destination counterpart.
/// Every copy is guarded by a `<file>.transferring` marker; a marker left
/// behind by a crash or unplugged drive makes the next run redo that file.
#[derive(Parser, Debug)]
#[command(name = "msync", version, about, long_about = None)]
struct Args {
    /// Source directory
    source: PathBuf,

    /// Destination directory (created if missing)
    dest: PathBuf,

    /// Number of parallel copy operations
    #[arg(short = 'j', long, default_value = "1")]
    jobs: usize,

    /// What to do with a transfer marker when its copy fails
    #[arg(long, value_enum, default_value = "keep-marker")]
    on_failure: FailureMode,

    /// Do not preserve file timestamps
    #[arg(long)]
    no_times: bool,

    /// Do not preserve file permissions
    #[arg(long)]
    no_perms: bool,

    /// Do not call fsync on markers and files (faster but less safe)
    #[arg(long)]
    no_sync: bool,

    /// Maximum directory depth (default: unlimited)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    output: OutputMode,

    /// Disable progress spinner
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv per-file debug, -vvv trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailureMode {
    /// Leave the marker so the next run retries the file
    KeepMarker,
    /// Delete the marker; the partial file is then treated as ordinary
    RemoveMarker,
}

impl From<FailureMode> for FailurePolicy {
    fn from(mode: FailureMode) -> Self {
        match mode {
            FailureMode::KeepMarker => FailurePolicy::KeepMarker,
            FailureMode::RemoveMarker => FailurePolicy::RemoveMarker,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
enum CliError {
    #[error("Source does not exist: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Source is not a directory: {path}")]
    SourceNotDirectory { path: PathBuf },

    #[error("Sync failed: {source}")]
    Sync { source: SyncError },

    #[error("{count} file(s) or directories failed to sync")]
    PartialFailure { count: usize, no_space: bool },

    #[error("Failed to serialize JSON output: {source}")]
    JsonSerialize { source: serde_json::Error },
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::SourceNotFound { .. } | Self::SourceNotDirectory { .. } => 2,
            Self::Sync {
                source: SyncError::Cancelled { .. },
            } => 130,
            Self::Sync { .. } | Self::PartialFailure { .. } | Self::JsonSerialize { .. } => 1,
        }
    }
}

impl From<SyncError> for CliError {
    fn from(source: SyncError) -> Self {
        match source {
            SyncError::SourceNotFound(path) => Self::SourceNotFound { path },
            SyncError::NotADirectory(path) => Self::SourceNotDirectory { path },
            source => Self::Sync { source },
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(error) = run(&args) {
        match &error {
            CliError::Sync {
                source: SyncError::Cancelled { stats },
            } => {
                eprintln!(
                    "Cancelled after copying {} files ({}).",
                    stats.files_copied,
                    format_bytes(stats.bytes_copied)
                );
                eprintln!("Re-run with the same command to resume.");
            }
            CliError::PartialFailure { no_space: true, .. } => {
                eprintln!("error: {error}");
                eprintln!("The destination ran out of space. Free some space and re-run to resume.");
            }
            _ => eprintln!("error: {error}"),
        }
        std::process::exit(error.exit_code());
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("marksync={level},msync={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

/// First Ctrl+C sets `cancel`, the second exits immediately.
///
/// Returns false if the handler could not be installed; the sync then runs
/// without graceful cancellation.
fn install_cancel_handler(cancel: Arc<AtomicBool>) -> bool {
    let result = ctrlc::set_handler(move || {
        if cancel.load(Ordering::Relaxed) {
            eprintln!("\nForce quit.");
            std::process::exit(130);
        }
        cancel.store(true, Ordering::Relaxed);
        eprintln!(
            "\nCancelling... finishing in-flight files. Press Ctrl+C again to abort immediately."
        );
    });

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to install Ctrl+C handler: {e}");
            false
        }
    }
}

fn run(args: &Args) -> CliResult<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    install_cancel_handler(cancel.clone());

    let options = build_options(args).with_cancel_token(cancel);
    debug!(?options, "effective options");

    let orphans = scan_orphans(&args.dest, &options);
    if orphans.count() > 0 && args.output == OutputMode::Human {
        println!("{} incomplete transfer(s) will resume", orphans.count());
    }

    let pb = if args.output == OutputMode::Human && !args.quiet && args.verbose == 0 {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner().template("{spinner:.green} {msg}");
        if let Ok(style) = style {
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb.set_message(format!("Syncing {}...", args.source.display()));
            Some(pb)
        } else {
            None
        }
    } else {
        None
    };

    info!(source = %args.source.display(), dest = %args.dest.display(), "sync starting");
    let start = Instant::now();
    let result = sync_dir(&args.source, &args.dest, &options);
    let elapsed = start.elapsed();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let stats = result?;
    info!(elapsed = ?elapsed, "sync finished");

    match args.output {
        OutputMode::Human => print_stats(&stats, elapsed),
        OutputMode::Json => print_json(&stats, orphans.count())?,
    }

    if stats.has_failures() {
        return Err(CliError::PartialFailure {
            count: stats.failures.len(),
            no_space: stats.failures.iter().any(|f| f.no_space),
        });
    }

    Ok(())
}

fn build_options(args: &Args) -> SyncOptions {
    let mut options = SyncOptions::default()
        .with_parallel(args.jobs)
        .with_on_failure(args.on_failure.into());

    if args.no_times {
        options = options.without_timestamps();
    }
    if args.no_perms {
        options = options.without_permissions();
    }
    if args.no_sync {
        options = options.without_fsync();
    }
    if let Some(depth) = args.max_depth {
        options = options.with_max_depth(depth);
    }

    options
}

fn print_stats(stats: &SyncStats, elapsed: Duration) {
    if stats.files_copied == 0 && stats.dirs_created == 0 && !stats.has_failures() {
        if stats.files_skipped > 0 {
            println!("Nothing to sync ({} files up to date)", stats.files_skipped);
        } else {
            println!("Nothing to sync");
        }
    } else {
        println!("Sync completed in {:.2?}", elapsed);
        println!("  Files copied:      {}", stats.files_copied);
        println!("  Transfers resumed: {}", stats.transfers_resumed);
        println!("  Files up to date:  {}", stats.files_skipped);
        println!("  Directories:       {}", stats.dirs_created);
        println!("  Failed:            {}", stats.failures.len());
        println!("  Total size:        {}", format_bytes(stats.bytes_copied));
    }

    if stats.files_skipped_timestamp > 0 {
        println!(
            "{} file(s) skipped due to timestamp issues, please review:",
            stats.files_skipped_timestamp
        );
    }
    for entry in &stats.files_with_timestamp_issues {
        println!("review: {} ({})", entry.source.display(), entry.detail);
    }
    for failure in &stats.failures {
        println!("failed: {} ({})", failure.path.display(), failure.message);
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    schema_version: &'static str,
    orphaned_markers: usize,
    stats: &'a SyncStats,
}

fn print_json(stats: &SyncStats, orphaned_markers: usize) -> CliResult<()> {
    let report = JsonReport {
        schema_version: JSON_SCHEMA_VERSION,
        orphaned_markers,
        stats,
    };
    let serialized =
        serde_json::to_string(&report).map_err(|source| CliError::JsonSerialize { source })?;
    println!("{serialized}");
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
