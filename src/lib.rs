//! DupeScan - resumable duplicate file finder
//!
//! Finds duplicate file content under a directory tree, including files
//! nested inside ZIP archives, by fingerprinting every file and grouping
//! equal fingerprints. Long scans can be interrupted with Ctrl+C and resumed
//! from a checkpoint without re-fingerprinting finished work.

pub mod checkpoint;
pub mod classify;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::sync::Arc;

use anyhow::{Context, Result};
use bytesize::ByteSize;

use crate::checkpoint::{CheckpointStore, ScanParameters};
use crate::cli::{Cli, Commands, ScanArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::orchestrator::{RunOutcome, ScanOrchestrator};
use crate::output::ScanReport;
use crate::progress::Progress;
use crate::signal::CancelToken;

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns an error for anything that should end the process with
/// [`ExitCode::GeneralError`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref());
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Scan(args) => {
            config.merge_scan_args(&args);
            run_scan(&args, &config, cli.quiet)
        }
        Commands::Status(args) => {
            config.merge_checkpoint_args(&args);
            let store = CheckpointStore::new(config.checkpoint_location());
            println!("{}", describe_checkpoint(&store));
            Ok(ExitCode::Success)
        }
        Commands::Clear(args) => {
            config.merge_checkpoint_args(&args);
            let store = CheckpointStore::new(config.checkpoint_location());
            let existed = store.exists();
            store
                .clear()
                .with_context(|| format!("Failed to delete checkpoint {}", store.path().display()))?;
            if existed {
                println!("Checkpoint {} deleted", store.path().display());
            } else {
                println!("No checkpoint at {}", store.path().display());
            }
            Ok(ExitCode::Success)
        }
    }
}

fn run_scan(args: &ScanArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let root = std::path::absolute(&args.path)
        .with_context(|| format!("Invalid scan root {}", args.path.display()))?;
    let params = ScanParameters {
        root,
        report_path: args.report_path(config.report_format),
        algorithm: config.algorithm,
        report_format: config.report_format,
    };
    let store = CheckpointStore::new(config.checkpoint_location());

    let token = match signal::install_handler() {
        Ok(token) => token,
        Err(e) => {
            log::warn!("{}; Ctrl+C will not checkpoint", e);
            CancelToken::new()
        }
    };

    let mut engine = ScanOrchestrator::start(store, params, args.start_mode())
        .context("Failed to prepare scan")?
        .with_cancel_token(token)
        .with_archive_extensions(config.archive_extensions.clone());

    if config.progress && !quiet {
        engine = engine.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let outcome = engine.run().with_context(|| {
        format!(
            "Scan of {} failed in phase {}",
            engine.state().parameters.root.display(),
            engine.state().phase
        )
    })?;

    match outcome {
        RunOutcome::Completed(report) => {
            if !quiet {
                print_summary(&report, &engine.state().parameters.report_path);
            }
            Ok(ExitCode::Success)
        }
        RunOutcome::Paused {
            phase,
            cursor,
            checkpoint_saved,
        } => {
            if checkpoint_saved {
                eprintln!(
                    "Scan paused in {} at item {}. Run again with --resume to continue.",
                    phase, cursor
                );
            } else {
                eprintln!(
                    "Scan paused in {} at item {}, but the checkpoint could not be saved.",
                    phase, cursor
                );
            }
            Ok(ExitCode::Paused)
        }
    }
}

fn print_summary(report: &ScanReport, destination: &std::path::Path) {
    println!(
        "Scanned {} files ({}) under {}",
        report.total_files_scanned,
        ByteSize::b(report.total_size_scanned),
        report.scanned_directory
    );
    println!(
        "Found {} duplicate groups with {} files, {} reclaimable",
        report.duplicate_groups.len(),
        report.total_duplicate_files(),
        ByteSize::b(report.potential_savings())
    );
    if !report.errors.is_empty() {
        println!("{} items could not be processed (see report)", report.errors.len());
    }
    println!("Report written to {}", destination.display());
}

/// Human-readable description of the checkpoint at `store`.
#[must_use]
pub fn describe_checkpoint(store: &CheckpointStore) -> String {
    let Some(state) = store.load() else {
        return if store.exists() {
            format!(
                "Checkpoint at {} is unreadable and will be ignored",
                store.path().display()
            )
        } else {
            format!("No checkpoint at {}", store.path().display())
        };
    };

    let mut lines = vec![
        format!("Checkpoint: {}", store.path().display()),
        format!("Root:       {}", state.parameters.root.display()),
        format!("Report:     {}", state.parameters.report_path.display()),
        format!("Algorithm:  {}", state.parameters.algorithm),
        format!("Format:     {}", state.parameters.report_format),
        format!("Phase:      {}", state.phase),
    ];
    if let Some(pending) = &state.disk.pending {
        lines.push(format!("Disk:       {}/{} files", state.disk.cursor, pending.len()));
    }
    if state.phase >= checkpoint::Phase::Classifying {
        lines.push(format!(
            "Classified: {}/{} records",
            state.classify.cursor,
            state.disk.records.len()
        ));
    }
    if let Some(pending) = &state.archives.pending {
        lines.push(format!(
            "Archives:   {}/{} archives",
            state.archives.cursor,
            pending.len()
        ));
    }
    lines.push(format!("Records:    {}", state.record_count()));
    lines.push(format!("Errors:     {}", state.errors.len()));
    lines.push(format!(
        "Updated:    {}",
        state.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.join("\n")
}
