//! Command-line interface definitions for DupeScan.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! The CLI follows standard conventions with global options (verbosity, error format) and
//! subcommands for different operations.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory, writing dupescan_report.json
//! dupescan scan ~/Downloads
//!
//! # Press Ctrl+C to pause, then pick up where it stopped
//! dupescan scan ~/Downloads --resume
//!
//! # Throw away any saved progress and start over, CSV report
//! dupescan scan ~/Downloads --fresh --format csv -o dupes.csv
//!
//! # Browsable report
//! dupescan scan ~/Downloads --format html
//!
//! # Inspect or delete the saved checkpoint
//! dupescan status
//! dupescan clear
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::orchestrator::StartMode;
use crate::output::ReportFormat;
use crate::scanner::HashAlgorithm;

/// Resumable duplicate file finder that looks inside ZIP archives.
///
/// DupeScan fingerprints every file under a directory (and every member of
/// the ZIP archives it finds), groups identical content, and writes a
/// report. Interrupted scans are checkpointed and can be resumed.
#[derive(Debug, Parser)]
#[command(name = "dupescan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as a JSON object on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH", env = "DUPESCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for DupeScan.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// Show the phase and progress recorded in the checkpoint
    Status(CheckpointArgs),
    /// Delete the checkpoint
    Clear(CheckpointArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory path to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Report destination (default: dupescan_report.<format>)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Continue from the saved checkpoint; fails if there is none
    #[arg(long, conflicts_with = "fresh")]
    pub resume: bool,

    /// Delete any saved checkpoint before starting
    #[arg(long)]
    pub fresh: bool,

    /// Checkpoint file location
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,

    /// Content fingerprint algorithm
    #[arg(long, value_enum, value_name = "ALG")]
    pub algorithm: Option<HashAlgorithm>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl ScanArgs {
    /// How to treat an existing checkpoint.
    #[must_use]
    pub fn start_mode(&self) -> StartMode {
        if self.resume {
            StartMode::Resume
        } else if self.fresh {
            StartMode::Fresh
        } else {
            StartMode::Continue
        }
    }

    /// Report destination, defaulting to a file named after the format.
    #[must_use]
    pub fn report_path(&self, format: ReportFormat) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_report_path(format))
    }
}

/// Arguments for subcommands that only touch the checkpoint.
#[derive(Debug, Args)]
pub struct CheckpointArgs {
    /// Checkpoint file location
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,
}

/// `dupescan_report.<format>` in the working directory.
#[must_use]
pub fn default_report_path(format: ReportFormat) -> PathBuf {
    Path::new("dupescan_report").with_extension(format.to_string())
}
