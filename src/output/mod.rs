//! Report rendering for finished scans.
//!
//! This module provides different output formats for scan results:
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//! - HTML for reading in a browser
//!
//! The orchestrator only sees the [`Reporter`] trait; it hands over a
//! [`ScanReport`] and a destination path once duplicates are indexed.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::output::{reporter_for, ReportFormat, Reporter, ScanReport};
//! use std::path::Path;
//!
//! let report = ScanReport::new("/data".to_string());
//! let reporter = reporter_for(ReportFormat::Json);
//! reporter.render(&report, Path::new("report.json")).unwrap();
//! ```

pub mod csv;
pub mod html;
pub mod json;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::duplicates::DuplicateGroup;

// Re-export main types
pub use self::csv::CsvReporter;
pub use self::html::HtmlReporter;
pub use self::json::JsonReporter;

/// Outcome of a completed scan, as handed to a [`Reporter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Root directory that was scanned
    pub scanned_directory: String,
    /// Disk files plus archive members that were fingerprinted
    pub total_files_scanned: usize,
    /// Combined size of those records in bytes
    pub total_size_scanned: u64,
    /// Duplicate groups, sorted by fingerprint
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Per-item failures keyed by path or `container/entry`
    pub errors: BTreeMap<String, String>,
}

impl ScanReport {
    /// Create an empty report for `scanned_directory`.
    #[must_use]
    pub fn new(scanned_directory: String) -> Self {
        Self {
            scanned_directory,
            ..Self::default()
        }
    }

    /// Files that belong to some duplicate group.
    #[must_use]
    pub fn total_duplicate_files(&self) -> usize {
        self.duplicate_groups.iter().map(DuplicateGroup::len).sum()
    }

    /// Bytes occupied by all members of all groups.
    #[must_use]
    pub fn total_duplicate_size(&self) -> u64 {
        self.duplicate_groups
            .iter()
            .map(DuplicateGroup::total_size)
            .sum()
    }

    /// Bytes freed by keeping one copy of each group.
    #[must_use]
    pub fn potential_savings(&self) -> u64 {
        self.duplicate_groups
            .iter()
            .map(DuplicateGroup::reclaimable_size)
            .sum()
    }
}

/// Errors that can occur while rendering a report.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// The destination could not be created or written.
    #[error("Failed to write report to {path}: {source}")]
    Io {
        /// Destination path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// HTML template error
    #[error("HTML template error: {0}")]
    Template(#[from] askama::Error),
}

/// Renders a finished scan to a destination.
pub trait Reporter: Send + Sync {
    /// Write `report` to `destination`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the destination cannot be written. The
    /// orchestrator treats this as fatal for the run.
    fn render(&self, report: &ScanReport, destination: &Path) -> Result<(), ReportError>;
}

/// Report file format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Pretty-printed JSON document
    #[default]
    Json,
    /// One CSV row per duplicate file
    Csv,
    /// Self-contained HTML page
    Html,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Html => write!(f, "html"),
        }
    }
}

/// Build the reporter for a format.
#[must_use]
pub fn reporter_for(format: ReportFormat) -> Box<dyn Reporter> {
    match format {
        ReportFormat::Json => Box::new(JsonReporter::new()),
        ReportFormat::Csv => Box::new(CsvReporter::new()),
        ReportFormat::Html => Box::new(HtmlReporter::new()),
    }
}

/// Open `destination` for writing, creating missing parent directories.
pub(crate) fn create_destination(destination: &Path) -> Result<BufWriter<File>, ReportError> {
    let io_err = |source| ReportError::Io {
        path: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    File::create(destination).map(BufWriter::new).map_err(io_err)
}
