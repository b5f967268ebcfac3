//! JSON report for scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "summary": {
//!     "scanned_directory": "/data",
//!     "total_files_scanned": 100,
//!     "total_size_scanned": 1048576,
//!     "total_size_human": "1.0 MiB",
//!     "duplicate_groups": 5,
//!     "duplicate_files": 12,
//!     "total_duplicate_size": 61440,
//!     "potential_savings": 51200,
//!     "error_count": 1,
//!     "generated_at": "2024-01-01T00:00:00Z"
//!   },
//!   "duplicates": [
//!     {
//!       "hash": "2cf24dba...",
//!       "total_size": 2048,
//!       "reclaimable_size": 1024,
//!       "files": [
//!         { "path": "/data/a.txt", "size": 1024 },
//!         { "path": "inner/a.txt", "container": "/data/b.zip", "size": 1024 }
//!       ]
//!     }
//!   ],
//!   "errors": { "/data/locked": "Permission denied" }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{create_destination, ReportError, Reporter, ScanReport};
use crate::duplicates::DuplicateGroup;
use crate::scanner::FileRecord;

/// One member of a duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Disk path, or entry name for archive members
    pub path: String,
    /// Enclosing archive for archive members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Size in bytes
    pub size: u64,
    /// Category assigned during classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<&FileRecord> for JsonFile {
    fn from(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            container: record.container_path.clone(),
            size: record.size,
            category: record.category.clone(),
        }
    }
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Shared content fingerprint (lowercase hex)
    pub hash: String,
    /// Combined size of all members
    pub total_size: u64,
    /// Bytes freed by keeping only the smallest member
    pub reclaimable_size: u64,
    /// Members, ordered by identity
    pub files: Vec<JsonFile>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a [`DuplicateGroup`].
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.key.clone(),
            total_size: group.total_size(),
            reclaimable_size: group.reclaimable_size(),
            files: group.members.iter().map(JsonFile::from).collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Root directory that was scanned
    pub scanned_directory: String,
    /// Records fingerprinted (disk files and archive members)
    pub total_files_scanned: usize,
    /// Size of all fingerprinted records in bytes
    pub total_size_scanned: u64,
    /// `total_size_scanned` in IEC units
    pub total_size_human: String,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Files across all duplicate groups
    pub duplicate_files: usize,
    /// Bytes occupied by all duplicate group members
    pub total_duplicate_size: u64,
    /// Bytes that can be reclaimed
    pub potential_savings: u64,
    /// Number of per-item failures
    pub error_count: usize,
    /// When the report was generated
    pub generated_at: DateTime<Utc>,
}

impl JsonSummary {
    /// Summarize a [`ScanReport`].
    #[must_use]
    pub fn from_report(report: &ScanReport) -> Self {
        Self {
            scanned_directory: report.scanned_directory.clone(),
            total_files_scanned: report.total_files_scanned,
            total_size_scanned: report.total_size_scanned,
            total_size_human: ByteSize::b(report.total_size_scanned).to_string(),
            duplicate_groups: report.duplicate_groups.len(),
            duplicate_files: report.total_duplicate_files(),
            total_duplicate_size: report.total_duplicate_size(),
            potential_savings: report.potential_savings(),
            error_count: report.errors.len(),
            generated_at: Utc::now(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Scan summary statistics
    pub summary: JsonSummary,
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Per-item failures
    pub errors: BTreeMap<String, String>,
}

impl JsonOutput {
    /// Build the JSON document for a report.
    #[must_use]
    pub fn new(report: &ScanReport) -> Self {
        Self {
            summary: JsonSummary::from_report(report),
            duplicates: report
                .duplicate_groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            errors: report.errors.clone(),
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Json`] if serialization fails, or
    /// [`ReportError::Io`] naming `destination` if the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, destination: &Path) -> Result<(), ReportError> {
        let json = self.to_json_pretty()?;
        writer
            .write_all(json.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush())
            .map_err(|source| ReportError::Io {
                path: destination.to_path_buf(),
                source,
            })
    }
}

/// Reporter producing a pretty-printed JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReporter;

impl JsonReporter {
    /// Create a JSON reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for JsonReporter {
    fn render(&self, report: &ScanReport, destination: &Path) -> Result<(), ReportError> {
        let mut writer = create_destination(destination)?;
        JsonOutput::new(report).write_to(&mut writer, destination)?;
        log::info!("JSON report written to {}", destination.display());
        Ok(())
    }
}
