//! HTML report for scan results.
//!
//! A single self-contained page rendered with `askama` from
//! `templates/report.html`. All CSS is embedded. Paths and entry names are
//! escaped by the template engine.
//!
//! # Usage
//!
//! ```no_run
//! use dupescan::output::html::HtmlOutput;
//! use dupescan::output::ScanReport;
//!
//! let report = ScanReport::new("/data".to_string());
//! let html = HtmlOutput::new(&report).to_html().unwrap();
//! assert!(html.contains("<!DOCTYPE html>"));
//! ```

use std::io::Write;
use std::path::Path;

use askama::Template;
use bytesize::ByteSize;
use chrono::Local;

use super::{create_destination, ReportError, Reporter, ScanReport};
use crate::duplicates::DuplicateGroup;
use crate::scanner::FileRecord;

/// Complete HTML output structure for the Askama template.
#[derive(Template)]
#[template(path = "report.html")]
pub struct HtmlOutput {
    /// Formatted generation timestamp
    pub timestamp: String,
    /// Application version
    pub version: String,
    /// Root directory that was scanned
    pub scanned_directory: String,
    /// Disk files plus archive members fingerprinted
    pub total_files: usize,
    /// Human-readable size of everything fingerprinted
    pub total_size: String,
    /// Files that belong to some duplicate set
    pub duplicate_files: usize,
    /// Human-readable space freed by keeping one copy per set
    pub reclaimable_space: String,
    /// Duplicate sets formatted for HTML
    pub groups: Vec<HtmlDuplicateGroup>,
    /// Per-item failures, ordered by key
    pub errors: Vec<HtmlErrorEntry>,
}

/// A duplicate set formatted for HTML presentation.
pub struct HtmlDuplicateGroup {
    /// Shared content fingerprint
    pub hash: String,
    /// Human-readable size of all members together
    pub total_size: String,
    /// Human-readable reclaimable size
    pub reclaimable_size: String,
    /// Members, ordered by path
    pub files: Vec<HtmlFileEntry>,
}

/// One duplicate file formatted for HTML presentation.
pub struct HtmlFileEntry {
    /// Disk path, or entry name inside `container`
    pub path: String,
    /// Enclosing archive, empty for disk files
    pub container: String,
    /// Human-readable size
    pub size: String,
    /// Classifier category, empty if unclassified
    pub category: String,
}

impl HtmlFileEntry {
    /// Whether this entry lives inside an archive.
    #[must_use]
    pub fn in_archive(&self) -> bool {
        !self.container.is_empty()
    }
}

/// A per-item failure.
pub struct HtmlErrorEntry {
    /// Path or `container/entry`
    pub path: String,
    /// Failure description
    pub reason: String,
}

impl HtmlOutput {
    /// Build the page model for a report.
    #[must_use]
    pub fn new(report: &ScanReport) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            scanned_directory: report.scanned_directory.clone(),
            total_files: report.total_files_scanned,
            total_size: ByteSize::b(report.total_size_scanned).to_string(),
            duplicate_files: report.total_duplicate_files(),
            reclaimable_space: ByteSize::b(report.potential_savings()).to_string(),
            groups: report.duplicate_groups.iter().map(html_group).collect(),
            errors: report
                .errors
                .iter()
                .map(|(path, reason)| HtmlErrorEntry {
                    path: path.clone(),
                    reason: reason.clone(),
                })
                .collect(),
        }
    }

    /// Generate the HTML string using the embedded template.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn to_html(&self) -> Result<String, askama::Error> {
        self.render()
    }

    /// Write the rendered page to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Template`] if rendering fails, or
    /// [`ReportError::Io`] naming `destination` if the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, destination: &Path) -> Result<(), ReportError> {
        let html = self.to_html()?;
        writer
            .write_all(html.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|source| ReportError::Io {
                path: destination.to_path_buf(),
                source,
            })
    }
}

fn html_group(group: &DuplicateGroup) -> HtmlDuplicateGroup {
    HtmlDuplicateGroup {
        hash: group.key.clone(),
        total_size: ByteSize::b(group.total_size()).to_string(),
        reclaimable_size: ByteSize::b(group.reclaimable_size()).to_string(),
        files: group.members.iter().map(html_file).collect(),
    }
}

fn html_file(record: &FileRecord) -> HtmlFileEntry {
    HtmlFileEntry {
        path: record.path.clone(),
        container: record.container_path.clone().unwrap_or_default(),
        size: ByteSize::b(record.size).to_string(),
        category: record.category.clone().unwrap_or_default(),
    }
}

/// Reporter producing a self-contained HTML page.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReporter;

impl HtmlReporter {
    /// Create an HTML reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for HtmlReporter {
    fn render(&self, report: &ScanReport, destination: &Path) -> Result<(), ReportError> {
        let mut writer = create_destination(destination)?;
        HtmlOutput::new(report).write_to(&mut writer, destination)?;
        log::info!("HTML report written to {}", destination.display());
        Ok(())
    }
}
