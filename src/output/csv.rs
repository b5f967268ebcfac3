//! CSV report for scan results.
//!
//! One row is generated for each member of each duplicate group.
//!
//! # Columns
//!
//! - `group_id`: 1-based ID of the duplicate group
//! - `hash`: content fingerprint (hexadecimal)
//! - `container`: enclosing archive, empty for disk files
//! - `path`: disk path, or entry name inside `container`
//! - `size`: file size in bytes
//! - `category`: classifier category, empty if unclassified

use std::io;
use std::path::Path;

use serde::Serialize;

use super::{create_destination, ReportError, Reporter, ScanReport};

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    hash: &'a str,
    container: &'a str,
    path: &'a str,
    size: u64,
    category: &'a str,
}

/// Reporter producing one CSV row per duplicate file.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReporter;

impl CsvReporter {
    /// Create a CSV reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Write the CSV rows for `report` to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Csv` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, report: &ScanReport, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in report.duplicate_groups.iter().enumerate() {
            for member in &group.members {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    hash: &group.key,
                    container: member.container_path.as_deref().unwrap_or_default(),
                    path: &member.path,
                    size: member.size,
                    category: member.category.as_deref().unwrap_or_default(),
                })?;
            }
        }

        csv_writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

impl Reporter for CsvReporter {
    fn render(&self, report: &ScanReport, destination: &Path) -> Result<(), ReportError> {
        let writer = create_destination(destination)?;
        self.write_to(report, writer)?;
        log::info!("CSV report written to {}", destination.display());
        Ok(())
    }
}
