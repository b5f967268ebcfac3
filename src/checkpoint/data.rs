//! Resumable scan state.
//!
//! [`ScanState`] is the engine's entire memory between runs: the fixed
//! parameters, the current [`Phase`], one progress struct per cursor-driven
//! phase, and the merged error map. It is persisted as a single unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::output::ReportFormat;
use crate::scanner::{FileRecord, HashAlgorithm};

/// Current version of the checkpoint format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Pipeline phases, in their only legal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Fresh state, nothing done yet
    Init,
    /// Enumerating and fingerprinting files on disk
    ScanningDisk,
    /// Assigning categories to disk records
    Classifying,
    /// Fingerprinting members of archives found on disk
    ScanningArchives,
    /// Grouping all records by fingerprint
    FindingDuplicates,
    /// Handing groups to the reporter
    Reporting,
    /// Terminal; the checkpoint is deleted
    Completed,
}

impl Phase {
    /// The phase that follows this one. `Completed` is terminal.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Init => Self::ScanningDisk,
            Self::ScanningDisk => Self::Classifying,
            Self::Classifying => Self::ScanningArchives,
            Self::ScanningArchives => Self::FindingDuplicates,
            Self::FindingDuplicates => Self::Reporting,
            Self::Reporting | Self::Completed => Self::Completed,
        }
    }

    /// Stable lowercase name used in logs and progress output.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ScanningDisk => "scanning_disk",
            Self::Classifying => "classifying",
            Self::ScanningArchives => "scanning_archives",
            Self::FindingDuplicates => "finding_duplicates",
            Self::Reporting => "reporting",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters fixed when the state is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanParameters {
    /// Directory being scanned
    pub root: PathBuf,
    /// Where the report is written
    pub report_path: PathBuf,
    /// Fingerprint algorithm; mixing algorithms would break grouping
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    /// Format of the document written to `report_path`
    #[serde(default)]
    pub report_format: ReportFormat,
}

/// Progress of the disk scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskScanProgress {
    /// Materialized enumeration; `None` until the phase first runs
    pub pending: Option<Vec<PathBuf>>,
    /// Index of the next unprocessed path
    pub cursor: usize,
    /// Fingerprinted disk files
    pub records: Vec<FileRecord>,
}

/// Progress of classification. Works in place over the disk records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyProgress {
    /// Index of the next unclassified disk record
    pub cursor: usize,
}

/// Progress of the archive scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveScanProgress {
    /// Archives to expand; `None` until the phase first runs
    pub pending: Option<Vec<PathBuf>>,
    /// Index of the next unexpanded archive
    pub cursor: usize,
    /// Fingerprinted archive members
    pub records: Vec<FileRecord>,
}

/// The full resumable state of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanState {
    /// Format version.
    pub version: u32,
    /// When the scan started.
    pub created_at: DateTime<Utc>,
    /// When the state was last persisted.
    pub updated_at: DateTime<Utc>,
    /// Fixed scan parameters.
    pub parameters: ScanParameters,
    /// Current phase; the only driver of control flow.
    pub phase: Phase,
    /// Disk scan cursor and accumulator.
    #[serde(default)]
    pub disk: DiskScanProgress,
    /// Classification cursor.
    #[serde(default)]
    pub classify: ClassifyProgress,
    /// Archive scan cursor and accumulator.
    #[serde(default)]
    pub archives: ArchiveScanProgress,
    /// Per-item failures keyed by path or `container/entry`.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

/// A violated consistency rule between phase and fields.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{phase}: {reason}")]
pub struct StateViolation {
    /// Phase the state claims to be in
    pub phase: Phase,
    /// What is inconsistent
    pub reason: String,
}

impl ScanState {
    /// Create a fresh state in [`Phase::Init`].
    #[must_use]
    pub fn new(parameters: ScanParameters) -> Self {
        let now = Utc::now();
        Self {
            version: CHECKPOINT_VERSION,
            created_at: now,
            updated_at: now,
            parameters,
            phase: Phase::Init,
            disk: DiskScanProgress::default(),
            classify: ClassifyProgress::default(),
            archives: ArchiveScanProgress::default(),
            errors: BTreeMap::new(),
        }
    }

    /// Cursor of the current phase, if it has one.
    #[must_use]
    pub fn current_cursor(&self) -> Option<usize> {
        match self.phase {
            Phase::ScanningDisk => Some(self.disk.cursor),
            Phase::Classifying => Some(self.classify.cursor),
            Phase::ScanningArchives => Some(self.archives.cursor),
            _ => None,
        }
    }

    /// Number of records collected so far, disk and archive.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.disk.records.len() + self.archives.records.len()
    }

    /// Stamp the state as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record a per-item failure. Later failures for the same key win.
    pub fn record_error(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.errors.insert(key.into(), reason.into());
    }

    /// Check that the phase and the fields it depends on agree.
    ///
    /// # Errors
    ///
    /// Returns the first [`StateViolation`] found.
    pub fn validate(&self) -> Result<(), StateViolation> {
        let fail = |reason: String| {
            Err(StateViolation {
                phase: self.phase,
                reason,
            })
        };

        if self.version != CHECKPOINT_VERSION {
            return fail(format!("unsupported version {}", self.version));
        }

        match &self.disk.pending {
            Some(pending) if self.disk.cursor > pending.len() => {
                return fail(format!(
                    "disk cursor {} beyond {} pending paths",
                    self.disk.cursor,
                    pending.len()
                ));
            }
            None if self.disk.cursor > 0 || !self.disk.records.is_empty() => {
                return fail("disk progress without a materialized work list".to_string());
            }
            _ => {}
        }

        if self.classify.cursor > self.disk.records.len() {
            return fail(format!(
                "classify cursor {} beyond {} disk records",
                self.classify.cursor,
                self.disk.records.len()
            ));
        }

        match &self.archives.pending {
            Some(pending) if self.archives.cursor > pending.len() => {
                return fail(format!(
                    "archive cursor {} beyond {} pending archives",
                    self.archives.cursor,
                    pending.len()
                ));
            }
            None if self.archives.cursor > 0 || !self.archives.records.is_empty() => {
                return fail("archive progress without a materialized work list".to_string());
            }
            _ => {}
        }

        // Phases past a cursor-driven phase need that phase finished
        let disk_done = self
            .disk
            .pending
            .as_ref()
            .is_some_and(|p| self.disk.cursor == p.len());
        let classify_done = disk_done && self.classify.cursor == self.disk.records.len();
        let archives_done = self
            .archives
            .pending
            .as_ref()
            .is_some_and(|p| self.archives.cursor == p.len());

        if self.phase > Phase::ScanningDisk && !disk_done {
            return fail("disk scan not finished".to_string());
        }
        if self.phase > Phase::Classifying && !classify_done {
            return fail("classification not finished".to_string());
        }
        if self.phase > Phase::ScanningArchives && !archives_done {
            return fail("archive scan not finished".to_string());
        }
        if self.phase < Phase::ScanningArchives && self.archives.pending.is_some() {
            return fail("archive work list present before its phase".to_string());
        }

        Ok(())
    }
}
