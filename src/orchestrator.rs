//! The resumable scan engine.
//!
//! # Overview
//!
//! [`ScanOrchestrator`] drives a [`ScanState`] through the fixed phase
//! sequence:
//!
//! ```text
//! INIT -> SCANNING_DISK -> CLASSIFYING -> SCANNING_ARCHIVES
//!      -> FINDING_DUPLICATES -> REPORTING -> COMPLETED
//! ```
//!
//! The three cursor-driven phases share one loop shape: materialize the work
//! list once, then for each item poll the [`CancelToken`], process the item,
//! append its result and advance the cursor in the same step. A cancelled
//! run saves a checkpoint whose cursor points at the next unprocessed item
//! and returns [`RunOutcome::Paused`]. A phase-fatal error saves a
//! best-effort checkpoint and is returned as [`EngineError`]. Completing the
//! report deletes the checkpoint.
//!
//! Per-item failures (unreadable files, broken archive entries) never stop a
//! phase; they land in [`ScanState::errors`].
//!
//! # Example
//!
//! ```no_run
//! use dupescan::checkpoint::{CheckpointStore, ScanParameters};
//! use dupescan::orchestrator::{RunOutcome, ScanOrchestrator, StartMode};
//! use dupescan::output::ReportFormat;
//! use dupescan::scanner::HashAlgorithm;
//!
//! let store = CheckpointStore::new("checkpoint.json");
//! let params = ScanParameters {
//!     root: "/data".into(),
//!     report_path: "report.json".into(),
//!     algorithm: HashAlgorithm::Sha256,
//!     report_format: ReportFormat::Json,
//! };
//!
//! let mut engine = ScanOrchestrator::start(store, params, StartMode::Continue).unwrap();
//! match engine.run().unwrap() {
//!     RunOutcome::Completed(report) => println!("{} groups", report.duplicate_groups.len()),
//!     RunOutcome::Paused { phase, cursor, .. } => println!("paused in {phase} at {cursor}"),
//! }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::checkpoint::{
    CheckpointError, CheckpointStore, Phase, ScanParameters, ScanState, StateViolation,
};
use crate::classify::{Classifier, ExtensionClassifier};
use crate::duplicates::{index_duplicates, DuplicateGroup};
use crate::output::{reporter_for, ReportError, Reporter, ScanReport};
use crate::progress::{ProgressCallback, ENUMERATING};
use crate::scanner::archive::check_archive;
use crate::scanner::{expand_archive, FileRecord, Fingerprinter, ScanError, Walker};
use crate::signal::CancelToken;

/// Reason recorded for archive candidates that cannot be opened.
pub const ARCHIVE_PERMISSION_DENIED: &str = "Permission denied to read archive for content scanning";

/// How to treat an existing checkpoint when starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Delete any checkpoint and start over.
    Fresh,
    /// Continue from the checkpoint; it must exist.
    Resume,
    /// Start a new scan, leaving any stale checkpoint until this run pauses
    /// or completes.
    Continue,
}

/// Errors that abort a run.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Resume was requested but there is no usable checkpoint.
    #[error("No checkpoint to resume at {0}")]
    NoCheckpoint(PathBuf),

    /// The scan root cannot be walked at all.
    #[error("Scan root unavailable: {0}")]
    RootUnavailable(#[source] ScanError),

    /// The persisted phase and fields disagree.
    #[error("Scan state corrupted: {0}")]
    StateCorrupted(#[from] StateViolation),

    /// The reporter failed.
    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),

    /// A checkpoint could not be deleted when starting fresh.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// How a run ended without an error.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every phase finished; the report was rendered.
    Completed(ScanReport),
    /// Cancellation stopped the run.
    Paused {
        /// Phase that was interrupted
        phase: Phase,
        /// Next unprocessed item of that phase
        cursor: usize,
        /// Whether the checkpoint write succeeded
        checkpoint_saved: bool,
    },
}

enum PhaseStatus {
    Finished,
    Suspended,
}

/// Build the state a run starts from.
///
/// # Errors
///
/// Returns [`EngineError::NoCheckpoint`] when resuming without a checkpoint,
/// or [`EngineError::Checkpoint`] when a fresh start cannot delete the old one.
pub fn prepare_state(
    store: &CheckpointStore,
    params: ScanParameters,
    mode: StartMode,
) -> Result<ScanState, EngineError> {
    match mode {
        StartMode::Fresh => {
            store.clear()?;
            Ok(ScanState::new(params))
        }
        StartMode::Resume => {
            let state = store
                .load()
                .ok_or_else(|| EngineError::NoCheckpoint(store.path().to_path_buf()))?;
            warn_on_mismatch(&state.parameters, &params);
            log::info!(
                "Resuming scan of {} at phase {}",
                state.parameters.root.display(),
                state.phase
            );
            Ok(state)
        }
        StartMode::Continue => {
            if store.exists() {
                log::info!(
                    "Checkpoint at {} left in place; pass --resume to continue it or --fresh to discard it",
                    store.path().display()
                );
            }
            Ok(ScanState::new(params))
        }
    }
}

fn warn_on_mismatch(persisted: &ScanParameters, requested: &ScanParameters) {
    if persisted.root != requested.root {
        log::warn!(
            "Checkpoint was created for {}, ignoring requested root {}",
            persisted.root.display(),
            requested.root.display()
        );
    }
    if persisted.report_path != requested.report_path {
        log::warn!(
            "Checkpoint reports to {}, ignoring requested output {}",
            persisted.report_path.display(),
            requested.report_path.display()
        );
    }
    if persisted.algorithm != requested.algorithm {
        log::warn!(
            "Checkpoint uses {} fingerprints, ignoring requested {}",
            persisted.algorithm,
            requested.algorithm
        );
    }
    if persisted.report_format != requested.report_format {
        log::warn!(
            "Checkpoint writes a {} report, ignoring requested format {}",
            persisted.report_format,
            requested.report_format
        );
    }
}

/// The phase state machine.
pub struct ScanOrchestrator {
    state: ScanState,
    store: CheckpointStore,
    fingerprinter: Fingerprinter,
    classifier: Box<dyn Classifier>,
    reporter: Box<dyn Reporter>,
    cancel: CancelToken,
    progress: Option<Arc<dyn ProgressCallback>>,
    archive_extensions: Vec<String>,
    groups: Option<Vec<DuplicateGroup>>,
    report: Option<ScanReport>,
}

impl ScanOrchestrator {
    /// Create an orchestrator over an existing state.
    ///
    /// The fingerprint algorithm and the report format always come from the
    /// state's parameters.
    #[must_use]
    pub fn new(state: ScanState, store: CheckpointStore) -> Self {
        Self {
            fingerprinter: Fingerprinter::new(state.parameters.algorithm),
            reporter: reporter_for(state.parameters.report_format),
            state,
            store,
            classifier: Box::new(ExtensionClassifier),
            cancel: CancelToken::new(),
            progress: None,
            archive_extensions: vec!["zip".to_string()],
            groups: None,
            report: None,
        }
    }

    /// [`prepare_state`] followed by [`ScanOrchestrator::new`].
    ///
    /// # Errors
    ///
    /// See [`prepare_state`].
    pub fn start(
        store: CheckpointStore,
        params: ScanParameters,
        mode: StartMode,
    ) -> Result<Self, EngineError> {
        let state = prepare_state(&store, params, mode)?;
        Ok(Self::new(state, store))
    }

    /// Set the classifier.
    #[must_use]
    pub fn with_classifier<C: Classifier + 'static>(mut self, classifier: C) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Set the cancellation token polled between work units.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Set which extensions mark archive candidates (lowercase, no dot).
    #[must_use]
    pub fn with_archive_extensions(mut self, extensions: Vec<String>) -> Self {
        self.archive_extensions = extensions;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Consume the orchestrator, returning its state.
    #[must_use]
    pub fn into_state(self) -> ScanState {
        self.state
    }

    /// Run phases until completion, cancellation or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for phase-fatal failures, after attempting to
    /// save a checkpoint at the current phase and cursor.
    pub fn run(&mut self) -> Result<RunOutcome, EngineError> {
        if let Err(violation) = self.state.validate() {
            log::error!("Refusing to run inconsistent state: {}", violation);
            return Err(self.fail(violation.into()));
        }

        loop {
            let phase = self.state.phase;
            let status = match phase {
                Phase::Init => Ok(PhaseStatus::Finished),
                Phase::ScanningDisk => self.scan_disk(),
                Phase::Classifying => Ok(self.classify()),
                Phase::ScanningArchives => Ok(self.scan_archives()),
                Phase::FindingDuplicates => Ok(self.find_duplicates()),
                Phase::Reporting => self.report(),
                Phase::Completed => {
                    let report = match self.report.take() {
                        Some(report) => report,
                        None => {
                            let groups = self.collect_groups();
                            self.build_report(groups)
                        }
                    };
                    return Ok(RunOutcome::Completed(report));
                }
            };

            match status {
                Ok(PhaseStatus::Finished) => {
                    self.state.phase = phase.next();
                    log::info!("Phase {} complete, entering {}", phase, self.state.phase);
                }
                Ok(PhaseStatus::Suspended) => return Ok(self.pause()),
                Err(e) => {
                    log::error!("Phase {} failed: {}", phase, e);
                    return Err(self.fail(e));
                }
            }
        }
    }

    fn pause(&mut self) -> RunOutcome {
        let phase = self.state.phase;
        let cursor = self.state.current_cursor().unwrap_or(0);
        log::info!("Scan paused in phase {} at item {}", phase, cursor);
        self.state.touch();

        let checkpoint_saved = match self.store.save(&self.state) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save checkpoint in phase {}: {}", phase, e);
                false
            }
        };

        RunOutcome::Paused {
            phase,
            cursor,
            checkpoint_saved,
        }
    }

    fn fail(&mut self, error: EngineError) -> EngineError {
        self.state.touch();
        if let Err(e) = self.store.save(&self.state) {
            log::error!(
                "Failed to save checkpoint after error in phase {}: {}",
                self.state.phase,
                e
            );
        }
        error
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn notify_start(&self, phase: &str, total: usize) {
        if let Some(progress) = &self.progress {
            progress.on_phase_start(phase, total);
        }
    }

    fn notify_item(&self, current: usize, item: &str) {
        if let Some(progress) = &self.progress {
            progress.on_progress(current, item);
        }
    }

    fn notify_completed(&self, bytes: u64) {
        if let Some(progress) = &self.progress {
            progress.on_item_completed(bytes);
        }
    }

    fn notify_end(&self, phase: &str) {
        if let Some(progress) = &self.progress {
            progress.on_phase_end(phase);
        }
    }

    fn enumerate(&mut self) -> Result<Vec<PathBuf>, EngineError> {
        let walker = Walker::new(&self.state.parameters.root);
        walker.check_root().map_err(EngineError::RootUnavailable)?;

        self.notify_start(ENUMERATING, 0);
        let mut pending = Vec::new();
        for entry in walker.walk() {
            match entry {
                Ok(path) => {
                    pending.push(path);
                    if let Some(path) = pending.last() {
                        self.notify_item(pending.len(), &path.to_string_lossy());
                    }
                }
                Err(e) => {
                    log::debug!("Enumeration error: {}", e);
                    self.state
                        .record_error(e.path().to_string_lossy(), e.to_string());
                }
            }
        }
        self.notify_end(ENUMERATING);

        log::info!("Enumerated {} files", pending.len());
        Ok(pending)
    }

    fn scan_disk(&mut self) -> Result<PhaseStatus, EngineError> {
        if self.state.disk.pending.is_none() {
            let pending = self.enumerate()?;
            self.state.disk.pending = Some(pending);
            self.state.disk.cursor = 0;
        }

        let phase = Phase::ScanningDisk.name();
        let total = self.state.disk.pending.as_ref().map_or(0, Vec::len);
        self.notify_start(phase, total);

        while self.state.disk.cursor < total {
            if self.cancelled() {
                self.notify_end(phase);
                return Ok(PhaseStatus::Suspended);
            }

            let cursor = self.state.disk.cursor;
            let Some(path) = self
                .state
                .disk
                .pending
                .as_ref()
                .and_then(|p| p.get(cursor))
                .cloned()
            else {
                break;
            };
            self.notify_item(cursor + 1, &path.to_string_lossy());

            let bytes = match self.fingerprinter.fingerprint_file(&path) {
                Ok((digest, size)) => {
                    self.state
                        .disk
                        .records
                        .push(FileRecord::from_disk(&path, size, digest));
                    size
                }
                Err(e) => {
                    log::debug!("Skipping {}: {}", path.display(), e);
                    self.state.record_error(path.to_string_lossy(), e.reason());
                    0
                }
            };
            self.state.disk.cursor += 1;
            self.notify_completed(bytes);
        }

        self.notify_end(phase);
        Ok(PhaseStatus::Finished)
    }

    fn classify(&mut self) -> PhaseStatus {
        let phase = Phase::Classifying.name();
        let total = self.state.disk.records.len();
        self.notify_start(phase, total);

        while self.state.classify.cursor < total {
            if self.cancelled() {
                self.notify_end(phase);
                return PhaseStatus::Suspended;
            }

            let cursor = self.state.classify.cursor;
            self.notify_item(cursor + 1, &self.state.disk.records[cursor].path);

            let record = &mut self.state.disk.records[cursor];
            if record.category.is_none() {
                self.classifier.classify(record).apply_to(record);
            }
            self.state.classify.cursor += 1;
            self.notify_completed(0);
        }

        self.notify_end(phase);
        PhaseStatus::Finished
    }

    fn is_archive_candidate(&self, record: &FileRecord) -> bool {
        record
            .extension
            .as_deref()
            .is_some_and(|ext| self.archive_extensions.iter().any(|a| a == ext))
    }

    fn archive_candidates(&mut self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        let mut failures = Vec::new();

        for record in &self.state.disk.records {
            if !self.is_archive_candidate(record) {
                continue;
            }
            let path = record.disk_path();
            match check_archive(&path) {
                Ok(true) => candidates.push(path),
                Ok(false) => log::debug!("{} is not a ZIP container", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    failures.push((record.path.clone(), ARCHIVE_PERMISSION_DENIED.to_string()));
                }
                Err(e) => {
                    failures.push((record.path.clone(), format!("Could not open archive: {e}")));
                }
            }
        }

        for (key, reason) in failures {
            self.state.record_error(key, reason);
        }
        log::info!("Found {} archives to scan", candidates.len());
        candidates
    }

    fn scan_archives(&mut self) -> PhaseStatus {
        if self.state.archives.pending.is_none() {
            let candidates = self.archive_candidates();
            self.state.archives.pending = Some(candidates);
            self.state.archives.cursor = 0;
        }

        let phase = Phase::ScanningArchives.name();
        let total = self.state.archives.pending.as_ref().map_or(0, Vec::len);
        self.notify_start(phase, total);

        while self.state.archives.cursor < total {
            if self.cancelled() {
                self.notify_end(phase);
                return PhaseStatus::Suspended;
            }

            let cursor = self.state.archives.cursor;
            let Some(container) = self
                .state
                .archives
                .pending
                .as_ref()
                .and_then(|p| p.get(cursor))
                .cloned()
            else {
                break;
            };
            self.notify_item(cursor + 1, &container.to_string_lossy());

            let expansion = expand_archive(&container, &self.fingerprinter);
            let bytes: u64 = expansion.records.iter().map(|r| r.size).sum();
            self.state.archives.records.extend(expansion.records);
            self.state.errors.extend(expansion.errors);
            self.state.archives.cursor += 1;
            self.notify_completed(bytes);
        }

        self.notify_end(phase);
        PhaseStatus::Finished
    }

    /// Disk and archive records merged by identity, then grouped.
    fn collect_groups(&self) -> Vec<DuplicateGroup> {
        let merged: BTreeSet<&FileRecord> = self
            .state
            .disk
            .records
            .iter()
            .chain(&self.state.archives.records)
            .collect();
        let (groups, stats) = index_duplicates(merged);
        log::info!(
            "Found {} duplicate groups ({} files)",
            stats.duplicate_groups,
            stats.duplicate_files
        );
        groups
    }

    fn find_duplicates(&mut self) -> PhaseStatus {
        self.groups = Some(self.collect_groups());
        PhaseStatus::Finished
    }

    fn build_report(&self, groups: Vec<DuplicateGroup>) -> ScanReport {
        let records = self
            .state
            .disk
            .records
            .iter()
            .chain(&self.state.archives.records);
        ScanReport {
            scanned_directory: self.state.parameters.root.to_string_lossy().into_owned(),
            total_files_scanned: self.state.record_count(),
            total_size_scanned: records.map(|r| r.size).sum(),
            duplicate_groups: groups,
            errors: self.state.errors.clone(),
        }
    }

    fn report(&mut self) -> Result<PhaseStatus, EngineError> {
        // Groups are not persisted; a resumed run recomputes them
        let groups = match self.groups.take() {
            Some(groups) => groups,
            None => self.collect_groups(),
        };
        let report = self.build_report(groups);
        let destination: &Path = &self.state.parameters.report_path;

        if let Err(e) = self.reporter.render(&report, destination) {
            // Keep the groups so a retry in this process does not recompute
            self.groups = Some(report.duplicate_groups);
            return Err(e.into());
        }

        if let Err(e) = self.store.clear() {
            log::error!("Report written but checkpoint could not be deleted: {}", e);
        }
        self.report = Some(report);
        Ok(PhaseStatus::Finished)
    }
}
