#![cfg(unix)]

use dupescan::checkpoint::{CheckpointStore, Phase, ScanParameters};
use dupescan::orchestrator::{RunOutcome, ScanOrchestrator, StartMode, ARCHIVE_PERMISSION_DENIED};
use dupescan::output::{ReportFormat, ScanReport};
use dupescan::progress::ProgressCallback;
use dupescan::scanner::HashAlgorithm;
use dupescan::signal::CancelToken;
use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Cancels as soon as `phase` starts.
struct CancelOnPhase {
    token: CancelToken,
    phase: &'static str,
}

impl ProgressCallback for CancelOnPhase {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        if phase == self.phase {
            self.token.cancel();
        }
    }
    fn on_progress(&self, _current: usize, _item: &str) {}
    fn on_item_completed(&self, _bytes: u64) {}
    fn on_phase_end(&self, _phase: &str) {}
}

fn set_mode(path: &Path, mode: u32) {
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms).unwrap();
}

/// Root bypasses file modes, which makes these scenarios unobservable.
fn permissions_enforced(locked: &Path) -> bool {
    File::open(locked).is_err()
}

fn params(dir: &TempDir, root: &Path) -> ScanParameters {
    ScanParameters {
        root: root.to_path_buf(),
        report_path: dir.path().join("report.json"),
        algorithm: HashAlgorithm::Sha256,
        report_format: ReportFormat::Json,
    }
}

fn complete(engine: &mut ScanOrchestrator) -> ScanReport {
    match engine.run().unwrap() {
        RunOutcome::Completed(report) => report,
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn test_unreadable_file_is_recorded_and_scan_continues() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), "same").unwrap();
    fs::write(root.join("b.txt"), "same").unwrap();
    let locked = root.join("locked.txt");
    fs::write(&locked, "same").unwrap();
    set_mode(&locked, 0o000);

    if !permissions_enforced(&locked) {
        set_mode(&locked, 0o644);
        return;
    }

    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
    let mut engine = ScanOrchestrator::start(store, params(&dir, &root), StartMode::Fresh).unwrap();
    let report = complete(&mut engine);

    set_mode(&locked, 0o644);

    let key = locked.to_string_lossy().into_owned();
    assert_eq!(report.errors.get(&key).map(String::as_str), Some("Permission denied"));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.total_files_scanned, 2);
    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(
        report.duplicate_groups[0].display_paths(),
        vec![
            format!("{}/a.txt", root.display()),
            format!("{}/b.txt", root.display()),
        ]
    );
}

#[test]
fn test_archive_unreadable_before_expansion_is_recorded() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("loose.txt"), "payload").unwrap();
    let zip_path = root.join("bundle.zip");
    let mut zip = ZipWriter::new(File::create(&zip_path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("x.txt", options).unwrap();
    zip.write_all(b"payload").unwrap();
    zip.finish().unwrap();

    // Fingerprint the archive on disk, then lose access before it is opened
    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
    let token = CancelToken::new();
    let mut engine = ScanOrchestrator::start(store.clone(), params(&dir, &root), StartMode::Fresh)
        .unwrap()
        .with_cancel_token(token.clone())
        .with_progress_callback(Arc::new(CancelOnPhase {
            token,
            phase: Phase::Classifying.name(),
        }));
    assert!(matches!(
        engine.run().unwrap(),
        RunOutcome::Paused {
            phase: Phase::Classifying,
            checkpoint_saved: true,
            ..
        }
    ));

    set_mode(&zip_path, 0o000);
    if !permissions_enforced(&zip_path) {
        set_mode(&zip_path, 0o644);
        return;
    }

    let mut resumed =
        ScanOrchestrator::start(store.clone(), params(&dir, &root), StartMode::Resume).unwrap();
    let report = complete(&mut resumed);

    set_mode(&zip_path, 0o644);

    let key = zip_path.to_string_lossy().into_owned();
    assert_eq!(
        report.errors.get(&key).map(String::as_str),
        Some(ARCHIVE_PERMISSION_DENIED)
    );
    assert_eq!(report.errors.len(), 1);
    assert!(resumed.state().archives.records.is_empty());
    // loose.txt and the container itself; the member was never read
    assert_eq!(report.total_files_scanned, 2);
    assert!(report.duplicate_groups.is_empty());
    assert!(!store.exists());
}
