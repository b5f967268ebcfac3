use dupescan::checkpoint::{CheckpointStore, Phase, ScanParameters};
use dupescan::orchestrator::{RunOutcome, ScanOrchestrator, StartMode};
use dupescan::output::{ReportFormat, ScanReport};
use dupescan::progress::ProgressCallback;
use dupescan::scanner::HashAlgorithm;
use dupescan::signal::CancelToken;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Requests cancellation after every finished work item.
struct StopAfterEachItem {
    token: CancelToken,
}

impl ProgressCallback for StopAfterEachItem {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}
    fn on_progress(&self, _current: usize, _item: &str) {}
    fn on_item_completed(&self, _bytes: u64) {
        self.token.cancel();
    }
    fn on_phase_end(&self, _phase: &str) {}
}

fn create_tree() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir_all(root.join("docs/old")).unwrap();
    fs::write(root.join("docs/a.md"), "# notes").unwrap();
    fs::write(root.join("docs/old/a.md"), "# notes").unwrap();
    fs::write(root.join("empty1"), "").unwrap();
    fs::write(root.join("empty2"), "").unwrap();
    fs::write(root.join("solo.bin"), [0u8, 1, 2, 3]).unwrap();

    let mut zip = ZipWriter::new(File::create(root.join("pack.zip")).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("copy.md", options).unwrap();
    zip.write_all(b"# notes").unwrap();
    zip.start_file("blob.bin", options).unwrap();
    zip.write_all(&[0u8, 1, 2, 3]).unwrap();
    zip.finish().unwrap();

    (dir, root)
}

fn params(root: &Path, report: PathBuf) -> ScanParameters {
    ScanParameters {
        root: root.to_path_buf(),
        report_path: report,
        algorithm: HashAlgorithm::Sha256,
        report_format: ReportFormat::Json,
    }
}

fn uninterrupted(dir: &TempDir, root: &Path) -> ScanReport {
    let store = CheckpointStore::new(dir.path().join("baseline.json"));
    let mut engine = ScanOrchestrator::start(
        store,
        params(root, dir.path().join("baseline-report.json")),
        StartMode::Fresh,
    )
    .unwrap();
    match engine.run().unwrap() {
        RunOutcome::Completed(report) => report,
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn test_one_item_per_run_matches_uninterrupted_scan() {
    let (dir, root) = create_tree();
    let baseline = uninterrupted(&dir, &root);

    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
    let report_path = dir.path().join("report.json");
    let token = CancelToken::new();
    let callback = Arc::new(StopAfterEachItem {
        token: token.clone(),
    });

    let mut mode = StartMode::Fresh;
    let mut pauses = Vec::new();
    let report = loop {
        assert!(pauses.len() < 100, "scan never finished");
        token.reset();
        let mut engine =
            ScanOrchestrator::start(store.clone(), params(&root, report_path.clone()), mode)
                .unwrap()
                .with_cancel_token(token.clone())
                .with_progress_callback(callback.clone());

        match engine.run().unwrap() {
            RunOutcome::Completed(report) => break report,
            RunOutcome::Paused {
                phase,
                cursor,
                checkpoint_saved,
            } => {
                assert!(checkpoint_saved);
                pauses.push((phase, cursor));
                mode = StartMode::Resume;
            }
        }
    };

    assert_eq!(report.duplicate_groups, baseline.duplicate_groups);
    assert_eq!(report.total_files_scanned, baseline.total_files_scanned);
    assert_eq!(report.total_size_scanned, baseline.total_size_scanned);
    assert_eq!(report.errors, baseline.errors);
    assert!(report_path.exists());
    assert!(!store.exists());

    // Every cursor-driven phase was interrupted at least once
    for phase in [Phase::ScanningDisk, Phase::Classifying, Phase::ScanningArchives] {
        assert!(pauses.iter().any(|(p, _)| *p == phase), "{pauses:?}");
    }
    // Cursors only move forward within a phase
    for pair in pauses.windows(2) {
        let ((p1, c1), (p2, c2)) = (pair[0], pair[1]);
        assert!(p1 < p2 || (p1 == p2 && c1 < c2), "{pauses:?}");
    }
}

#[test]
fn test_groups_match_expected_content() {
    let (dir, root) = create_tree();
    let report = uninterrupted(&dir, &root);

    let mut sizes: Vec<usize> = report.duplicate_groups.iter().map(|g| g.len()).collect();
    sizes.sort_unstable();
    // empty files, the 4-byte blob, and the three copies of the notes
    assert_eq!(sizes, vec![2, 2, 3]);

    let notes = report
        .duplicate_groups
        .iter()
        .find(|g| g.len() == 3)
        .unwrap();
    assert!(notes
        .display_paths()
        .contains(&format!("{}/pack.zip/copy.md", root.display())));
}

#[test]
fn test_continue_mode_replaces_stale_checkpoint_on_completion() {
    let (dir, root) = create_tree();
    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
    let report_path = dir.path().join("report.json");

    let token = CancelToken::new();
    token.cancel();
    let mut paused = ScanOrchestrator::start(
        store.clone(),
        params(&root, report_path.clone()),
        StartMode::Fresh,
    )
    .unwrap()
    .with_cancel_token(token);
    assert!(matches!(paused.run().unwrap(), RunOutcome::Paused { .. }));
    assert!(store.exists());

    let mut fresh_run =
        ScanOrchestrator::start(store.clone(), params(&root, report_path), StartMode::Continue)
            .unwrap();
    assert_eq!(fresh_run.state().phase, Phase::Init);
    assert!(matches!(fresh_run.run().unwrap(), RunOutcome::Completed(_)));
    assert!(!store.exists());
}
