use dupescan::checkpoint::{CheckpointStore, Phase, ScanParameters};
use dupescan::orchestrator::{RunOutcome, ScanOrchestrator, StartMode};
use dupescan::output::ReportFormat;
use dupescan::progress::ProgressCallback;
use dupescan::scanner::HashAlgorithm;
use dupescan::signal::CancelToken;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

/// Cancels once the archive phase has completed `after` archives.
struct CancelInArchives {
    token: CancelToken,
    after: usize,
    in_archives: AtomicUsize,
    completed: AtomicUsize,
}

impl ProgressCallback for CancelInArchives {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        let active = usize::from(phase == Phase::ScanningArchives.name());
        self.in_archives.store(active, Ordering::SeqCst);
        if active == 1 && self.after == 0 {
            self.token.cancel();
        }
    }

    fn on_progress(&self, _current: usize, _item: &str) {}

    fn on_item_completed(&self, _bytes: u64) {
        if self.in_archives.load(Ordering::SeqCst) == 1 {
            let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
            if done == self.after {
                self.token.cancel();
            }
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

fn setup() -> (TempDir, ScanParameters, CheckpointStore) {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    write_zip(&root.join("first.zip"), &[("m.txt", b"member"), ("n.txt", b"n")]);
    write_zip(&root.join("second.zip"), &[("m.txt", b"member")]);
    fs::write(root.join("loose.txt"), b"member").unwrap();

    let params = ScanParameters {
        root,
        report_path: dir.path().join("out/report.json"),
        algorithm: HashAlgorithm::Blake3,
        report_format: ReportFormat::Json,
    };
    let store = CheckpointStore::new(dir.path().join("state/checkpoint.json"));
    (dir, params, store)
}

#[test]
fn test_checkpoint_mid_archives_round_trips_members() {
    let (_dir, params, store) = setup();
    let token = CancelToken::new();
    let callback = Arc::new(CancelInArchives {
        token: token.clone(),
        after: 1,
        in_archives: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    });

    let mut engine = ScanOrchestrator::start(store.clone(), params.clone(), StartMode::Fresh)
        .unwrap()
        .with_cancel_token(token)
        .with_progress_callback(callback);

    match engine.run().unwrap() {
        RunOutcome::Paused {
            phase,
            cursor,
            checkpoint_saved,
        } => {
            assert_eq!(phase, Phase::ScanningArchives);
            assert_eq!(cursor, 1);
            assert!(checkpoint_saved);
        }
        other => panic!("expected pause, got {other:?}"),
    }

    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("\"checksum\""));
    assert!(raw.contains("SCANNING_ARCHIVES"));

    let loaded = store.load().expect("checkpoint should load");
    assert_eq!(loaded.parameters, params);
    assert_eq!(loaded.phase, Phase::ScanningArchives);
    assert_eq!(loaded.archives.cursor, 1);
    assert_eq!(loaded.archives.pending.as_ref().map(Vec::len), Some(2));
    assert_eq!(loaded.disk.records.len(), 3);
    assert!(loaded.disk.records.iter().all(|r| r.category.is_some()));

    // first.zip sorts before second.zip, so its two members are in
    assert_eq!(loaded.archives.records.len(), 2);
    let first = params.root.join("first.zip");
    assert!(loaded
        .archives
        .records
        .iter()
        .all(|r| r.container_path.as_deref() == Some(first.to_string_lossy().as_ref())));
    assert_eq!(loaded.archives.records, engine.state().archives.records);
}

#[test]
fn test_resume_from_archive_checkpoint_completes() {
    let (_dir, params, store) = setup();
    let token = CancelToken::new();
    let callback = Arc::new(CancelInArchives {
        token: token.clone(),
        after: 0,
        in_archives: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    });

    let mut engine = ScanOrchestrator::start(store.clone(), params.clone(), StartMode::Fresh)
        .unwrap()
        .with_cancel_token(token)
        .with_progress_callback(callback);
    assert!(matches!(
        engine.run().unwrap(),
        RunOutcome::Paused {
            phase: Phase::ScanningArchives,
            cursor: 0,
            ..
        }
    ));

    let mut resumed = ScanOrchestrator::start(store.clone(), params.clone(), StartMode::Resume)
        .unwrap();
    let report = match resumed.run().unwrap() {
        RunOutcome::Completed(report) => report,
        other => panic!("expected completion, got {other:?}"),
    };

    // second.zip/m.txt shares its entry name with first.zip/m.txt and collapses
    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(
        report.duplicate_groups[0].display_paths(),
        vec![
            format!("{}/loose.txt", params.root.display()),
            format!("{}/first.zip/m.txt", params.root.display()),
        ]
    );
    assert_eq!(report.total_files_scanned, 6);
    assert!(params.report_path.exists());
    assert!(!store.exists());
}

#[test]
fn test_corrupted_checkpoint_blocks_resume_but_not_fresh() {
    let (_dir, params, store) = setup();
    fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    fs::write(store.path(), "{ \"checksum\": \"00\", \"state\": {}").unwrap();

    assert!(store.load().is_none());
    assert!(ScanOrchestrator::start(store.clone(), params.clone(), StartMode::Resume).is_err());

    let mut engine = ScanOrchestrator::start(store.clone(), params, StartMode::Fresh).unwrap();
    assert!(matches!(engine.run().unwrap(), RunOutcome::Completed(_)));
    assert!(!store.exists());
}
