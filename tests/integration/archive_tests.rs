use dupescan::checkpoint::{CheckpointStore, ScanParameters};
use dupescan::orchestrator::{RunOutcome, ScanOrchestrator, StartMode};
use dupescan::output::{ReportFormat, ScanReport};
use dupescan::scanner::{member_key, HashAlgorithm};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
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

fn scan(dir: &TempDir, root: &Path) -> ScanReport {
    let params = ScanParameters {
        root: root.to_path_buf(),
        report_path: dir.path().join("report.json"),
        algorithm: HashAlgorithm::Sha256,
        report_format: ReportFormat::Json,
    };
    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
    let mut engine = ScanOrchestrator::start(store.clone(), params, StartMode::Fresh).unwrap();
    match engine.run().unwrap() {
        RunOutcome::Completed(report) => {
            assert!(!store.exists());
            report
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn test_same_member_name_in_two_archives_collapses() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    write_zip(&root.join("one.zip"), &[("readme.txt", b"shared readme")]);
    write_zip(
        &root.join("two.zip"),
        &[("readme.txt", b"shared readme"), ("extra.txt", b"x")],
    );

    let report = scan(&dir, &root);

    // Members are identified by entry name alone, so the two readmes are one record
    assert!(report.duplicate_groups.is_empty());
    assert_eq!(report.total_files_scanned, 5);
}

#[test]
fn test_member_matches_loose_file_with_same_content() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    write_zip(&root.join("one.zip"), &[("readme.txt", b"shared readme")]);
    fs::write(root.join("copy.txt"), b"shared readme").unwrap();

    let report = scan(&dir, &root);

    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(
        report.duplicate_groups[0].display_paths(),
        vec![
            format!("{}/copy.txt", root.display()),
            format!("{}/one.zip/readme.txt", root.display()),
        ]
    );
}

#[test]
fn test_copied_archive_groups_container_and_members() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    write_zip(&root.join("a.zip"), &[("data.bin", b"payload")]);
    fs::copy(root.join("a.zip"), root.join("b.zip")).unwrap();

    let report = scan(&dir, &root);

    // The containers match; their members share an entry name and collapse
    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(
        report.duplicate_groups[0].display_paths(),
        vec![
            format!("{}/a.zip", root.display()),
            format!("{}/b.zip", root.display()),
        ]
    );
    assert_eq!(report.total_files_scanned, 4);
}

#[test]
fn test_nested_archive_is_fingerprinted_not_expanded() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();

    let inner = dir.path().join("inner.zip");
    write_zip(&inner, &[("deep.txt", b"deep")]);
    let inner_bytes = fs::read(&inner).unwrap();
    write_zip(&root.join("outer.zip"), &[("inner.zip", &inner_bytes)]);

    let report = scan(&dir, &root);

    // outer.zip on disk plus its one member; deep.txt is never reached
    assert_eq!(report.total_files_scanned, 2);
    assert!(report.duplicate_groups.is_empty());
}

#[test]
fn test_partial_archive_failure_keeps_good_members() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("good.txt"), b"good member").unwrap();

    let zip_path = root.join("partial.zip");
    write_zip(
        &zip_path,
        &[
            ("good.txt", b"good member"),
            ("bad.txt", b"CORRUPTME-bad-member"),
        ],
    );
    let mut bytes = fs::read(&zip_path).unwrap();
    let marker = b"CORRUPTME";
    let pos = bytes
        .windows(marker.len())
        .position(|w| w == marker)
        .unwrap();
    bytes[pos] = b'X';
    fs::write(&zip_path, bytes).unwrap();

    let report = scan(&dir, &root);

    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(report.duplicate_groups[0].len(), 2);
    let key = member_key(&zip_path.to_string_lossy(), "bad.txt");
    assert!(report.errors.contains_key(&key), "{:?}", report.errors);
    assert_eq!(report.errors.len(), 1);
}

#[test]
fn test_zip_extension_without_zip_content_is_a_plain_file() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("notes.zip"), b"plain text").unwrap();
    fs::write(root.join("notes.txt"), b"plain text").unwrap();

    let report = scan(&dir, &root);

    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(report.total_files_scanned, 2);
    assert!(report.errors.is_empty());
}
