use clap::Parser;
use dupescan::checkpoint::{CheckpointStore, ScanParameters, ScanState};
use dupescan::cli::Cli;
use dupescan::error::ExitCode;
use dupescan::output::ReportFormat;
use dupescan::run_app;
use dupescan::scanner::HashAlgorithm;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

struct Workspace {
    _dir: TempDir,
    root: PathBuf,
    checkpoint: PathBuf,
    config: PathBuf,
    base: PathBuf,
}

fn workspace() -> Workspace {
    let dir = tempdir().unwrap();
    let base = dir.path().to_path_buf();
    let root = base.join("root");
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::write(root.join("one.txt"), "same bytes").unwrap();
    fs::write(root.join("nested/two.txt"), "same bytes").unwrap();
    fs::write(root.join("three.txt"), "different").unwrap();
    Workspace {
        root,
        checkpoint: base.join("cp.json"),
        config: base.join("missing-config.toml"),
        base,
        _dir: dir,
    }
}

fn parse(ws: &Workspace, args: &[&str]) -> Cli {
    let config = ws.config.to_string_lossy().into_owned();
    let mut argv = vec!["dupescan", "-q", "--config", config.as_str()];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_scan_writes_json_report_and_clears_checkpoint() {
    let ws = workspace();
    let report = ws.base.join("report.json");

    let cli = parse(
        &ws,
        &[
            "scan",
            s(&ws.root),
            "-o",
            s(&report),
            "--checkpoint",
            s(&ws.checkpoint),
            "--format",
            "json",
            "--algorithm",
            "sha256",
            "--fresh",
        ],
    );
    let code = run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(!ws.checkpoint.exists());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["summary"]["total_files_scanned"], 3);
    assert_eq!(json["duplicates"].as_array().unwrap().len(), 1);
    assert_eq!(json["duplicates"][0]["files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_scan_writes_csv_report() {
    let ws = workspace();
    let report = ws.base.join("report.csv");

    let cli = parse(
        &ws,
        &[
            "scan",
            s(&ws.root),
            "-o",
            s(&report),
            "--checkpoint",
            s(&ws.checkpoint),
            "--format",
            "csv",
            "--algorithm",
            "blake3",
        ],
    );
    assert_eq!(run_app(cli).unwrap(), ExitCode::Success);

    let content = fs::read_to_string(&report).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("group_id,hash,container,path,size,category")
    );
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_scan_writes_html_report() {
    let ws = workspace();
    let report = ws.base.join("report.html");

    let cli = parse(
        &ws,
        &[
            "scan",
            s(&ws.root),
            "-o",
            s(&report),
            "--checkpoint",
            s(&ws.checkpoint),
            "--format",
            "html",
        ],
    );
    assert_eq!(run_app(cli).unwrap(), ExitCode::Success);

    let content = fs::read_to_string(&report).unwrap();
    assert!(content.starts_with("<!DOCTYPE html>"));
    assert!(content.contains("Duplicate Set 1"));
    assert!(!content.contains("Duplicate Set 2"));
}

#[test]
fn test_resume_keeps_checkpointed_report_format() {
    let ws = workspace();
    let report = ws.base.join("report.csv");
    let store = CheckpointStore::new(&ws.checkpoint);
    store
        .save(&ScanState::new(ScanParameters {
            root: ws.root.clone(),
            report_path: report.clone(),
            algorithm: HashAlgorithm::Sha256,
            report_format: ReportFormat::Csv,
        }))
        .unwrap();

    // No --format or -o: both come from the checkpoint
    let cli = parse(
        &ws,
        &["scan", s(&ws.root), "--checkpoint", s(&ws.checkpoint), "--resume"],
    );
    assert_eq!(run_app(cli).unwrap(), ExitCode::Success);

    let content = fs::read_to_string(&report).unwrap();
    assert!(content.starts_with("group_id,hash,container,path,size,category"));
    assert!(!ws.checkpoint.exists());
}

#[test]
fn test_resume_without_checkpoint_is_an_error() {
    let ws = workspace();
    let cli = parse(
        &ws,
        &[
            "scan",
            s(&ws.root),
            "--checkpoint",
            s(&ws.checkpoint),
            "--resume",
        ],
    );

    let err = run_app(cli).unwrap_err();
    assert!(format!("{err:#}").contains("No checkpoint to resume"));
}

#[test]
fn test_missing_root_fails_and_leaves_checkpoint() {
    let ws = workspace();
    let missing = ws.base.join("does-not-exist");
    let report = ws.base.join("report.json");

    let cli = parse(
        &ws,
        &[
            "scan",
            s(&missing),
            "-o",
            s(&report),
            "--checkpoint",
            s(&ws.checkpoint),
            "--fresh",
        ],
    );

    let err = run_app(cli).unwrap_err();
    assert!(format!("{err:#}").contains("Scan root unavailable"));
    assert!(!report.exists());

    let state = CheckpointStore::new(&ws.checkpoint)
        .load()
        .expect("best-effort checkpoint");
    assert_eq!(state.parameters.root, missing);
}

#[test]
fn test_status_and_clear() {
    let ws = workspace();
    let checkpoint = s(&ws.checkpoint).to_string();

    // Neither command needs an existing checkpoint
    let status = parse(&ws, &["status", "--checkpoint", &checkpoint]);
    assert_eq!(run_app(status).unwrap(), ExitCode::Success);
    let clear = parse(&ws, &["clear", "--checkpoint", &checkpoint]);
    assert_eq!(run_app(clear).unwrap(), ExitCode::Success);

    // A failed scan leaves one behind for status to describe
    let missing = ws.base.join("gone");
    let scan = parse(
        &ws,
        &["scan", s(&missing), "--checkpoint", &checkpoint, "--fresh"],
    );
    assert!(run_app(scan).is_err());
    assert!(ws.checkpoint.exists());

    let store = CheckpointStore::new(&ws.checkpoint);
    let text = dupescan::describe_checkpoint(&store);
    assert!(text.contains("Phase:      scanning_disk"), "{text}");

    let clear = parse(&ws, &["clear", "--checkpoint", &checkpoint]);
    assert_eq!(run_app(clear).unwrap(), ExitCode::Success);
    assert!(!ws.checkpoint.exists());
}
