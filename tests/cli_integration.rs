//! CLI integration tests

mod common;

use assert_cmd::Command;
use common::{page_texts, watermarked};
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("pdf-watermark-remover").unwrap()
}

#[test]
fn test_help_lists_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn test_detect_prints_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.pdf");
    std::fs::write(&input, watermarked(5, "CONFIDENTIAL DRAFT")).unwrap();

    cmd()
        .arg("detect")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("CONFIDENTIAL DRAFT"));
}

#[test]
fn test_detect_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.pdf");
    std::fs::write(&input, watermarked(3, "SAMPLE COPY")).unwrap();

    let output = cmd().arg("detect").arg(&input).arg("--json").output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["page_count"], 3);
    assert_eq!(report["threshold"], 2);
    assert_eq!(report["candidates"][0], "SAMPLE COPY");
}

#[test]
fn test_clean_writes_default_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.pdf");
    std::fs::write(&input, watermarked(2, "CONFIDENTIAL DRAFT")).unwrap();

    cmd()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("clean")
        .arg(&input)
        .assert()
        .failure();

    cmd()
        .arg("-q")
        .arg("clean")
        .arg(&input)
        .args(["-k", "confidential"])
        .assert()
        .success();

    let output = dir.path().join("Clean_report.pdf");
    let cleaned = std::fs::read(&output).unwrap();
    for text in page_texts(&cleaned) {
        assert!(!text.contains("CONFIDENTIAL"));
        assert!(text.contains("DRAFT"));
    }
}

#[test]
fn test_clean_auto_uses_detected_keywords() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    std::fs::write(&input, watermarked(5, "CONFIDENTIAL DRAFT")).unwrap();

    cmd()
        .arg("clean")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--auto")
        .assert()
        .success()
        .stdout(predicate::str::contains("Keywords: CONFIDENTIAL DRAFT"));

    for text in page_texts(&std::fs::read(&output).unwrap()) {
        assert!(!text.contains("CONFIDENTIAL DRAFT"));
        assert!(text.contains("Body text of page"));
    }
}

#[test]
fn test_preview_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    std::fs::write(&input, watermarked(1, "DRAFT COPY")).unwrap();

    cmd()
        .arg("-q")
        .arg("preview")
        .arg(&input)
        .args(["--keywords", "draft, copy"])
        .assert()
        .success();

    let png = std::fs::read(dir.path().join("doc_preview.png")).unwrap();
    assert!(png.starts_with(b"\x89PNG"));
}

#[test]
fn test_missing_input_exit_code() {
    cmd()
        .args(["clean", "/nonexistent/input.pdf"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_unparseable_input_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.pdf");
    std::fs::write(&input, b"not a pdf at all").unwrap();

    cmd().arg("clean").arg(&input).assert().code(4);
}
