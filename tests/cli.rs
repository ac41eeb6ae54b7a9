// CLASSIFICATION: COMMUNITY
// Filename: cli.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::fs;

use assert_cmd::Command;
use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn heap_run_writes_csv_and_table() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("out.csv");
    let out = Command::cargo_bin("memcrash")
        .unwrap()
        .args(["--test", "heap", "--trials", "2", "--csv"])
        .arg(&csv)
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("| Test   | Avg time (ns) | Trials | SIGSEGVs |"));
    assert!(stdout.contains("| Heap"));
    assert!(!stdout.contains("| Kernel"));

    let text = fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Trial,Test,Time_ns,SegFaulted");
    assert!(lines[1].starts_with("1,Heap,"));
    assert!(lines[1].ends_with(",1"));
    assert!(lines[2].starts_with("2,Heap,"));
}

#[test]
#[serial]
fn csv_path_from_environment() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("env.csv");
    Command::cargo_bin("memcrash")
        .unwrap()
        .env("MEMCRASH_CSV", &csv)
        .args(["--test", "kernel", "--trials", "1", "--quiet"])
        .assert()
        .success()
        .stdout("");
    let text = fs::read_to_string(&csv).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[test]
#[serial]
fn summary_reads_back_as_json() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("both.csv");
    Command::cargo_bin("memcrash")
        .unwrap()
        .args(["--trials", "2", "--quiet", "--csv"])
        .arg(&csv)
        .assert()
        .success();

    let out = Command::cargo_bin("memcrash-summary")
        .unwrap()
        .arg(&csv)
        .arg("--json")
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rows = v["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["kind"], "Heap");
    assert_eq!(rows[0]["trials"], 2);
    assert_eq!(rows[1]["kind"], "Kernel");
    assert_eq!(rows[1]["faults"], 2);
}

#[test]
fn zero_trials_is_rejected() {
    let dir = tempdir().unwrap();
    let out = Command::cargo_bin("memcrash")
        .unwrap()
        .args(["--trials", "0", "--csv"])
        .arg(dir.path().join("never.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error: trial count must be at least 1"));
}

#[cfg(target_pointer_width = "64")]
#[test]
#[serial]
fn unmappable_allocation_exits_with_error() {
    let dir = tempdir().unwrap();
    let out = Command::cargo_bin("memcrash")
        .unwrap()
        .args(["--test", "heap", "--trials", "1", "--overrun", "0"])
        .args(["--alloc", "4611686018427387904", "--quiet", "--csv"])
        .arg(dir.path().join("big.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error:"));
}

#[test]
fn bad_address_is_rejected() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("memcrash")
        .unwrap()
        .args(["--addr", "0xzz", "--csv"])
        .arg(dir.path().join("never.csv"))
        .assert()
        .failure();
}

#[test]
fn summary_of_missing_file_fails() {
    let dir = tempdir().unwrap();
    let out = Command::cargo_bin("memcrash-summary")
        .unwrap()
        .arg(dir.path().join("absent.csv"))
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("Error:"));
}
