//! Corruption recovery tests for calclog.
//!
//! These tests verify the ledger stays usable when:
//! - The history file is corrupted
//! - The history file was truncated by a crash mid-write
//! - The history file cannot be written
//! - The history file was written with offset-less timestamps

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("calclog"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_history_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(
        data_dir.join("calculator_history.json"),
        "{ invalid json }}}}",
    )
    .expect("Failed to write corrupted history");

    cli(data_dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("No calculations in history yet"))
        .stderr(predicate::str::contains("Could not load history"));
}

#[test]
fn test_truncated_history_is_replaced_on_next_write() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let history_path = data_dir.join("calculator_history.json");

    // Simulate a crash part-way through a rewrite
    fs::write(
        &history_path,
        r#"{"last_updated":"2024-01-01T10:00:00+00:00","session_start":"2024-01-01T09:00:00+00:00","calculations":[{"id":1,"calcul"#,
    )
    .unwrap();

    cli(data_dir)
        .args(["record", "2 + 2 = 4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded calculation #1"));

    let contents = fs::read_to_string(&history_path).unwrap();
    let history: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(history["calculations"].as_array().unwrap().len(), 1);
}

#[test]
fn test_legacy_history_without_counter() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(
        data_dir.join("calculator_history.json"),
        r#"{
  "last_updated": "2024-01-01T10:00:00+00:00",
  "session_start": "2024-01-01T09:00:00+00:00",
  "calculations": [
    {"id": 5, "calculation": "10 / 2 = 5", "result": 5.0, "operation_type": "basic",
     "timestamp": "2024-01-01T09:30:00+00:00", "session_id": "2024-01-01T09:00:00+00:00"}
  ]
}"#,
    )
    .unwrap();

    cli(data_dir)
        .args(["record", "6 - 1 = 5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded calculation #6"));
}

#[test]
fn test_unwritable_history_warns_but_succeeds() {
    let temp_dir = setup_test_dir();
    // The data dir itself is a regular file, so nothing can be saved
    let data_dir = temp_dir.path().join("blocked");
    fs::write(&data_dir, "not a directory").unwrap();

    cli(&data_dir)
        .args(["record", "1 + 1 = 2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded calculation #1"))
        .stderr(predicate::str::contains("could not be saved"));
}

#[test]
fn test_offsetless_history_is_loaded_not_replaced() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let history_path = data_dir.join("calculator_history.json");

    // Local wall-clock timestamps without an offset, no id counter
    fs::write(
        &history_path,
        r#"{
  "last_updated": "2024-03-01T12:05:10.654321",
  "session_start": "2024-03-01T12:00:00.123456",
  "calculations": [
    {"id": 1, "calculation": "10 / 4 = 2.5", "result": null, "operation_type": "basic",
     "timestamp": "2024-03-01T12:05:10.654321", "session_id": "2024-03-01T12:00:00.123456"}
  ]
}"#,
    )
    .unwrap();

    cli(data_dir)
        .args(["record", "2 + 2 = 4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded calculation #2"))
        .stderr(predicate::str::contains("Could not load history").not());

    let contents = fs::read_to_string(&history_path).unwrap();
    let history: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let entries = history["calculations"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["calculation"], "10 / 4 = 2.5");
}
