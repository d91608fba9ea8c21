//! Basic CLI E2E tests.
//!
//! Tests invoke the `forest` binary against a temporary data directory and
//! verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command with `FOREST_DATA_DIR` pointing at `data_dir`.
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_forest"))
        .args(args)
        .env("FOREST_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn init_project(data_dir: &Path) {
    run_ok(
        data_dir,
        &[
            "project",
            "init",
            "piano",
            "--goal",
            "Learn jazz piano",
            "--wake",
            "8:00 AM",
            "--sleep",
            "12:00 AM",
            "--interest",
            "blues",
            "--habit",
            "Scales",
        ],
    );
}

#[test]
fn test_help() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_ok(dir.path(), &["--help"]);
    assert!(stdout.contains("schedule"));
    assert!(stdout.contains("repair"));
}

#[test]
fn test_project_init_and_show() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());
    assert!(dir.path().join("projects/piano/config.json").is_file());
    assert!(dir.path().join("projects/piano/frontier.json").is_file());

    // init made piano the default project
    let stdout = run_ok(dir.path(), &["project", "show"]);
    assert!(stdout.contains("Learn jazz piano"));
    assert!(stdout.contains("8:00 AM"));

    let list = run_ok(dir.path(), &["project", "list", "--json"]);
    let ids: Vec<String> = serde_json::from_str(&list).unwrap();
    assert_eq!(ids, vec!["piano"]);
}

#[test]
fn test_schedule_generate_json_covers_window() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    let stdout = run_ok(
        dir.path(),
        &["schedule", "generate", "--date", "2026-03-02", "--energy", "4", "--json"],
    );
    let schedule: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(schedule["wake_minute"], 480);
    assert_eq!(schedule["end_minute"], 1440);

    let blocks = schedule["blocks"].as_array().unwrap();
    let covered: u64 = blocks
        .iter()
        .map(|b| b["duration_minutes"].as_u64().unwrap())
        .sum();
    assert_eq!(covered, 960);

    let shown = run_ok(dir.path(), &["schedule", "show", "--date", "2026-03-02"]);
    assert!(shown.contains("Schedule for 2026-03-02"));
}

#[test]
fn test_task_next_and_complete() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    let stdout = run_ok(dir.path(), &["task", "next", "--energy", "3", "--json"]);
    let next: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(next["status"], "selected");
    let id = next["node"]["id"].as_str().unwrap().to_string();

    let stdout = run_ok(
        dir.path(),
        &[
            "task",
            "complete",
            &id,
            "--outcome",
            "Played a twelve-bar blues",
            "--difficulty",
            "2",
            "--engagement",
            "9",
            "--praise",
            "friend:loved it",
        ],
    );
    assert!(stdout.contains("Completed"));

    let list = run_ok(dir.path(), &["task", "list", "--all"]);
    assert!(list.contains("Amplify breakthrough"));
    assert!(list.contains("[done"));
}

#[test]
fn test_complete_with_bad_difficulty_fails() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["task", "complete", "whatever", "--outcome", "x", "--difficulty", "9"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_repair_and_status() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    let stdout = run_ok(dir.path(), &["repair", "--force"]);
    assert!(stdout.contains("frontier rebuilt"));

    let status = run_ok(dir.path(), &["status", "--json"]);
    let status: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(status["frontier"]["ready"], 5);
}

#[test]
fn test_missing_project_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["task", "next"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no project selected"));
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(dir.path(), &["config", "get", "scheduler.slot_minutes"]).trim(), "15");

    run_ok(dir.path(), &["config", "set", "scheduler.slot_minutes", "20"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "scheduler.slot_minutes"]).trim(), "20");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "scheduler.bogus", "1"]);
    assert_eq!(code, 1);

    let list = run_ok(dir.path(), &["config", "list"]);
    assert!(list.contains("defaults.wake_time = 8:00 AM"));
}
