//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify its JSON output.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_timescore"))
        .args(args)
        .env("TIMESCORE_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_record_and_today() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_json(dir.path(), &["record", "A", "--minutes", "10", "--mood", "4"]);
    assert_eq!(result["level"], "A");
    assert!(result["final_score"].as_f64().unwrap() > 0.0);
    assert!(result["record_id"].as_i64().unwrap() > 0);

    let today = run_json(dir.path(), &["today"]);
    assert_eq!(today["records"].as_array().unwrap().len(), 1);
    assert_eq!(today["state"]["today_behavior_count"], 1);
}

#[test]
fn test_record_rejects_bad_mood() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["record", "A", "--minutes", "10", "--mood", "9"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_behavior_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let added = run_json(
        dir.path(),
        &["behavior", "add", "nap", "R3", "--category", "rest"],
    );
    assert_eq!(added["level"], "R3");

    let listed = run_json(dir.path(), &["behavior", "list", "--level", "R"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (code, _, stderr) = run_cli(dir.path(), &["behavior", "add", "nap", "R1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_wish_redeem_without_score_fails() {
    let dir = tempfile::tempdir().unwrap();
    let wish = run_json(dir.path(), &["wish", "add", "concert", "300"]);
    let id = wish["id"].as_i64().unwrap().to_string();

    let (code, _, stderr) = run_cli(dir.path(), &["wish", "redeem", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Insufficient score"));

    let list = run_json(dir.path(), &["wish", "list"]);
    assert_eq!(list["wishes"].as_array().unwrap().len(), 1);
}

#[test]
fn test_config_set_get() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "set", "features.lucky", "true"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "features.lucky"]);
    assert_eq!(stdout.trim(), "true");

    let overrides = run_json(dir.path(), &["config", "list", "--overrides"]);
    assert_eq!(overrides["features.lucky"], "true");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "tunables.energy_max", "0"]);
    assert_eq!(code, 1);
}

#[test]
fn test_history_empty() {
    let dir = tempfile::tempdir().unwrap();
    let history = run_json(dir.path(), &["history", "--days", "3"]);
    assert!(history["days"].as_array().unwrap().is_empty());
    assert_eq!(history["total_score"], 0.0);
}

#[test]
fn test_record_rejects_out_of_range_minutes() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["record", "A", "--minutes", "1000000000000", "--mood", "3"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let today = run_json(dir.path(), &["today"]);
    assert!(today["records"].as_array().unwrap().is_empty());
}

#[test]
fn test_debug_logging_goes_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_timescore"))
        .args(["today"])
        .env("TIMESCORE_DATA_DIR", dir.path())
        .env("RUST_LOG", "debug")
        .output()
        .expect("Failed to execute CLI command");
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loaded configuration"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<serde_json::Value>(&stdout).expect("stdout stays JSON");
}
