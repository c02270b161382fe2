//! CLI tests for `collection-runner`.
//!
//! Spawns the binary and verifies exit codes for passing, failing, halted and
//! invalid collections.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use collection_runner::exit_codes;

fn runner(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_collection-runner"))
        .args(args)
        .output()
        .expect("spawn collection-runner")
}

fn write_collection(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("collection.toml");
    fs::write(&path, contents).expect("write collection");
    path
}

fn sample() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("collections/job_polling.toml")
}

#[test]
fn sample_collection_runs_clean() {
    let temp = tempfile::tempdir().expect("tempdir");
    let report = temp.path().join("report.json");
    let sample = sample();
    let output = runner(&[
        "run",
        sample.to_str().expect("utf8 path"),
        "--report",
        report.to_str().expect("utf8 path"),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{stdout}");
    assert!(stdout.contains("[Polled] [PASS] [Tester] All Tests Passed"));
    assert!(stdout.contains("completed: 7 invocations, 0 failed"));

    let raw = fs::read_to_string(&report).expect("report");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["exit_code"], exit_codes::OK);
    let steps: Vec<&str> = value["invocations"]
        .as_array()
        .expect("invocations")
        .iter()
        .filter_map(|inv| inv["step"].as_str())
        .collect();
    assert_eq!(
        steps,
        vec![
            "Create job",
            "Wait for job",
            "_POLL_DELAY",
            "Wait for job",
            "_POLL_DELAY",
            "Wait for job",
            "Delete job",
        ]
    );
}

#[test]
fn failing_checks_exit_with_failed() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_collection(
        temp.path(),
        r#"
[[steps]]
name = "Get"
responses = [{ body = { state = "RUNNING" } }]
checks = [{ path = "state", value = "DONE" }]
"#,
    );
    let output = runner(&["run", path.to_str().expect("utf8 path")]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
}

#[test]
fn exhausted_poll_exits_with_halted() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_collection(
        temp.path(),
        r#"
[settings]
max_tries = 2
wait_secs = 0
use_internal = true

[[steps]]
name = "Wait"
responses = [{ status = 503 }]
poll = { next = "Done" }

[[steps]]
name = "Done"
"#,
    );
    let output = runner(&["run", path.to_str().expect("utf8 path")]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::HALTED), "{stdout}");
    assert!(stdout.contains("0 [Poller] Max Tries Reached"));
}

#[test]
fn poll_config_file_overrides_collection_settings() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_collection(
        temp.path(),
        r#"
[settings]
max_tries = 2
wait_secs = 0
use_internal = true

[[steps]]
name = "Wait"
responses = [{ status = 503 }]
poll = { next = "Done" }

[[steps]]
name = "Done"
"#,
    );
    let config = temp.path().join("poll.toml");
    fs::write(
        &config,
        "max_tries = 2\nwait_secs = 0\nuse_internal = true\nbypass_timeout = true\n",
    )
    .expect("write poll config");

    let output = runner(&[
        "run",
        path.to_str().expect("utf8 path"),
        "--config",
        config.to_str().expect("utf8 path"),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED), "{stdout}");
    assert!(stdout.contains("0 [Poller] Max Tries Reached"));
    assert!(stdout.contains("Done #1 [200] ok"));
}

#[test]
fn missing_poll_config_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_collection(
        temp.path(),
        r#"
[[steps]]
name = "Ping"
"#,
    );
    let missing = temp.path().join("missing.toml");
    let output = runner(&[
        "run",
        path.to_str().expect("utf8 path"),
        "--config",
        missing.to_str().expect("utf8 path"),
    ]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("read poll config"));
}

#[test]
fn validate_rejects_unknown_operator() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_collection(
        temp.path(),
        r#"
[[steps]]
name = "Get"
checks = [{ path = "a", value = 1, op = "approx" }]
"#,
    );
    let output = runner(&["validate", path.to_str().expect("utf8 path")]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid match op \"approx\""));
}

#[test]
fn validate_accepts_sample() {
    let sample = sample();
    let output = runner(&["validate", sample.to_str().expect("utf8 path")]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
}

#[test]
fn state_prints_reference_states() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_collection(
        temp.path(),
        r#"
[[steps]]
name = "Ping"
"#,
    );
    let output = runner(&["state", path.to_str().expect("utf8 path")]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout.contains("# Ping #1"));
    assert!(stdout.contains("[GET Response Code]=200"));
}
