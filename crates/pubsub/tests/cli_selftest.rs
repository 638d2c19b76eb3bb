#![cfg(feature = "cli")]

use std::process::Command;

fn pubsub() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pubsub"));
    cmd.arg("--log-level").arg("error");
    cmd
}

#[test]
fn selftest_passes_with_default_limits() {
    let output = pubsub()
        .arg("--format")
        .arg("json")
        .arg("selftest")
        .output()
        .expect("selftest should run");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("selftest output should be json");
    assert_eq!(report["failed"], 0);
    assert_eq!(report["max_write_size"], 1024);
    assert!(report["checks"]
        .as_array()
        .map(|checks| checks.iter().all(|c| c["passed"] == true))
        .unwrap_or(false));
}

#[test]
fn selftest_filter_limits_checks() {
    let output = pubsub()
        .arg("--format")
        .arg("json")
        .arg("selftest")
        .arg("--filter")
        .arg("short-read")
        .output()
        .expect("selftest should run");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("selftest output should be json");
    assert_eq!(report["passed"], 1);
    assert_eq!(report["checks"][0]["name"], "short-read");
}

#[test]
fn limits_reports_control_numbers() {
    let output = pubsub()
        .arg("--format")
        .arg("json")
        .arg("--max-write-size")
        .arg("1000")
        .arg("limits")
        .output()
        .expect("limits should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"max_write_size\":1000"));
    assert!(stdout.contains("0x7200"));
    assert!(stdout.contains("0x7201"));
}

#[test]
fn invalid_config_file_exits_data_invalid() {
    let path = std::env::temp_dir().join(format!("pubsub-cli-bad-{}.json", std::process::id()));
    std::fs::write(&path, "not json").expect("config file should be writable");

    let output = pubsub()
        .arg("--config")
        .arg(&path)
        .arg("limits")
        .output()
        .expect("limits should run");

    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_file(path);
}

#[test]
fn selftest_passes_with_tiny_bounded_queues() {
    let output = pubsub()
        .args(["--format", "json", "--max-write-size", "4", "--max-queue-bytes", "4"])
        .arg("selftest")
        .output()
        .expect("selftest should run");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("selftest output should be json");
    assert_eq!(report["failed"], 0);
}

#[test]
fn out_of_range_limits_exit_usage() {
    let output = pubsub()
        .args(["--max-write-size", "18446744073709551615", "selftest"])
        .output()
        .expect("selftest should run");
    assert_eq!(output.status.code(), Some(64));

    let output = pubsub()
        .args(["--minors", "4294967295", "selftest"])
        .output()
        .expect("selftest should run");
    assert_eq!(output.status.code(), Some(64));
}
