#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::Command;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pubsubcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn fanout_delivers_file_to_every_subscriber() {
    let dir = unique_temp_dir("fanout");
    let payload_path = dir.join("payload.bin");
    let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&payload_path, &payload).expect("payload should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_pubsub"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .arg("fanout")
        .arg("--subscribers")
        .arg("3")
        .arg("--file")
        .arg(&payload_path)
        .arg("--read-size")
        .arg("300")
        .output()
        .expect("fanout should run");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("fanout output should be json");
    assert_eq!(report["payload_size"], 5000);
    assert_eq!(report["writes"], 5);
    assert_eq!(report["stats"]["publishes"], 5);
    assert_eq!(report["stats"]["bytes_published"], 5000);
    assert_eq!(report["stats"]["subscribers"], 3);
    assert_eq!(report["stats"]["buffered_bytes"], 0);

    let subs = report["subscribers"]
        .as_array()
        .expect("subscribers should be an array");
    assert_eq!(subs.len(), 3);
    for sub in subs {
        assert_eq!(sub["role"], "subscriber");
        assert_eq!(sub["bytes"], 5000);
        assert_eq!(sub["matches"], true);
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn fanout_retries_through_bounded_queues() {
    let output = Command::new(env!("CARGO_BIN_EXE_pubsub"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .arg("--max-write-size")
        .arg("4")
        .arg("--max-queue-bytes")
        .arg("8")
        .arg("fanout")
        .arg("--data")
        .arg("hello broadcast world")
        .output()
        .expect("fanout should run");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("fanout output should be json");
    assert!(report["retries"].as_u64().unwrap_or(0) > 0);
    assert_eq!(report["subscribers"][0]["matches"], true);
    assert_eq!(report["subscribers"][1]["matches"], true);
}

#[test]
fn fanout_rejects_unknown_minor() {
    let output = Command::new(env!("CARGO_BIN_EXE_pubsub"))
        .arg("--log-level")
        .arg("error")
        .arg("--minors")
        .arg("2")
        .arg("fanout")
        .arg("--minor")
        .arg("5")
        .arg("--data")
        .arg("x")
        .output()
        .expect("fanout should run");

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no such minor 5"));
}
