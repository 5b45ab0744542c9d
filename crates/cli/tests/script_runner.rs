// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn scratch_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("rvx-tests")
        .join(format!("{}-{}-{}", prefix, std::process::id(), nonce));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_script(dir: &PathBuf, contents: &str) -> PathBuf {
    let path = dir.join("script.yaml");
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

fn configs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs")
}

fn run_test(script: &PathBuf, extra: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_rvx-sim"))
        .arg("test")
        .arg("--script")
        .arg(script)
        .arg("--no-uart-stdout")
        .args(extra)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_bundled_scripts_pass() {
    for name in ["identify-report.yaml", "echo-prompt.yaml"] {
        let script = configs_dir().join("tests").join(name);
        let output = run_test(&script, &[]);
        assert_eq!(
            output.status.code(),
            Some(0),
            "{} failed: {}",
            name,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn test_failed_assertion_writes_artifacts() {
    let dir = scratch_dir("assert-fail");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
inputs:
  keys: "\\n"
limits:
  max_interrupts: 10
assertions:
  - reports: 2
  - uart_contains: "Macronix"
"#,
    );
    let out_dir = dir.join("out");
    let output = run_test(&script, &["--output-dir", out_dir.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("result.json")).unwrap())
            .unwrap();
    assert_eq!(result["status"], "fail");
    assert_eq!(result["reports"], 1);
    assert_eq!(result["stop_reason"], "input_exhausted");
    assert_eq!(result["assertions"][0]["passed"], false);
    assert_eq!(result["assertions"][1]["passed"], true);

    let uart = std::fs::read_to_string(out_dir.join("uart.log")).unwrap();
    assert!(uart.contains("Manufacturer: Macronix"));
}

#[test]
fn test_interrupt_limit_stops_input() {
    let dir = scratch_dir("limit");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
inputs:
  keys: "\\n\\n\\n\\n"
limits:
  max_interrupts: 2
assertions:
  - reports: 2
"#,
    );
    let out_dir = dir.join("out");
    let output = run_test(&script, &["--output-dir", out_dir.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("result.json")).unwrap())
            .unwrap();
    assert_eq!(result["stop_reason"], "max_interrupts");
    assert_eq!(result["interrupts"], 2);
}

#[test]
fn test_unresponsive_flash_counts_failures() {
    let dir = scratch_dir("stalled");
    std::fs::write(
        dir.join("board.yaml"),
        r#"
name: "stalled"
flash_bus:
  ready_poll_limit: 16
flash:
  manufacturer_id: 0xC2
  memory_type: 0x20
  capacity: 0x16
  responsive: false
"#,
    )
    .unwrap();
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
inputs:
  board: "board.yaml"
  keys: "\\n\\n"
limits:
  max_interrupts: 10
assertions:
  - dispatch_failures: 2
  - reports: 0
"#,
    );
    let output = run_test(&script, &[]);
    assert_eq!(
        output.status.code(),
        Some(0),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_invalid_script_is_config_error() {
    let dir = scratch_dir("invalid");
    let script = write_script(
        &dir,
        r#"
schema_version: "2.0"
inputs:
  keys: ""
limits:
  max_interrupts: 1
"#,
    );
    let out_dir = dir.join("out");
    let output = run_test(&script, &["--output-dir", out_dir.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("result.json")).unwrap())
            .unwrap();
    assert_eq!(result["status"], "error");
    assert_eq!(result["stop_reason"], "config_error");
}
