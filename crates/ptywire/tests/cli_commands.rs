#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ptywire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

/// Run `ptywire --format json run` with `/bin/sh -c script` as the helper.
fn run_shell_helper(script: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ptywire"))
        .args(["--format", "json", "--log-level", "error", "run", "--helper", "/bin/sh"])
        .args(["--", "-c", script])
        .stdin(Stdio::null())
        .output()
        .expect("ptywire run should start")
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect()
}

#[test]
fn run_prints_events_and_exits_with_child_code() {
    let output = run_shell_helper(r#"printf 'P9:C6:START\nO2:hiX3:'"#);
    assert_eq!(output.status.code(), Some(3));

    let events = json_lines(&output.stdout);
    let kinds: Vec<_> = events
        .iter()
        .map(|event| event["event"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(kinds, ["pid", "ready", "stream-data", "exit-code"]);
    assert_eq!(events[0]["value"], 9);
    assert_eq!(events[2]["stream"], "stdout");
    assert_eq!(events[2]["data"], "hi");
}

#[test]
fn run_maps_reported_signal_above_128() {
    let output = run_shell_helper("printf 'S9:'");
    assert_eq!(output.status.code(), Some(128 + 9));
}

#[test]
fn run_reports_truncated_output_as_invalid_data() {
    let output = run_shell_helper("printf 'O10:abc'");
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pty terminated mid output"), "stderr: {stderr}");
}

#[test]
fn run_with_missing_helper_is_command_not_found() {
    let output = Command::new(env!("CARGO_BIN_EXE_ptywire"))
        .args(["--format", "json", "--log-level", "error", "run"])
        .args(["--helper", "/nonexistent/ptywire-helper", "--", "ls"])
        .stdin(Stdio::null())
        .output()
        .expect("ptywire run should start");

    assert_eq!(output.status.code(), Some(127));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("/nonexistent/ptywire-helper: command not found"),
        "stderr: {stderr}"
    );
}

#[test]
fn run_reads_helper_from_environment() {
    let output = Command::new(env!("CARGO_BIN_EXE_ptywire"))
        .args(["--format", "json", "run", "--", "-c", "printf 'X0:'"])
        .env("PTYWIRE_HELPER", "/bin/sh")
        .stdin(Stdio::null())
        .output()
        .expect("ptywire run should start");

    assert_eq!(output.status.code(), Some(0));
    let events = json_lines(&output.stdout);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "exit-code");
}

#[test]
fn decode_prints_frames_from_file() {
    let dir = unique_temp_dir("decode");
    let capture = dir.join("capture.bin");
    std::fs::write(&capture, b"P1:M2:O3:abcX0:").expect("capture should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_ptywire"))
        .args(["--format", "json", "decode"])
        .arg(&capture)
        .output()
        .expect("ptywire decode should start");

    assert_eq!(output.status.code(), Some(0));
    let frames = json_lines(&output.stdout);
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0]["mnemonic"], "P");
    assert_eq!(frames[0]["arg"], 1);
    assert_eq!(frames[2]["payload_size"], 3);
    assert_eq!(frames[2]["payload"], "abc");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_rejects_malformed_input() {
    let dir = unique_temp_dir("malformed");
    let capture = dir.join("capture.bin");
    std::fs::write(&capture, b"P1:Qzz:").expect("capture should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_ptywire"))
        .args(["--format", "json", "decode"])
        .arg(&capture)
        .output()
        .expect("ptywire decode should start");

    assert_eq!(output.status.code(), Some(60));
    assert_eq!(json_lines(&output.stdout).len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_ptywire"))
        .arg("version")
        .output()
        .expect("ptywire version should start");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("ptywire {}", env!("CARGO_PKG_VERSION"))
    );
}
