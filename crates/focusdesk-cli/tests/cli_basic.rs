//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway config directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(dir: &Path, args: &[&str], stdin: Option<&str>) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_focusdesk"))
        .args(args)
        .env("FOCUSDESK_CONFIG_DIR", dir)
        .env_remove("FOCUSDESK_ENV")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("write stdin");
        }
    }

    let output = child.wait_with_output().expect("wait for CLI");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.code().unwrap_or(-1), stdout, stderr)
}

fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("stdout line is JSON"))
        .collect()
}

#[test]
fn test_config_list() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "list"], None);
    assert_eq!(code, 0, "Config list failed");

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["timer"]["focus_minutes"], 25);
    assert_eq!(parsed["backend"]["enabled"], false);
    assert_eq!(parsed["notifications"]["rings"], 1);
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["config", "set", "timer.focus_minutes", "50"], None);
    assert_eq!(code, 0, "Config set failed");

    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.focus_minutes"], None);
    assert_eq!(code, 0, "Config get failed");
    assert_eq!(stdout.trim(), "50");
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "timer.focus_minutes", "0"], None);
    assert_eq!(code, 1);
    assert!(stderr.contains("focus_minutes"), "stderr: {stderr}");

    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.focus_minutes"], None);
    assert_eq!(stdout.trim(), "25");
}

#[test]
fn test_config_get_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "get", "ui.dark_mode"], None);
    assert_eq!(code, 1);
    assert!(stderr.contains("ui.dark_mode"));
}

#[test]
fn test_config_path() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "path"], None);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
}

#[test]
fn test_timer_preview() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["timer", "preview", "--task", "9"], None);
    assert_eq!(code, 0, "Timer preview failed");

    let status: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(status["clock"], "25:00");
    assert_eq!(status["title"], "Focus Time");
    assert_eq!(status["session"]["running"], false);
}

#[test]
fn test_timer_run_skip_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(
        dir.path(),
        &["timer", "run", "--task", "7", "--offline"],
        Some("skip\nstatus\nquit\n"),
    );
    assert_eq!(code, 0, "Timer run failed: {stderr}");

    let lines = json_lines(&stdout);
    assert!(lines.iter().any(|l| l["type"] == "session_started"));
    let skipped = lines
        .iter()
        .find(|l| l["type"] == "phase_skipped")
        .expect("phase_skipped event");
    assert_eq!(skipped["skipped"], "focus");
    assert_eq!(skipped["next"], "break");

    let status = lines
        .iter()
        .find(|l| l["type"] == "status")
        .expect("status line");
    assert_eq!(status["session"]["phase"], "break");
    assert_eq!(status["clock"], "05:00");
    assert_eq!(status["session"]["running"], false);
}

#[test]
fn test_timer_run_complete_before_target() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["timer", "run", "--task", "7", "--offline", "--target", "2"],
        Some("complete\n"),
    );
    assert_eq!(code, 0);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn test_timer_run_rejects_zero_focus() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["timer", "run", "--focus", "0"], Some(""));
    assert_eq!(code, 1);
    assert!(stderr.contains("focus_minutes"), "stderr: {stderr}");
}
