//! End-to-end tests of the stemperator-cli binary
//!
//! A shell script stands in for the Python interpreter and answers the
//! bridge protocol, so these run without audio-separator installed.

#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::{tempdir, TempDir};

use common::write_wav;

const BIN: &str = env!("CARGO_BIN_EXE_stemperator-cli");

const SEPARATE_OK: &str = r#"
      : > "$out/song_(Vocals)_htdemucs.wav"
      : > "$out/song_(No Vocals)_htdemucs.wav"
      echo "separator chatter on stdout"
      echo '{"ok":true,"outputs":["song_(Vocals)_htdemucs.wav","song_(No Vocals)_htdemucs.wav"]}'"#;

const SEPARATE_FAIL: &str = r#"
      echo '{"ok":false,"error":"CUDA out of memory","error_kind":"exception"}'"#;

/// Write a fake interpreter that speaks the bridge protocol
fn fake_python(dir: &Path, separate: &str) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
out=""
while IFS= read -r line; do
  case "$line" in
    *'"command":"hello"'*)
      echo '{{"ok":true,"separator_version":"0.0-test","torch_version":"2.3.0","python_version":"3.11.9"}}' ;;
    *'"command":"devices"'*)
      echo '{{"ok":true,"torch_version":"2.3.0","cuda":[],"directml":null,"mps":false}}' ;;
    *'"command":"prepare"'*)
      out=$(printf '%s\n' "$line" | sed 's/.*"output_dir":"\([^"]*\)".*/\1/')
      echo '{{"ok":true}}' ;;
    *'"command":"load"'*)
      echo '{{"ok":true}}' ;;
    *'"command":"info"'*)
      echo '{{"ok":true,"duration":null}}' ;;
    *'"command":"separate"'*){separate} ;;
    *'"command":"shutdown"'*)
      echo '{{"ok":true}}'
      exit 0 ;;
  esac
done
"#
    );

    let path = dir.join("fake-python");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn run(python: &Path, args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env("STEMPERATOR_PYTHON", python)
        .env("RUST_LOG", "info")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn workspace() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let input = dir.path().join("song.wav");
    write_wav(&input, 1);
    let out = dir.path().join("stems");
    (dir, input, out)
}

// === Separation ===

#[test]
fn test_successful_separation() {
    let (dir, input, out) = workspace();
    let python = fake_python(dir.path(), SEPARATE_OK);

    let output = run(
        &python,
        &[input.to_str().unwrap(), out.to_str().unwrap(), "--device", "cpu"],
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "PROGRESS:0:Initializing");
    assert!(lines.contains(&"PROGRESS:11:Starting separation"));
    assert_eq!(lines[lines.len() - 2], "PROGRESS:100:Complete");
    assert!(!text.contains("separator chatter"));

    let mapping: Value = serde_json::from_str(lines[lines.len() - 1]).unwrap();
    let vocals = PathBuf::from(mapping["vocals"].as_str().unwrap());
    let other = PathBuf::from(mapping["other"].as_str().unwrap());
    assert!(vocals.ends_with("vocals.wav") && vocals.exists());
    assert!(other.ends_with("other.wav") && other.exists());
}

#[test]
fn test_separation_failure_exits_1() {
    let (dir, input, out) = workspace();
    let python = fake_python(dir.path(), SEPARATE_FAIL);

    let output = run(&python, &[input.to_str().unwrap(), out.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("ERROR: Separation failed: CUDA out of memory"));
    assert!(stdout(&output).contains("PROGRESS:11:Starting separation"));
    assert!(!stdout(&output).contains("PROGRESS:100"));
}

#[test]
fn test_missing_input_exits_1_without_progress() {
    let (dir, _input, out) = workspace();
    let python = fake_python(dir.path(), SEPARATE_OK);
    let missing = dir.path().join("missing.wav");

    let output = run(&python, &[missing.to_str().unwrap(), out.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("ERROR: Input file not found"));
    assert!(!stdout(&output).contains("PROGRESS:"));
}

#[test]
fn test_missing_interpreter_exits_1_without_progress() {
    let (dir, input, out) = workspace();
    let python = dir.path().join("no-such-python");

    let output = run(&python, &[input.to_str().unwrap(), out.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("pip install audio-separator"));
    assert!(!stdout(&output).contains("PROGRESS:"));
}

// === Informational Flags ===

#[test]
fn test_check() {
    let dir = tempdir().unwrap();
    let python = fake_python(dir.path(), SEPARATE_OK);

    let output = run(&python, &["--check"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "Installation OK!");
    assert!(stderr(&output).contains("PyTorch: 2.3.0"));
    assert!(stderr(&output).contains("cpu: CPU"));
}

#[test]
fn test_check_fails_without_interpreter() {
    let dir = tempdir().unwrap();
    let output = run(&dir.path().join("no-such-python"), &["--check"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("ERROR:"));
}

#[test]
fn test_list_devices() {
    let dir = tempdir().unwrap();
    let python = fake_python(dir.path(), SEPARATE_OK);

    let output = run(&python, &["--list-devices"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "Available devices (1):\n  cpu: CPU\n");
}

#[test]
fn test_list_models() {
    let dir = tempdir().unwrap();
    let output = run(&dir.path().join("unused"), &["--list-models"]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("htdemucs - Hybrid Transformer Demucs (default, fast) [default]"));
    assert!(text.contains("Kim_Vocal_2"));
}

// === Argument Handling ===

#[test]
fn test_missing_positionals_print_help_and_exit_1() {
    let dir = tempdir().unwrap();
    let output = run(&dir.path().join("unused"), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Usage:"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_unknown_model_exits_1() {
    let dir = tempdir().unwrap();
    let output = run(&dir.path().join("unused"), &["in.wav", "out", "--model", "spleeter"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_help_exits_0() {
    let dir = tempdir().unwrap();
    let output = run(&dir.path().join("unused"), &["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("--list-devices"));
    assert!(!stdout(&output).contains("--gpu-id"));
}
