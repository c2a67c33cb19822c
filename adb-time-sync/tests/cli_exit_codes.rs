//! CLI tests for exit codes.
//!
//! Spawns the binary with a nonexistent `adb` or a broken config and checks the
//! stable exit codes. No device or network is needed.

use std::fs;
use std::process::Command;

use adb_time_sync::exit_codes;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_adb-time-sync"))
}

#[test]
fn help_exits_ok() {
    let output = bin().arg("--help").output().expect("run --help");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--comprehensive-check"));
    assert!(stdout.contains("--ntp-server"));
}

#[test]
fn missing_adb_exits_with_no_device() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = bin()
        .current_dir(temp.path())
        .args(["--adb", "/nonexistent/adb-time-sync/adb", "--timeout", "1"])
        .status()
        .expect("run");
    assert_eq!(status.code(), Some(exit_codes::NO_DEVICE));
}

#[test]
fn invalid_config_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("adb-time-sync.toml");
    fs::write(&config, "servers = []\n").expect("write config");

    let output = bin()
        .current_dir(temp.path())
        .arg("--check-root-only")
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("servers"));
}

#[test]
fn conflicting_modes_exit_invalid() {
    let status = bin()
        .args(["--check-root-only", "--comprehensive-check"])
        .status()
        .expect("run");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}
