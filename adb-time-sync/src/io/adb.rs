//! Debug bridge abstraction.
//!
//! The [`Bridge`] trait decouples the sync stages from the `adb` binary. Tests use
//! scripted bridges that answer shell commands from canned rules without spawning
//! processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::core::devices::parse_devices;
use crate::core::types::{DeviceEntry, DeviceHandle};
use crate::io::process::run_command_with_timeout;

/// Result of one remote shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// Remote exit code. `None` when the command was killed.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Stdout and stderr joined, for diagnostics and output checks.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (false, false) => format!("{stdout}\n{stderr}"),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (true, true) => String::new(),
        }
    }
}

/// Device enumeration and remote shell execution.
pub trait Bridge {
    /// List attached devices in every state.
    fn devices(&self) -> Result<Vec<DeviceEntry>>;

    /// Run `command` through the device's `/system/bin/sh`.
    fn shell(&self, device: &DeviceHandle, command: &str) -> Result<ShellOutput>;
}

/// Bridge that spawns the `adb` binary.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    adb_path: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl AdbBridge {
    pub fn new(adb_path: impl Into<PathBuf>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            adb_path: adb_path.into(),
            timeout,
            output_limit_bytes,
        }
    }
}

impl Bridge for AdbBridge {
    #[instrument(skip_all, fields(adb = %self.adb_path.display()))]
    fn devices(&self) -> Result<Vec<DeviceEntry>> {
        let mut cmd = Command::new(&self.adb_path);
        cmd.arg("devices");
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .context("run adb devices")?;
        if output.timed_out {
            return Err(anyhow!("adb devices timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "adb devices failed with status {:?}: {}",
                output.status.code(),
                output.stderr_lossy().trim()
            ));
        }
        let entries = parse_devices(&output.stdout_lossy());
        debug!(count = entries.len(), "listed devices");
        Ok(entries)
    }

    #[instrument(skip_all, fields(device = %device))]
    fn shell(&self, device: &DeviceHandle, command: &str) -> Result<ShellOutput> {
        debug!(command, "adb shell");
        let mut cmd = Command::new(&self.adb_path);
        cmd.arg("-s").arg(device.serial()).arg("shell").arg(command);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run adb shell on {device}"))?;
        if output.timed_out {
            warn!(command, timeout_secs = self.timeout.as_secs(), "adb shell timed out");
        }
        Ok(ShellOutput {
            exit_code: output.status.code(),
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
            timed_out: output.timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str, exit_code: Option<i32>) -> ShellOutput {
        ShellOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            timed_out: false,
        }
    }

    #[test]
    fn combined_joins_non_empty_streams() {
        assert_eq!(output("a\n", "b\n", Some(0)).combined(), "a\nb");
        assert_eq!(output("", "b\n", Some(1)).combined(), "b");
        assert_eq!(output("", "", Some(0)).combined(), "");
    }

    #[test]
    fn timed_out_is_never_success() {
        let mut out = output("0\n", "", Some(0));
        assert!(out.success());
        out.timed_out = true;
        assert!(!out.success());
    }

    #[test]
    fn missing_adb_binary_is_an_error() {
        let bridge = AdbBridge::new(
            "/nonexistent/adb-time-sync/adb",
            Duration::from_secs(1),
            1000,
        );
        let err = bridge.devices().unwrap_err();
        assert!(format!("{err:#}").contains("run adb devices"));
    }
}
