//! Shared types for the sync pipeline.
//!
//! These types carry values between stages. They hold no handles to devices or
//! sockets, so every stage can be exercised with scripted inputs.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serial of a connected device, as listed by `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceHandle(pub String);

impl DeviceHandle {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    pub fn serial(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of `adb devices` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub serial: String,
    /// Connection state (`device`, `unauthorized`, `offline`, ...).
    pub state: String,
}

impl DeviceEntry {
    /// Only devices in the `device` state accept shell commands.
    pub fn is_usable(&self) -> bool {
        self.state == "device"
    }
}

/// How root commands are issued on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivilegeMethod {
    Su,
    Sudo,
    Rootshell,
    AlreadyRoot,
    None,
}

impl PrivilegeMethod {
    /// Probe order for detection. `None` is the absence of a method and is never probed.
    pub const PROBE_ORDER: [PrivilegeMethod; 4] = [
        PrivilegeMethod::Su,
        PrivilegeMethod::Sudo,
        PrivilegeMethod::Rootshell,
        PrivilegeMethod::AlreadyRoot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PrivilegeMethod::Su => "su",
            PrivilegeMethod::Sudo => "sudo",
            PrivilegeMethod::Rootshell => "rootshell",
            PrivilegeMethod::AlreadyRoot => "already-root",
            PrivilegeMethod::None => "none",
        }
    }
}

impl fmt::Display for PrivilegeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Syntax accepted by the device's `date` binary when setting the clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateSyntax {
    /// Toybox (Android 6+): `date MMDDhhmmYYYY.ss`.
    #[default]
    Toybox,
    /// Legacy toolbox: `date -s YYYYMMDD.hhmmss`.
    Toolbox,
}

/// Where the device-local UTC offset comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ZoneSource {
    /// Ask the device (`date +%z`), falling back to the host offset.
    #[default]
    Device,
    /// Use the host machine's local offset.
    Host,
    /// Treat device local time as UTC.
    Utc,
}

/// A time reading from one NTP server.
#[derive(Debug, Clone)]
pub struct TimeSample {
    /// Host that answered.
    pub source: String,
    /// Corrected UTC time at `captured_at`.
    pub utc: DateTime<Utc>,
    /// Wall time spent on the query.
    pub latency: Duration,
    /// Monotonic instant the reading refers to.
    pub captured_at: Instant,
}

impl TimeSample {
    /// UTC time at monotonic instant `now`, extrapolated from this sample.
    pub fn utc_at(&self, now: Instant) -> DateTime<Utc> {
        let aged = now.saturating_duration_since(self.captured_at);
        match chrono::Duration::from_std(aged) {
            Ok(delta) => self.utc + delta,
            Err(_) => self.utc,
        }
    }
}

/// Result of reading the device clock back after a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub device_utc: DateTime<Utc>,
    pub reference_utc: DateTime<Utc>,
    pub reference_source: String,
    /// Device minus reference, in milliseconds.
    pub drift_ms: i64,
    pub tolerance_ms: i64,
    pub within_tolerance: bool,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub device: DeviceHandle,
    pub method: PrivilegeMethod,
    pub source: String,
    pub target_utc: DateTime<Utc>,
    /// Target rendered in the device's local offset.
    pub target_local: String,
    /// Shell command issued (or that would be issued on a dry run).
    pub command: String,
    pub dry_run: bool,
    pub success: bool,
    pub verification: Option<Verification>,
    /// Why `--verify` produced no report, when it ran and failed.
    pub verification_error: Option<String>,
}
