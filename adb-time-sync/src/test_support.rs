//! Test-only fakes for the debug bridge and NTP.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};

use crate::core::types::{DeviceEntry, DeviceHandle, TimeSample};
use crate::io::adb::{Bridge, ShellOutput};
use crate::io::ntp::TimeSource;

/// Shell output with exit code 0.
pub fn ok(stdout: &str) -> ShellOutput {
    ShellOutput {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
        timed_out: false,
    }
}

/// Shell output with a nonzero exit code and stderr.
pub fn fail(exit_code: i32, stderr: &str) -> ShellOutput {
    ShellOutput {
        exit_code: Some(exit_code),
        stdout: String::new(),
        stderr: stderr.to_string(),
        timed_out: false,
    }
}

/// Fixed reference instant used across tests: 2026-10-16 12:00:00 UTC.
pub fn reference_utc() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

/// Bridge that answers from canned rules and records every shell command.
///
/// Exact rules win over prefix rules; unmatched commands behave like a missing
/// binary (`exit 127`).
#[derive(Default)]
pub struct ScriptedBridge {
    devices: Vec<DeviceEntry>,
    devices_error: Option<String>,
    exact: BTreeMap<String, ShellOutput>,
    prefixes: Vec<(String, ShellOutput)>,
    delays: BTreeMap<String, Duration>,
    commands: RefCell<Vec<String>>,
}

impl ScriptedBridge {
    /// Bridge with a single usable device.
    pub fn with_device(serial: &str) -> Self {
        Self::default().device(serial, "device")
    }

    pub fn device(mut self, serial: &str, state: &str) -> Self {
        self.devices.push(DeviceEntry {
            serial: serial.to_string(),
            state: state.to_string(),
        });
        self
    }

    /// Make `devices()` fail as if `adb` could not be run.
    pub fn devices_error(mut self, message: &str) -> Self {
        self.devices_error = Some(message.to_string());
        self
    }

    pub fn on(mut self, command: &str, output: ShellOutput) -> Self {
        self.exact.insert(command.to_string(), output);
        self
    }

    pub fn on_prefix(mut self, prefix: &str, output: ShellOutput) -> Self {
        self.prefixes.push((prefix.to_string(), output));
        self
    }

    /// Make `command` take `delay` before answering, like a slow USB round trip.
    pub fn slow(mut self, command: &str, delay: Duration) -> Self {
        self.delays.insert(command.to_string(), delay);
        self
    }

    /// Every shell command issued so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    /// True when any issued command contains `needle`.
    pub fn issued(&self, needle: &str) -> bool {
        self.commands.borrow().iter().any(|cmd| cmd.contains(needle))
    }
}

impl Bridge for ScriptedBridge {
    fn devices(&self) -> Result<Vec<DeviceEntry>> {
        match &self.devices_error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(self.devices.clone()),
        }
    }

    fn shell(&self, _device: &DeviceHandle, command: &str) -> Result<ShellOutput> {
        self.commands.borrow_mut().push(command.to_string());
        if let Some(delay) = self.delays.get(command) {
            std::thread::sleep(*delay);
        }
        if let Some(output) = self.exact.get(command) {
            return Ok(output.clone());
        }
        let matched = self
            .prefixes
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()));
        match matched {
            Some((_, output)) => Ok(output.clone()),
            None => Ok(fail(127, &format!("/system/bin/sh: {command}: not found"))),
        }
    }
}

/// Time source with canned per-host answers. Unknown hosts fail.
#[derive(Default)]
pub struct ScriptedTimeSource {
    answers: BTreeMap<String, std::result::Result<DateTime<Utc>, String>>,
    queried: RefCell<Vec<String>>,
}

impl ScriptedTimeSource {
    pub fn answer(mut self, host: &str, utc: DateTime<Utc>) -> Self {
        self.answers.insert(host.to_string(), Ok(utc));
        self
    }

    pub fn fail(mut self, host: &str, message: &str) -> Self {
        self.answers.insert(host.to_string(), Err(message.to_string()));
        self
    }

    /// Hosts queried so far, in order.
    pub fn queried(&self) -> Vec<String> {
        self.queried.borrow().clone()
    }
}

impl TimeSource for ScriptedTimeSource {
    fn query(&self, host: &str, _timeout: Duration) -> Result<TimeSample> {
        self.queried.borrow_mut().push(host.to_string());
        match self.answers.get(host) {
            Some(Ok(utc)) => Ok(TimeSample {
                source: host.to_string(),
                utc: *utc,
                latency: Duration::from_millis(15),
                captured_at: Instant::now(),
            }),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("no answer scripted for {host}")),
        }
    }
}
