//! Post-set verification: compare the device clock against a fresh NTP reading.

use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::core::date_format::parse_device_epoch;
use crate::core::types::{DeviceHandle, TimeSample, Verification};
use crate::error::SyncError;
use crate::io::adb::Bridge;
use crate::io::ntp::TimeSource;
use crate::resolve::resolve_time;

/// Reads epoch seconds with nanoseconds where toybox supports `%N`.
pub const READ_CLOCK_COMMAND: &str = "date +%s.%N";

/// Build the drift report for a device reading and a reference at the same moment.
pub fn drift_report(
    device_utc: DateTime<Utc>,
    reference_utc: DateTime<Utc>,
    reference_source: &str,
    tolerance: Duration,
) -> Verification {
    let drift_ms = (device_utc - reference_utc).num_milliseconds();
    let tolerance_ms = i64::try_from(tolerance.as_millis()).unwrap_or(i64::MAX);
    Verification {
        device_utc,
        reference_utc,
        reference_source: reference_source.to_string(),
        drift_ms,
        tolerance_ms,
        within_tolerance: drift_ms.abs() <= tolerance_ms,
    }
}

/// Reference time at monotonic instant `at`, rewound from a later sample.
fn reference_at(sample: &TimeSample, at: Instant) -> DateTime<Utc> {
    let lag = sample.captured_at.saturating_duration_since(at);
    match chrono::Duration::from_std(lag) {
        Ok(lag) => sample.utc - lag,
        Err(_) => sample.utc,
    }
}

/// Re-read the device clock and compare it with a fresh time-source query.
///
/// Drift beyond `tolerance` is logged as a warning; only an unreadable clock or
/// an unreachable time source is an error.
#[instrument(skip_all, fields(device = %device, tolerance_secs = tolerance.as_secs()))]
pub fn verify_clock<B: Bridge, T: TimeSource>(
    bridge: &B,
    source: &T,
    device: &DeviceHandle,
    servers: &[String],
    timeout: Duration,
    tolerance: Duration,
) -> Result<Verification, SyncError> {
    let started = Instant::now();
    let output = bridge.shell(device, READ_CLOCK_COMMAND)?;
    let finished = Instant::now();
    let read_at = started + finished.duration_since(started) / 2;

    if !output.success() {
        return Err(anyhow!("read device clock failed: {}", output.combined()).into());
    }
    let device_utc = parse_device_epoch(&output.stdout).ok_or_else(|| {
        SyncError::from(anyhow!(
            "unreadable device clock output {:?}",
            output.stdout.trim()
        ))
    })?;

    let sample = resolve_time(source, servers, timeout)?;
    let report = drift_report(
        device_utc,
        reference_at(&sample, read_at),
        &sample.source,
        tolerance,
    );
    if report.within_tolerance {
        info!(drift_ms = report.drift_ms, "device clock within tolerance");
    } else {
        warn!(
            drift_ms = report.drift_ms,
            tolerance_ms = report.tolerance_ms,
            "device clock drift exceeds tolerance"
        );
    }
    Ok(report)
}
