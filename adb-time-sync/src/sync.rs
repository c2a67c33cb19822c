//! Orchestration for one clock sync.
//!
//! Detects a privilege method, resolves a time source, sets the clock and
//! optionally verifies it. Nothing is written to the device until both the
//! privilege method and the time are known.

use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::core::types::{DateSyntax, DeviceHandle, SyncResult, ZoneSource};
use crate::detect::detect_privilege;
use crate::error::SyncError;
use crate::io::adb::Bridge;
use crate::io::config::SyncConfig;
use crate::io::ntp::TimeSource;
use crate::resolve::resolve_time;
use crate::set_time::{SetRequest, set_device_time};
use crate::verify::verify_clock;

/// Per-run settings for [`run_sync`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub servers: Vec<String>,
    pub ntp_timeout: Duration,
    pub drift_tolerance: Duration,
    pub date_syntax: DateSyntax,
    pub zone: ZoneSource,
    pub verify: bool,
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn from_config(cfg: &SyncConfig) -> Self {
        Self {
            servers: cfg.servers.clone(),
            ntp_timeout: cfg.ntp_timeout(),
            drift_tolerance: cfg.drift_tolerance(),
            date_syntax: cfg.date_syntax,
            zone: cfg.zone,
            verify: false,
            dry_run: false,
        }
    }
}

/// Sync `device` to network time.
///
/// Verification problems never fail the run: drift lands in
/// `SyncResult::verification`, a failed re-read in `verification_error`.
#[instrument(skip_all, fields(device = %device, verify = options.verify, dry_run = options.dry_run))]
pub fn run_sync<B: Bridge, T: TimeSource>(
    bridge: &B,
    source: &T,
    device: &DeviceHandle,
    options: &SyncOptions,
) -> Result<SyncResult, SyncError> {
    let method = detect_privilege(bridge, device)?;
    let sample = resolve_time(source, &options.servers, options.ntp_timeout)?;

    let outcome = set_device_time(
        bridge,
        device,
        method,
        &sample,
        SetRequest {
            syntax: options.date_syntax,
            zone: options.zone,
            dry_run: options.dry_run,
        },
    )?;
    info!(target_utc = %outcome.target_utc, executed = outcome.executed, "clock step done");

    let (verification, verification_error) = if options.verify && outcome.executed {
        match verify_clock(
            bridge,
            source,
            device,
            &options.servers,
            options.ntp_timeout,
            options.drift_tolerance,
        ) {
            Ok(report) => (Some(report), None),
            Err(err) => {
                warn!(err = %err, "verification failed");
                (None, Some(err.to_string()))
            }
        }
    } else {
        (None, None)
    };

    Ok(SyncResult {
        device: device.clone(),
        method,
        source: sample.source,
        target_utc: outcome.target_utc,
        target_local: outcome.target_local.to_rfc3339(),
        command: outcome.command,
        dry_run: !outcome.executed,
        success: true,
        verification,
        verification_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PrivilegeMethod;
    use crate::test_support::{ScriptedBridge, ScriptedTimeSource, ok, reference_utc};

    fn options() -> SyncOptions {
        SyncOptions {
            zone: ZoneSource::Utc,
            ..SyncOptions::from_config(&SyncConfig::default())
        }
    }

    #[test]
    fn dry_run_reports_command_without_setting() {
        let bridge = ScriptedBridge::with_device("emu").on("su -c 'id -u'", ok("0\n"));
        let source = ScriptedTimeSource::default().answer("time.google.com", reference_utc());
        let result = run_sync(
            &bridge,
            &source,
            &DeviceHandle::new("emu"),
            &SyncOptions {
                dry_run: true,
                verify: true,
                ..options()
            },
        )
        .expect("sync");
        assert!(result.dry_run);
        assert_eq!(result.method, PrivilegeMethod::Su);
        assert_eq!(result.command, "su -c 'date 101612002026.00'");
        assert_eq!(result.verification, None);
        assert_eq!(result.verification_error, None);
        assert_eq!(bridge.commands(), vec!["su -c 'id -u'".to_string()]);
    }

    #[test]
    fn failed_verification_does_not_fail_the_run() {
        let bridge = ScriptedBridge::with_device("emu")
            .on("id -u", ok("0\n"))
            .on_prefix("date 1", ok(""));
        let source = ScriptedTimeSource::default().answer("time.google.com", reference_utc());
        let result = run_sync(
            &bridge,
            &source,
            &DeviceHandle::new("emu"),
            &SyncOptions {
                verify: true,
                ..options()
            },
        )
        .expect("sync");
        assert!(result.success);
        assert_eq!(result.method, PrivilegeMethod::AlreadyRoot);
        assert_eq!(result.verification, None);
        let err = result.verification_error.expect("verification error kept");
        assert!(err.contains("read device clock failed"), "{err}");
        assert!(bridge.issued("date +%s.%N"));
    }
}
