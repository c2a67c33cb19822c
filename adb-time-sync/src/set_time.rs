//! Apply a resolved time to the device clock.

use std::time::Instant;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use tracing::{info, instrument, warn};

use crate::core::date_format::{
    parse_utc_offset, round_to_second, set_command, set_output_is_malformed,
};
use crate::core::privilege::wrap_command;
use crate::core::types::{DateSyntax, DeviceHandle, PrivilegeMethod, TimeSample, ZoneSource};
use crate::error::SyncError;
use crate::io::adb::Bridge;

/// How the set command is built and whether it runs.
#[derive(Debug, Clone, Copy)]
pub struct SetRequest {
    pub syntax: DateSyntax,
    pub zone: ZoneSource,
    pub dry_run: bool,
}

/// What was (or would have been) applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    pub target_utc: DateTime<Utc>,
    pub target_local: DateTime<FixedOffset>,
    /// Full privileged shell command.
    pub command: String,
    pub executed: bool,
}

/// Offset of the device's civil time at `at`.
pub fn resolve_offset<B: Bridge>(
    bridge: &B,
    device: &DeviceHandle,
    zone: ZoneSource,
    at: DateTime<Utc>,
) -> FixedOffset {
    match zone {
        ZoneSource::Utc => Utc.fix(),
        ZoneSource::Host => host_offset(at),
        ZoneSource::Device => match bridge.shell(device, "date +%z") {
            Ok(output) if output.success() => match parse_utc_offset(&output.stdout) {
                Some(offset) => offset,
                None => {
                    warn!(output = %output.stdout.trim(), "unreadable device offset, using host");
                    host_offset(at)
                }
            },
            Ok(output) => {
                warn!(output = %output.combined(), "device offset query failed, using host");
                host_offset(at)
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "device offset query failed, using host");
                host_offset(at)
            }
        },
    }
}

fn host_offset(at: DateTime<Utc>) -> FixedOffset {
    at.with_timezone(&Local).offset().fix()
}

/// Set the device clock from `sample`.
///
/// The sample is aged to the moment just before the set command is issued, after
/// the offset lookup, so slow device round trips do not leave the clock behind.
#[instrument(skip_all, fields(device = %device, %method, source = %sample.source))]
pub fn set_device_time<B: Bridge>(
    bridge: &B,
    device: &DeviceHandle,
    method: PrivilegeMethod,
    sample: &TimeSample,
    request: SetRequest,
) -> Result<SetOutcome, SyncError> {
    let offset = resolve_offset(bridge, device, request.zone, sample.utc);
    let target_utc = round_to_second(sample.utc_at(Instant::now()));
    let target_local = target_utc.with_timezone(&offset);
    let date_command = set_command(request.syntax, &target_local);
    let command = wrap_command(method, &date_command).ok_or_else(|| {
        SyncError::SetFailed(format!("privilege method {method} cannot run commands"))
    })?;

    if request.dry_run {
        info!(%command, "dry run, not setting time");
        return Ok(SetOutcome {
            target_utc,
            target_local,
            command,
            executed: false,
        });
    }

    info!(%command, %target_local, "setting device time");
    let output = bridge
        .shell(device, &command)
        .map_err(|err| SyncError::SetFailed(format!("{err:#}")))?;
    if output.timed_out {
        return Err(SyncError::SetFailed(format!("`{command}` timed out")));
    }
    if !output.success() {
        return Err(SyncError::SetFailed(format!(
            "`{command}` exited with status {:?}: {}",
            output.exit_code,
            output.combined()
        )));
    }
    if set_output_is_malformed(&output.combined()) {
        return Err(SyncError::SetFailed(format!(
            "`{command}` rejected the date: {}",
            output.combined()
        )));
    }

    Ok(SetOutcome {
        target_utc,
        target_local,
        command,
        executed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedBridge, fail, ok, reference_utc};
    use std::time::Duration;

    fn sample_at(captured_at: Instant) -> TimeSample {
        TimeSample {
            source: "time.google.com".to_string(),
            utc: reference_utc(),
            latency: Duration::from_millis(30),
            captured_at,
        }
    }

    fn captured_ago(age: Duration) -> Instant {
        Instant::now().checked_sub(age).expect("monotonic clock past age")
    }

    fn request(zone: ZoneSource) -> SetRequest {
        SetRequest {
            syntax: DateSyntax::Toybox,
            zone,
            dry_run: false,
        }
    }

    #[test]
    fn sets_device_local_time_through_su() {
        let bridge = ScriptedBridge::with_device("emu")
            .on("date +%z", ok("+0200\n"))
            .on_prefix("su -c 'date ", ok("Fri Oct 16 14:00:02 CEST 2026\n"));
        let captured_at = captured_ago(Duration::from_millis(1800));
        let outcome = set_device_time(
            &bridge,
            &DeviceHandle::new("emu"),
            PrivilegeMethod::Su,
            &sample_at(captured_at),
            request(ZoneSource::Device),
        )
        .expect("set");
        assert_eq!(outcome.command, "su -c 'date 101614002026.02'");
        assert_eq!(outcome.target_utc, reference_utc() + chrono::Duration::seconds(2));
        assert!(outcome.executed);
        assert_eq!(
            bridge.commands(),
            vec![
                "date +%z".to_string(),
                "su -c 'date 101614002026.02'".to_string()
            ]
        );
    }

    #[test]
    fn utc_zone_skips_device_query() {
        let bridge = ScriptedBridge::with_device("emu").on_prefix("date ", ok(""));
        let captured_at = Instant::now();
        let outcome = set_device_time(
            &bridge,
            &DeviceHandle::new("emu"),
            PrivilegeMethod::AlreadyRoot,
            &sample_at(captured_at),
            request(ZoneSource::Utc),
        )
        .expect("set");
        assert_eq!(outcome.command, "date 101612002026.00");
        assert_eq!(bridge.commands(), vec!["date 101612002026.00".to_string()]);
    }

    #[test]
    fn dry_run_issues_no_set_command() {
        let bridge = ScriptedBridge::with_device("emu");
        let captured_at = Instant::now();
        let outcome = set_device_time(
            &bridge,
            &DeviceHandle::new("emu"),
            PrivilegeMethod::Rootshell,
            &sample_at(captured_at),
            SetRequest {
                syntax: DateSyntax::Toolbox,
                zone: ZoneSource::Utc,
                dry_run: true,
            },
        )
        .expect("dry run");
        assert_eq!(outcome.command, "rootshell -c 'date -s 20261016.120000'");
        assert!(!outcome.executed);
        assert!(bridge.commands().is_empty());
    }

    #[test]
    fn nonzero_exit_is_set_failed() {
        let bridge = ScriptedBridge::with_device("emu")
            .on_prefix("su -c", fail(1, "date: cannot set date: Operation not permitted"));
        let captured_at = Instant::now();
        let err = set_device_time(
            &bridge,
            &DeviceHandle::new("emu"),
            PrivilegeMethod::Su,
            &sample_at(captured_at),
            request(ZoneSource::Utc),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::SetFailed(_)));
        assert!(err.to_string().contains("Operation not permitted"));
    }

    #[test]
    fn error_text_with_zero_exit_is_set_failed() {
        let bridge =
            ScriptedBridge::with_device("emu").on_prefix("su -c", ok("date: bad date '1016'\n"));
        let captured_at = Instant::now();
        let err = set_device_time(
            &bridge,
            &DeviceHandle::new("emu"),
            PrivilegeMethod::Su,
            &sample_at(captured_at),
            request(ZoneSource::Utc),
        )
        .unwrap_err();
        assert!(err.to_string().contains("rejected the date"));
    }

    #[test]
    fn none_method_cannot_set() {
        let bridge = ScriptedBridge::with_device("emu");
        let captured_at = Instant::now();
        let err = set_device_time(
            &bridge,
            &DeviceHandle::new("emu"),
            PrivilegeMethod::None,
            &sample_at(captured_at),
            request(ZoneSource::Utc),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::SetFailed(_)));
        assert!(bridge.commands().is_empty());
    }

    #[test]
    fn slow_offset_lookup_is_counted_in_the_set_value() {
        let bridge = ScriptedBridge::with_device("emu")
            .on("date +%z", ok("+0000\n"))
            .slow("date +%z", Duration::from_millis(1500))
            .on_prefix("date ", ok(""));
        let sample = sample_at(Instant::now());
        let outcome = set_device_time(
            &bridge,
            &DeviceHandle::new("emu"),
            PrivilegeMethod::AlreadyRoot,
            &sample,
            request(ZoneSource::Device),
        )
        .expect("set");
        let lag = outcome.target_utc - reference_utc();
        assert!(lag.num_milliseconds() >= 1000, "set value ignores lookup time: {lag}");
    }

    #[test]
    fn unreadable_device_offset_falls_back_to_host() {
        let bridge = ScriptedBridge::with_device("emu").on("date +%z", ok("CEST\n"));
        let at = reference_utc();
        let offset = resolve_offset(&bridge, &DeviceHandle::new("emu"), ZoneSource::Device, at);
        assert_eq!(offset, host_offset(at));
    }
}
