//! Privilege detection: find a way to run root commands on the device.

use tracing::{debug, info, instrument};

use crate::core::privilege::{CAPABILITY_PROBE, reports_root_uid, wrap_command};
use crate::core::types::{DeviceHandle, PrivilegeMethod};
use crate::error::SyncError;
use crate::io::adb::Bridge;

/// Capability test result for one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub method: PrivilegeMethod,
    pub available: bool,
    /// Last line of probe output, or the transport error.
    pub detail: String,
}

/// Run the capability probe for `method`.
pub fn probe_method<B: Bridge>(
    bridge: &B,
    device: &DeviceHandle,
    method: PrivilegeMethod,
) -> ProbeReport {
    let Some(command) = wrap_command(method, CAPABILITY_PROBE) else {
        return ProbeReport {
            method,
            available: false,
            detail: "no command form".to_string(),
        };
    };
    match bridge.shell(device, &command) {
        Ok(output) => {
            // Old adb servers always exit 0, so the uid check decides.
            let available = !output.timed_out && reports_root_uid(&output.stdout);
            let detail = if output.timed_out {
                "timed out".to_string()
            } else {
                output
                    .combined()
                    .lines()
                    .last()
                    .unwrap_or_default()
                    .to_string()
            };
            debug!(%method, available, exit_code = ?output.exit_code, "probe");
            ProbeReport {
                method,
                available,
                detail,
            }
        }
        Err(err) => ProbeReport {
            method,
            available: false,
            detail: format!("{err:#}"),
        },
    }
}

/// Probe su, sudo, rootshell and ambient root in order; first working method wins.
#[instrument(skip_all, fields(device = %device))]
pub fn detect_privilege<B: Bridge>(
    bridge: &B,
    device: &DeviceHandle,
) -> Result<PrivilegeMethod, SyncError> {
    for method in PrivilegeMethod::PROBE_ORDER {
        if probe_method(bridge, device, method).available {
            info!(%method, "privilege method detected");
            return Ok(method);
        }
    }
    Err(SyncError::NoPrivilege {
        device: device.to_string(),
        tried: tried_list(),
    })
}

/// Probe every method without stopping at the first success.
#[instrument(skip_all, fields(device = %device))]
pub fn probe_all<B: Bridge>(bridge: &B, device: &DeviceHandle) -> Vec<ProbeReport> {
    PrivilegeMethod::PROBE_ORDER
        .iter()
        .map(|method| probe_method(bridge, device, *method))
        .collect()
}

fn tried_list() -> String {
    PrivilegeMethod::PROBE_ORDER
        .iter()
        .map(|method| method.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedBridge, fail, ok};

    #[test]
    fn su_wins_when_everything_works() {
        let bridge = ScriptedBridge::with_device("emu")
            .on("su -c 'id -u'", ok("0\n"))
            .on("sudo sh -c 'id -u'", ok("0\n"))
            .on("id -u", ok("0\n"));
        let device = DeviceHandle::new("emu");
        let method = detect_privilege(&bridge, &device).expect("method");
        assert_eq!(method, PrivilegeMethod::Su);
        assert_eq!(bridge.commands(), vec!["su -c 'id -u'".to_string()]);
    }

    #[test]
    fn falls_through_to_rootshell() {
        let bridge = ScriptedBridge::with_device("emu")
            .on("su -c 'id -u'", fail(1, "su: permission denied"))
            .on("rootshell -c 'id -u'", ok("0\n"))
            .on("id -u", ok("2000\n"));
        let device = DeviceHandle::new("emu");
        let method = detect_privilege(&bridge, &device).expect("method");
        assert_eq!(method, PrivilegeMethod::Rootshell);
        assert_eq!(
            bridge.commands(),
            vec![
                "su -c 'id -u'".to_string(),
                "sudo sh -c 'id -u'".to_string(),
                "rootshell -c 'id -u'".to_string(),
            ]
        );
    }

    #[test]
    fn adb_root_is_detected_as_already_root() {
        let bridge = ScriptedBridge::with_device("emu").on("id -u", ok("0\n"));
        let method = detect_privilege(&bridge, &DeviceHandle::new("emu")).expect("method");
        assert_eq!(method, PrivilegeMethod::AlreadyRoot);
    }

    #[test]
    fn shell_uid_only_is_no_privilege() {
        let bridge = ScriptedBridge::with_device("emu").on("id -u", ok("2000\n"));
        let err = detect_privilege(&bridge, &DeviceHandle::new("emu")).unwrap_err();
        assert!(matches!(err, SyncError::NoPrivilege { .. }));
        assert!(err.to_string().contains("su, sudo, rootshell, already-root"));
    }

    #[test]
    fn probe_all_reports_every_method() {
        let bridge = ScriptedBridge::with_device("emu")
            .on("sudo sh -c 'id -u'", ok("0\n"))
            .on("id -u", ok("2000\n"));
        let reports = probe_all(&bridge, &DeviceHandle::new("emu"));
        let available: Vec<(PrivilegeMethod, bool)> = reports
            .iter()
            .map(|report| (report.method, report.available))
            .collect();
        assert_eq!(
            available,
            vec![
                (PrivilegeMethod::Su, false),
                (PrivilegeMethod::Sudo, true),
                (PrivilegeMethod::Rootshell, false),
                (PrivilegeMethod::AlreadyRoot, false),
            ]
        );
        assert!(reports[0].detail.contains("not found"));
        assert_eq!(reports[3].detail, "2000");
    }
}
