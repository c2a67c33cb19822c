//! Read-only diagnostics for `--check-root-only` and `--comprehensive-check`.

use std::time::Duration;

use tracing::instrument;

use crate::core::date_format::parse_utc_offset;
use crate::core::types::{DeviceHandle, PrivilegeMethod};
use crate::detect::{ProbeReport, probe_all};
use crate::error::SyncError;
use crate::io::adb::Bridge;
use crate::io::ntp::TimeSource;

/// Latency or failure of one configured time source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub host: String,
    pub result: Result<Duration, String>,
}

/// Everything the comprehensive check learned about a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub device: DeviceHandle,
    pub android_release: Option<String>,
    pub selinux: Option<String>,
    pub utc_offset: Option<String>,
    pub probes: Vec<ProbeReport>,
    pub sources: Vec<SourceReport>,
}

impl CheckReport {
    /// First method that passed, in probe order.
    pub fn usable_method(&self) -> Option<PrivilegeMethod> {
        self.probes
            .iter()
            .find(|probe| probe.available)
            .map(|probe| probe.method)
    }

    pub fn any_source_ok(&self) -> bool {
        self.sources.iter().any(|source| source.result.is_ok())
    }

    /// The stage error the report implies, if the device could not be synced.
    pub fn failure(&self) -> Option<SyncError> {
        if self.usable_method().is_none() {
            return Some(SyncError::NoPrivilege {
                device: self.device.to_string(),
                tried: self
                    .probes
                    .iter()
                    .map(|probe| probe.method.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        if !self.any_source_ok() {
            return Some(SyncError::NoTimeSource {
                failures: self
                    .sources
                    .iter()
                    .filter_map(|source| {
                        source
                            .result
                            .as_ref()
                            .err()
                            .map(|err| format!("{}: {err}", source.host))
                    })
                    .collect(),
            });
        }
        None
    }
}

/// Probe the device and every time source without changing anything.
#[instrument(skip_all, fields(device = %device))]
pub fn comprehensive_check<B: Bridge, T: TimeSource>(
    bridge: &B,
    source: &T,
    device: &DeviceHandle,
    servers: &[String],
    timeout: Duration,
) -> CheckReport {
    let android_release = read_trimmed(bridge, device, "getprop ro.build.version.release");
    let selinux = read_trimmed(bridge, device, "getenforce");
    let utc_offset =
        read_trimmed(bridge, device, "date +%z").filter(|raw| parse_utc_offset(raw).is_some());
    let probes = probe_all(bridge, device);
    let sources = servers
        .iter()
        .map(|host| SourceReport {
            host: host.clone(),
            result: source
                .query(host, timeout)
                .map(|sample| sample.latency)
                .map_err(|err| format!("{err:#}")),
        })
        .collect();

    CheckReport {
        device: device.clone(),
        android_release,
        selinux,
        utc_offset,
        probes,
        sources,
    }
}

fn read_trimmed<B: Bridge>(bridge: &B, device: &DeviceHandle, command: &str) -> Option<String> {
    let output = bridge.shell(device, command).ok()?;
    if !output.success() {
        return None;
    }
    let value = output.stdout.trim();
    (!value.is_empty()).then(|| value.to_string())
}
