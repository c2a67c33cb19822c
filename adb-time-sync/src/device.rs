//! Device selection from the `adb devices` listing.

use tracing::{debug, instrument, warn};

use crate::core::devices::usable_serials;
use crate::core::types::DeviceHandle;
use crate::error::SyncError;
use crate::io::adb::Bridge;

/// Pick the device to operate on.
///
/// With `requested`, the serial must be attached and usable. Without it, exactly
/// one usable device must be attached.
#[instrument(skip_all, fields(requested = ?requested))]
pub fn select_device<B: Bridge>(
    bridge: &B,
    requested: Option<&str>,
) -> Result<DeviceHandle, SyncError> {
    let entries = bridge
        .devices()
        .map_err(|err| SyncError::NoDevice(format!("adb not available: {err:#}")))?;

    for entry in entries.iter().filter(|entry| !entry.is_usable()) {
        warn!(serial = %entry.serial, state = %entry.state, "skipping device");
    }
    let usable = usable_serials(&entries);
    debug!(usable = usable.len(), listed = entries.len(), "device listing");

    if let Some(serial) = requested {
        if usable.iter().any(|candidate| candidate == serial) {
            return Ok(DeviceHandle::new(serial));
        }
        let state = entries
            .iter()
            .find(|entry| entry.serial == serial)
            .map(|entry| entry.state.as_str());
        return Err(SyncError::NoDevice(match state {
            Some(state) => format!("device {serial} is {state}"),
            None => format!("device {serial} is not attached"),
        }));
    }

    if usable.len() > 1 {
        return Err(SyncError::AmbiguousDevice(usable));
    }
    match usable.into_iter().next() {
        Some(serial) => Ok(DeviceHandle::new(serial)),
        None => Err(SyncError::NoDevice(
            "no devices found; connect a device and authorize USB debugging".to_string(),
        )),
    }
}
