//! Parsing for `adb devices` listings.

use crate::core::types::DeviceEntry;

/// Parse the output of `adb devices` (or `adb devices -l`).
///
/// Skips the `List of devices attached` header, daemon start-up chatter
/// (`* daemon not running ...`) and blank lines. Extra `-l` columns are ignored.
pub fn parse_devices(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let serial = fields.next()?;
            let state = fields.next()?;
            Some(DeviceEntry {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

/// Serials of devices that accept shell commands, in listing order.
pub fn usable_serials(entries: &[DeviceEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.is_usable())
        .map(|entry| entry.serial.clone())
        .collect()
}
