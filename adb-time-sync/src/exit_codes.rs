//! Stable exit codes for the `adb-time-sync` CLI.

/// Clock set (or check passed). Drift warnings still exit with this code.
pub const OK: i32 = 0;
/// Invalid usage/config or an error that does not belong to a sync stage.
pub const INVALID: i32 = 1;
/// No usable device: none attached, ambiguous selection, unknown serial, or adb missing.
pub const NO_DEVICE: i32 = 2;
/// No privilege escalation method passed its capability test.
pub const NO_PRIVILEGE: i32 = 3;
/// Every configured NTP server failed.
pub const NO_TIME_SOURCE: i32 = 4;
/// The privileged `date` command failed or printed an error.
pub const SET_FAILED: i32 = 5;
