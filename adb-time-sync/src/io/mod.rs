//! I/O adapters: child processes, the debug bridge, NTP and config files.

pub mod adb;
pub mod config;
pub mod ntp;
pub mod process;
