//! Sync configuration, optionally stored in `adb-time-sync.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::{DateSyntax, ZoneSource};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "adb-time-sync.toml";

/// NTP servers in order of preference.
pub const DEFAULT_SERVERS: [&str; 5] = [
    "time.google.com",
    "time.windows.com",
    "pool.ntp.org",
    "time.nist.gov",
    "time.apple.com",
];

/// Sync configuration (TOML).
///
/// Every field is optional in the file; CLI flags override whatever is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// NTP hosts, tried in order until one answers.
    pub servers: Vec<String>,

    /// Per-server NTP query timeout in seconds.
    pub ntp_timeout_secs: u64,

    /// Timeout for each `adb` invocation in seconds.
    pub command_timeout_secs: u64,

    /// Discard `adb` stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Verification drift above this many seconds is reported as a warning.
    pub drift_tolerance_secs: u64,

    /// Path or name of the `adb` binary.
    pub adb_path: String,

    pub date_syntax: DateSyntax,

    pub zone: ZoneSource,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            servers: DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect(),
            ntp_timeout_secs: 5,
            command_timeout_secs: 30,
            output_limit_bytes: 64_000,
            drift_tolerance_secs: 5,
            adb_path: "adb".to_string(),
            date_syntax: DateSyntax::default(),
            zone: ZoneSource::default(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(anyhow!("servers must list at least one NTP host"));
        }
        if self.servers.iter().any(|s| s.trim().is_empty()) {
            return Err(anyhow!("servers must not contain blank host names"));
        }
        if self.ntp_timeout_secs == 0 {
            return Err(anyhow!("ntp_timeout_secs must be > 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.adb_path.trim().is_empty() {
            return Err(anyhow!("adb_path must not be empty"));
        }
        Ok(())
    }

    pub fn ntp_timeout(&self) -> Duration {
        Duration::from_secs(self.ntp_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn drift_tolerance(&self) -> Duration {
        Duration::from_secs(self.drift_tolerance_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SyncConfig::default()`.
pub fn load_config(path: &Path) -> Result<SyncConfig> {
    if !path.exists() {
        let cfg = SyncConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SyncConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
