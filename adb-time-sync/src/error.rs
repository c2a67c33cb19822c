//! Typed stage errors for the sync pipeline.
//!
//! Each stage fails with its own variant so `main` can map it to a stable exit
//! code. Plumbing failures inside a stage stay `anyhow` and land in `Other`.

use thiserror::Error;

use crate::exit_codes;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no usable device: {0}")]
    NoDevice(String),

    #[error("multiple devices attached ({}); pass --device-id to pick one", .0.join(", "))]
    AmbiguousDevice(Vec<String>),

    #[error("no privilege escalation method works on {device} (tried {tried})")]
    NoPrivilege { device: String, tried: String },

    #[error("failed to get time from any NTP server:\n- {}", .failures.join("\n- "))]
    NoTimeSource { failures: Vec<String> },

    #[error("setting device time failed: {0}")]
    SetFailed(String),

    #[error("device clock drift {drift_ms}ms exceeds tolerance {tolerance_ms}ms")]
    DriftExceeded { drift_ms: i64, tolerance_ms: i64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::NoDevice(_) | SyncError::AmbiguousDevice(_) => exit_codes::NO_DEVICE,
            SyncError::NoPrivilege { .. } => exit_codes::NO_PRIVILEGE,
            SyncError::NoTimeSource { .. } => exit_codes::NO_TIME_SOURCE,
            SyncError::SetFailed(_) => exit_codes::SET_FAILED,
            // Drift is reported as a warning, never as a failed run.
            SyncError::DriftExceeded { .. } => exit_codes::OK,
            SyncError::Other(_) => exit_codes::INVALID,
        }
    }
}
