//! Network time source abstraction.
//!
//! [`SntpTimeSource`] asks a server through `rsntp`; the protocol itself is not
//! implemented here. Tests swap in scripted sources via [`TimeSource`].

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rsntp::SntpClient;
use tracing::{debug, instrument};

use crate::core::types::TimeSample;

/// A queryable source of true UTC time.
pub trait TimeSource {
    /// Query `host`, giving up after `timeout`.
    fn query(&self, host: &str, timeout: Duration) -> Result<TimeSample>;
}

/// SNTP client over UDP port 123.
#[derive(Debug, Default, Clone, Copy)]
pub struct SntpTimeSource;

impl TimeSource for SntpTimeSource {
    #[instrument(skip_all, fields(host = %host, timeout_secs = timeout.as_secs()))]
    fn query(&self, host: &str, timeout: Duration) -> Result<TimeSample> {
        let mut client = SntpClient::new();
        client.set_timeout(timeout);

        let started = Instant::now();
        let result = client
            .synchronize(host)
            .with_context(|| format!("query {host}"))?;
        let captured_at = Instant::now();

        let system_time = result
            .datetime()
            .into_system_time()
            .with_context(|| format!("convert time from {host}"))?;
        let utc = DateTime::<Utc>::from(system_time);
        let latency = captured_at.duration_since(started);
        debug!(%utc, latency_ms = latency.as_millis() as u64, "ntp reply");

        Ok(TimeSample {
            source: host.to_string(),
            utc,
            latency,
            captured_at,
        })
    }
}
