//! Time source resolution with ordered fallback.

use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::core::types::TimeSample;
use crate::error::SyncError;
use crate::io::ntp::TimeSource;

/// Query `servers` in order and return the first successful sample.
#[instrument(skip_all, fields(servers = servers.len(), timeout_secs = timeout.as_secs()))]
pub fn resolve_time<T: TimeSource>(
    source: &T,
    servers: &[String],
    timeout: Duration,
) -> Result<TimeSample, SyncError> {
    let mut failures = Vec::new();
    for host in servers {
        match source.query(host, timeout) {
            Ok(sample) => {
                info!(
                    host = %sample.source,
                    utc = %sample.utc,
                    latency_ms = sample.latency.as_millis() as u64,
                    "time source answered"
                );
                return Ok(sample);
            }
            Err(err) => {
                warn!(host = %host, err = %format!("{err:#}"), "time source failed");
                failures.push(format!("{host}: {err:#}"));
            }
        }
    }
    Err(SyncError::NoTimeSource { failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTimeSource, reference_utc};

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn falls_back_to_next_host() {
        let source = ScriptedTimeSource::default()
            .fail("time.google.com", "timed out")
            .answer("time.windows.com", reference_utc())
            .answer("pool.ntp.org", reference_utc());
        let sample = resolve_time(
            &source,
            &hosts(&["time.google.com", "time.windows.com", "pool.ntp.org"]),
            Duration::from_secs(1),
        )
        .expect("sample");
        assert_eq!(sample.source, "time.windows.com");
        assert_eq!(sample.utc, reference_utc());
        assert_eq!(
            source.queried(),
            hosts(&["time.google.com", "time.windows.com"])
        );
    }

    #[test]
    fn all_failures_are_reported() {
        let source = ScriptedTimeSource::default()
            .fail("a.example", "timed out")
            .fail("b.example", "host unreachable");
        let err = resolve_time(
            &source,
            &hosts(&["a.example", "b.example"]),
            Duration::from_secs(1),
        )
        .unwrap_err();
        match err {
            SyncError::NoTimeSource { failures } => {
                assert_eq!(
                    failures,
                    hosts(&["a.example: timed out", "b.example: host unreachable"])
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
