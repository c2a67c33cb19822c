//! Clock value formatting and parsing for Android `date`.

use chrono::{DateTime, FixedOffset, SubsecRound, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::core::types::DateSyntax;

/// Output fragments that mean `date` rejected the set even when it exited 0.
static SET_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(bad date|invalid|not permitted|permission denied|usage:|unknown option|not found|inaccessible)",
    )
    .unwrap()
});

/// Round `utc` to the nearest whole second; `date` cannot set sub-second values.
pub fn round_to_second(utc: DateTime<Utc>) -> DateTime<Utc> {
    utc.round_subsecs(0)
}

/// Format the `date` invocation that sets the clock to `local`.
pub fn set_command(syntax: DateSyntax, local: &DateTime<FixedOffset>) -> String {
    match syntax {
        DateSyntax::Toybox => format!("date {}", local.format("%m%d%H%M%Y.%S")),
        DateSyntax::Toolbox => format!("date -s {}", local.format("%Y%m%d.%H%M%S")),
    }
}

/// Parse `date +%z` output (`+0530`, `-0800`) into an offset.
pub fn parse_utc_offset(output: &str) -> Option<FixedOffset> {
    let raw = output.trim();
    let (sign, digits) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits = digits.replace(':', "");
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse `date +%s` (optionally `+%s.%N`) output into a UTC instant.
///
/// Older toybox builds echo `%N` literally, so a non-numeric fraction is ignored.
pub fn parse_device_epoch(output: &str) -> Option<DateTime<Utc>> {
    let raw = output.trim();
    let (secs, frac) = match raw.split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (raw, ""),
    };
    let secs: i64 = secs.parse().ok()?;
    let nanos = if !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()) {
        let mut padded: String = frac.chars().take(9).collect();
        while padded.len() < 9 {
            padded.push('0');
        }
        padded.parse().ok()?
    } else {
        0
    };
    Utc.timestamp_opt(secs, nanos).single()
}

/// True when `date` output signals that the clock was not set.
pub fn set_output_is_malformed(output: &str) -> bool {
    SET_FAILURE.is_match(output)
}
