//! Time utilities for bucketed rate analysis
//!
//! Nanosecond conversions, epoch-aligned truncation, and parsing of the
//! duration and timestamp strings accepted on the command line.

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

/// Nanoseconds in one second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Timestamp formats accepted for `--start` / `--end`, tried in order after RFC 3339
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Nanoseconds since the Unix epoch, saturating outside the representable range
pub fn to_unix_nanos(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(if ts.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Inverse of [`to_unix_nanos`]
pub fn from_unix_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

/// Duration length in nanoseconds (saturating)
pub fn delta_nanos(delta: TimeDelta) -> i64 {
    delta.num_nanoseconds().unwrap_or(i64::MAX)
}

/// Duration length in fractional seconds
pub fn delta_seconds(delta: TimeDelta) -> f64 {
    delta_nanos(delta) as f64 / NANOS_PER_SECOND as f64
}

/// Truncate a timestamp down to a multiple of `granularity` measured from the Unix epoch.
///
/// Timestamps before the epoch round towards negative infinity.
///
/// # Examples
/// ```
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use traffic_history::utils::time::truncate_to;
///
/// let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 34, 56).unwrap();
/// let truncated = truncate_to(ts, TimeDelta::minutes(1));
/// assert_eq!(truncated, Utc.with_ymd_and_hms(2024, 1, 1, 12, 34, 0).unwrap());
/// ```
pub fn truncate_to(ts: DateTime<Utc>, granularity: TimeDelta) -> DateTime<Utc> {
    let g = delta_nanos(granularity);
    if g <= 0 {
        return ts;
    }
    let nanos = to_unix_nanos(ts);
    from_unix_nanos(nanos - nanos.rem_euclid(g))
}

/// Convert a (possibly fractional) Unix seconds value into a timestamp.
///
/// Returns `None` for non-finite or out-of-range input.
pub fn unix_seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let mut secs = whole as i64;
    let mut nanos = ((seconds - whole) * NANOS_PER_SECOND as f64).round() as i64;
    if nanos >= NANOS_PER_SECOND {
        secs = secs.checked_add(1)?;
        nanos -= NANOS_PER_SECOND;
    }
    DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
}

/// Parse a duration string such as `1s`, `500ms`, `1h30m` or `1.5h`.
///
/// Supported units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. A bare `0` is accepted.
///
/// # Examples
/// ```
/// use chrono::TimeDelta;
/// use traffic_history::utils::time::parse_duration;
///
/// assert_eq!(parse_duration("1s").unwrap(), TimeDelta::seconds(1));
/// assert_eq!(parse_duration("2h30m").unwrap(), TimeDelta::minutes(150));
/// assert_eq!(parse_duration("250ms").unwrap(), TimeDelta::milliseconds(250));
/// assert!(parse_duration("fast").is_err());
/// ```
pub fn parse_duration(input: &str) -> AppResult<TimeDelta> {
    let s = input.trim();
    let invalid = || AppError::Config(format!("invalid duration {:?}", input));

    if s.is_empty() {
        return Err(invalid());
    }
    let (negative, mut rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if rest == "0" {
        return Ok(TimeDelta::zero());
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60.0 * 1_000_000_000.0,
            "h" => 3_600.0 * 1_000_000_000.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total_nanos += value * unit_nanos;
    }

    if total_nanos > i64::MAX as f64 {
        return Err(invalid());
    }
    let nanos = total_nanos.round() as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

/// Parse a timestamp in RFC 3339 or one of the plain UTC layouts.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use traffic_history::utils::time::parse_timestamp;
///
/// let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
/// assert_eq!(parse_timestamp("2024-03-01T10:00:00Z").unwrap(), expected);
/// assert_eq!(parse_timestamp("2024-03-01 10:00:00").unwrap(), expected);
/// assert_eq!(parse_timestamp("2024-03-01 10:00").unwrap(), expected);
/// ```
pub fn parse_timestamp(input: &str) -> AppResult<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(AppError::Config(format!(
        "unable to parse timestamp {:?} (use RFC3339 or YYYY-MM-DD HH:MM:SS format)",
        input
    )))
}

/// Serde helper storing a [`TimeDelta`] as integer nanoseconds
pub mod duration_nanos {
    use super::delta_nanos;
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(delta_nanos(*delta))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        Ok(TimeDelta::nanoseconds(i64::deserialize(deserializer)?))
    }
}
