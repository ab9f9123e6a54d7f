//! Utility functions for report formatting
//!
//! Provides shared formatting helpers used across all report formatters.

use crate::errors::AppResult;
use crate::utils::time::delta_seconds;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Layout used for bucket and span timestamps in console output
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format number with thousand separators for console output
///
/// # Arguments
///
/// * `n` - Number to format
///
/// # Returns
///
/// String with comma separators (e.g., "1,234,567")
///
/// # Examples
///
/// ```
/// # use traffic_history::analysis::reports::utils::format_number;
/// assert_eq!(format_number(1234), "1,234");
/// assert_eq!(format_number(1234567), "1,234,567");
/// assert_eq!(format_number(904233), "904,233");
/// ```
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format byte counts using binary units with one decimal (KB, MB, GB, ...)
///
/// # Examples
///
/// ```
/// # use traffic_history::analysis::reports::utils::format_bytes;
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let unit = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, unit)
}

/// Format a bytes-per-second rate, truncating to whole bytes
pub fn format_bytes_per_sec(rate: f64) -> String {
    format!("{}/s", format_bytes(rate.max(0.0) as u64))
}

/// Human-readable duration: `1.50s`, `2m5.0s`, `1h2m3.0s`
pub fn format_duration(delta: TimeDelta) -> String {
    if delta.is_zero() {
        return "0s".to_string();
    }
    let total = delta_seconds(delta);
    if total < 60.0 {
        return format!("{:.2}s", total);
    }
    if total < 3600.0 {
        let mins = (total / 60.0).floor();
        return format!("{}m{:.1}s", mins as u64, total - mins * 60.0);
    }
    let hours = (total / 3600.0).floor();
    let mins = ((total - hours * 3600.0) / 60.0).floor();
    let secs = total - hours * 3600.0 - mins * 60.0;
    format!("{}h{}m{:.1}s", hours as u64, mins as u64, secs)
}

/// Compact value for graph scales and bar labels
///
/// # Examples
///
/// ```
/// # use traffic_history::analysis::reports::utils::format_scale_value;
/// assert_eq!(format_scale_value(2_500_000.0), "2.5M");
/// assert_eq!(format_scale_value(1_200.0), "1.2K");
/// assert_eq!(format_scale_value(3.14159), "3.14");
/// ```
pub fn format_scale_value(v: f64) -> String {
    if v >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if v >= 1_000.0 {
        format!("{:.1}K", v / 1_000.0)
    } else if v >= 100.0 {
        format!("{:.0}", v)
    } else if v >= 10.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Format an optional timestamp, `-` when absent
pub fn format_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Export data as JSON for programmatic use
pub fn export_json<T: Serialize>(data: &T) -> AppResult<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| crate::errors::AppError::InvalidData(format!("JSON export failed: {}", e)))
}
