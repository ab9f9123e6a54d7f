//! Mathematical utility functions for statistical analysis
//!
//! Percentage and per-second helpers with zero-division handling, shared by
//! the statistics code and the report formatters.

/// `part` as a percentage of `total`; zero when `total` is zero.
///
/// # Examples
/// ```
/// use traffic_history::utils::math::safe_percentage;
///
/// assert_eq!(safe_percentage(50, 100), 50.0);
/// assert_eq!(safe_percentage(1, 4), 25.0);
/// assert_eq!(safe_percentage(0, 100), 0.0);
/// assert_eq!(safe_percentage(50, 0), 0.0);
/// ```
#[inline]
pub fn safe_percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// [`safe_percentage`] for message and byte totals.
///
/// Values above 2^53 lose precision in the f64 conversion.
///
/// # Examples
/// ```
/// use traffic_history::utils::math::safe_percentage_u64;
///
/// assert_eq!(safe_percentage_u64(50, 100), 50.0);
/// assert_eq!(safe_percentage_u64(1_000_000_000, 2_000_000_000), 50.0);
/// assert_eq!(safe_percentage_u64(50, 0), 0.0);
/// ```
#[inline]
pub fn safe_percentage_u64(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Divide a count by a number of seconds, returning 0.0 for empty spans.
///
/// # Examples
/// ```
/// use traffic_history::utils::math::per_second;
///
/// assert_eq!(per_second(10, 2.0), 5.0);
/// assert_eq!(per_second(10, 0.0), 0.0);
/// ```
#[inline]
pub fn per_second(amount: u64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        amount as f64 / seconds
    } else {
        0.0
    }
}
