//! Rate statistics computation
//!
//! Every function here is a pure function of the bucket slice it is given, so
//! the same code serves freshly built histograms, time-filtered views and
//! per-source extractions.

use crate::types::{MetricSummary, RateBucket, RateStatistics};
use crate::utils::math::per_second;
use crate::utils::time::delta_seconds;

/// Linear-interpolated percentile of an ascending slice (R-7 definition).
///
/// # Arguments
/// * `sorted` - Values sorted in ascending order
/// * `p` - Quantile in `[0, 1]`
///
/// # Examples
/// ```
/// use traffic_history::analysis::rate_stats::percentile;
///
/// assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
/// assert_eq!(percentile(&[7.0], 0.99), 7.0);
/// assert_eq!(percentile(&[], 0.5), 0.0);
/// ```
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let idx = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = idx.floor() as usize;
            let upper = lower + 1;
            if upper >= n {
                return sorted[n - 1];
            }
            let weight = idx - lower as f64;
            sorted[lower] * (1.0 - weight) + sorted[upper] * weight
        }
    }
}

/// Mean, percentiles, extremes and population standard deviation of `values`.
///
/// The input is copied before sorting; an empty slice yields all zeros.
pub fn summarize(values: &[f64]) -> MetricSummary {
    if values.is_empty() {
        return MetricSummary::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    let avg = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;

    MetricSummary {
        avg,
        p50: percentile(&sorted, 0.50),
        p90: percentile(&sorted, 0.90),
        p99: percentile(&sorted, 0.99),
        p999: percentile(&sorted, 0.999),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        std_dev: variance.sqrt(),
    }
}

/// Message-size samples for a slice.
///
/// Uses the individual sizes when every stored message in the slice has one,
/// otherwise falls back to each active bucket's mean size.
fn message_size_samples(buckets: &[RateBucket], total_messages: u64) -> Vec<f64> {
    let recorded: usize = buckets.iter().map(|b| b.message_sizes.len()).sum();
    if recorded as u64 == total_messages {
        return buckets
            .iter()
            .flat_map(|b| b.message_sizes.iter().map(|&s| s as f64))
            .collect();
    }
    buckets
        .iter()
        .filter(|b| b.count > 0)
        .map(|b| b.bytes as f64 / b.count as f64)
        .collect()
}

/// Compute a fresh [`RateStatistics`] for an ordered bucket slice.
///
/// Totals, span and sequence bounds come from the buckets themselves; per-bucket
/// metrics use the rates stored on each bucket, so a peak-merged slice reports
/// its peaks.
pub fn calculate_stats(buckets: &[RateBucket]) -> RateStatistics {
    let (first, last) = match (buckets.first(), buckets.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return RateStatistics::default(),
    };

    let total_messages: u64 = buckets.iter().map(|b| b.count).sum();
    let total_bytes: u64 = buckets.iter().map(|b| b.bytes).sum();
    let total_seq_messages: u64 = buckets.iter().map(|b| b.seq_count).sum();
    let total_duration = last.end - first.start;

    let rates: Vec<f64> = buckets.iter().map(|b| b.rate).collect();
    let seq_rates: Vec<f64> = buckets.iter().map(|b| b.seq_rate).collect();
    let throughputs: Vec<f64> = buckets.iter().map(|b| b.throughput).collect();
    let sizes = message_size_samples(buckets, total_messages);

    RateStatistics {
        total_messages,
        total_bytes,
        total_seq_messages,
        start_time: Some(first.start),
        end_time: Some(last.end),
        total_duration,
        rate: summarize(&rates),
        seq_rate: summarize(&seq_rates),
        throughput: summarize(&throughputs),
        msg_size: summarize(&sizes),
        first_seq: buckets.iter().filter_map(|b| b.first_seq).min().unwrap_or(0),
        last_seq: buckets.iter().filter_map(|b| b.last_seq).max().unwrap_or(0),
        overall_seq_rate: per_second(total_seq_messages, delta_seconds(total_duration)),
        active_buckets: buckets.iter().filter(|b| b.is_active()).count(),
        total_buckets: buckets.len(),
    }
}
