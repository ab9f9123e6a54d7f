//! Time-range filtering and bucket downsampling
//!
//! Both operations derive a new histogram from an existing one without
//! touching raw messages. Filtering always recomputes statistics; downsampling
//! keeps the parent's full-resolution statistics unless asked not to.

use super::rate_stats::calculate_stats;
use crate::errors::{AppError, AppResult};
use crate::types::{RateBucket, RateHistogram};
use crate::utils::time::delta_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How merged buckets report their rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownsamplePolicy {
    /// Highest rate in the run, so short bursts stay visible
    #[default]
    Peak,
    /// Summed totals divided by the merged duration
    Average,
}

impl DownsamplePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            DownsamplePolicy::Peak => "max",
            DownsamplePolicy::Average => "avg",
        }
    }
}

impl fmt::Display for DownsamplePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DownsamplePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max" | "peak" => Ok(DownsamplePolicy::Peak),
            "avg" | "average" => Ok(DownsamplePolicy::Average),
            other => Err(AppError::InvalidArgument(format!(
                "unknown downsample policy {:?} (expected max or avg)",
                other
            ))),
        }
    }
}

/// Keep only buckets overlapping `[start, end)` and recompute statistics.
///
/// Open bounds are unbounded. A window matching nothing gives a zero-bucket
/// histogram.
pub fn filter_by_time(
    hist: &RateHistogram,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AppResult<RateHistogram> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(AppError::InvalidTimeRange(format!(
                "start {} is after end {}",
                s.to_rfc3339(),
                e.to_rfc3339()
            )));
        }
    }

    let buckets: Vec<RateBucket> = hist
        .buckets
        .iter()
        .filter(|b| start.map_or(true, |s| b.end > s) && end.map_or(true, |e| b.start < e))
        .cloned()
        .collect();

    let stats = calculate_stats(&buckets);
    Ok(RateHistogram {
        buckets,
        granularity: hist.granularity,
        stats,
    })
}

/// Merge adjacent buckets so at most `max_buckets` remain.
///
/// Runs are `ceil(N / max_buckets)` buckets long. Counts and bytes are always
/// summed; rates follow `policy`. Statistics are carried over from `hist`.
/// A histogram already within the limit is returned unchanged.
pub fn downsample(
    hist: &RateHistogram,
    max_buckets: usize,
    policy: DownsamplePolicy,
) -> AppResult<RateHistogram> {
    merge_runs(hist, max_buckets, policy, false)
}

/// Same as [`downsample`] but statistics describe the merged buckets.
pub fn downsample_recomputed(
    hist: &RateHistogram,
    max_buckets: usize,
    policy: DownsamplePolicy,
) -> AppResult<RateHistogram> {
    merge_runs(hist, max_buckets, policy, true)
}

fn merge_runs(
    hist: &RateHistogram,
    max_buckets: usize,
    policy: DownsamplePolicy,
    recompute: bool,
) -> AppResult<RateHistogram> {
    if max_buckets == 0 {
        return Err(AppError::InvalidArgument(
            "max_buckets must be at least 1".to_string(),
        ));
    }
    if hist.buckets.len() <= max_buckets {
        return Ok(hist.clone());
    }

    let factor = hist.buckets.len().div_ceil(max_buckets);
    let buckets: Vec<RateBucket> = hist
        .buckets
        .chunks(factor)
        .filter_map(|run| merge_run(run, policy))
        .collect();

    let stats = if recompute {
        calculate_stats(&buckets)
    } else {
        hist.stats.clone()
    };

    Ok(RateHistogram {
        buckets,
        granularity: hist.granularity * i32::try_from(factor).unwrap_or(i32::MAX),
        stats,
    })
}

fn merge_run(run: &[RateBucket], policy: DownsamplePolicy) -> Option<RateBucket> {
    let start = run.first()?.start;
    let end = run.last()?.end;

    let mut merged = RateBucket::empty(start, end);
    for bucket in run {
        if bucket.count > 0 {
            if merged.count == 0 {
                merged.min_msg_size = bucket.min_msg_size;
                merged.max_msg_size = bucket.max_msg_size;
            } else {
                merged.min_msg_size = merged.min_msg_size.min(bucket.min_msg_size);
                merged.max_msg_size = merged.max_msg_size.max(bucket.max_msg_size);
            }
        }
        merged.count += bucket.count;
        merged.seq_count += bucket.seq_count;
        merged.bytes += bucket.bytes;
        merged.message_sizes.extend_from_slice(&bucket.message_sizes);
        merged.first_seq = match (merged.first_seq, bucket.first_seq) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        merged.last_seq = match (merged.last_seq, bucket.last_seq) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        for (name, counts) in &bucket.per_source {
            merged.per_source.entry(name.clone()).or_default().merge(counts);
        }
    }

    match policy {
        DownsamplePolicy::Peak => {
            merged.rate = run.iter().map(|b| b.rate).fold(0.0, f64::max);
            merged.seq_rate = run.iter().map(|b| b.seq_rate).fold(0.0, f64::max);
            merged.throughput = run.iter().map(|b| b.throughput).fold(0.0, f64::max);
        }
        DownsamplePolicy::Average => merged.refresh_rates(delta_seconds(end - start)),
    }
    Some(merged)
}
