//! Rate histogram construction
//!
//! Turns the surviving messages of one or more streams into epoch-aligned,
//! fixed-width buckets. Besides the observed counts, every bucket receives a
//! share of the messages that sequence-number gaps show were published and
//! later removed.

use super::rate_stats::calculate_stats;
use crate::errors::{AppError, AppResult};
use crate::types::{MessageRecord, RateBucket, RateHistogram};
use crate::utils::time::{delta_nanos, delta_seconds, from_unix_nanos, to_unix_nanos, truncate_to};
use chrono::TimeDelta;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Upper bound on eagerly generated buckets
pub const MAX_BUCKETS: i64 = 10_000_000;

/// Bucket grid shared by bucketing and gap interpolation
#[derive(Debug, Clone, Copy)]
struct BucketGrid {
    start_ns: i64,
    width_ns: i64,
    len: usize,
}

impl BucketGrid {
    fn index_of(&self, ts_ns: i64) -> usize {
        let offset = (ts_ns - self.start_ns).div_euclid(self.width_ns);
        offset.clamp(0, self.len as i64 - 1) as usize
    }

    fn bounds(&self, idx: usize) -> (i64, i64) {
        let start = self.start_ns + idx as i64 * self.width_ns;
        (start, start + self.width_ns)
    }
}

/// Build a rate histogram from surviving messages.
///
/// Buckets cover `[truncate(min), truncate(max) + granularity)` including empty
/// ones. Input order does not matter. A per-source breakdown is recorded on
/// every bucket when the messages span more than one stream.
///
/// # Arguments
/// * `messages` - Surviving messages of one or more streams
/// * `granularity` - Bucket width, must be positive
///
/// # Returns
/// * `AppResult<RateHistogram>` - Zero buckets for empty input
pub fn build_histogram(
    messages: &[MessageRecord],
    granularity: TimeDelta,
) -> AppResult<RateHistogram> {
    let width_ns = delta_nanos(granularity);
    if width_ns <= 0 {
        return Err(AppError::InvalidGranularity(format!(
            "granularity must be positive, got {}",
            granularity
        )));
    }

    let (min_ts, max_ts) = match (
        messages.iter().map(|m| m.timestamp).min(),
        messages.iter().map(|m| m.timestamp).max(),
    ) {
        (Some(min), Some(max)) => (min, max),
        _ => return Ok(RateHistogram::empty(granularity)),
    };

    let start_ns = to_unix_nanos(truncate_to(min_ts, granularity));
    let last_start_ns = to_unix_nanos(truncate_to(max_ts, granularity));
    let bucket_count = (last_start_ns - start_ns) / width_ns + 1;
    if bucket_count > MAX_BUCKETS {
        return Err(AppError::InvalidGranularity(format!(
            "granularity {} would produce {} buckets (limit {})",
            granularity, bucket_count, MAX_BUCKETS
        )));
    }

    let grid = BucketGrid {
        start_ns,
        width_ns,
        len: bucket_count as usize,
    };
    let mut buckets: Vec<RateBucket> = (0..grid.len)
        .map(|i| {
            let (start, end) = grid.bounds(i);
            RateBucket::empty(from_unix_nanos(start), from_unix_nanos(end))
        })
        .collect();

    let stream_names: BTreeSet<&str> = messages.iter().map(|m| m.stream_name.as_str()).collect();
    let track_sources = stream_names.len() > 1;

    for msg in messages {
        let bucket = &mut buckets[grid.index_of(to_unix_nanos(msg.timestamp))];
        bucket.record_message(msg.sequence, msg.size);
        if track_sources {
            bucket
                .per_source
                .entry(msg.stream_name.clone())
                .or_default()
                .record_message(msg.sequence, msg.size);
        }
    }

    let deleted = interpolate_deletions(messages, &grid, &mut buckets, track_sources);

    let seconds = delta_seconds(granularity);
    for bucket in buckets.iter_mut() {
        bucket.refresh_rates(seconds);
    }

    debug!(
        "Built histogram: {} messages, {} streams, {} buckets, {} interpolated deletions",
        messages.len(),
        stream_names.len(),
        buckets.len(),
        deleted
    );

    let stats = calculate_stats(&buckets);
    Ok(RateHistogram {
        buckets,
        granularity,
        stats,
    })
}

/// Build one histogram per stream from that stream's own messages.
///
/// Each histogram has its own bucket span and exact size statistics, unlike a
/// view extracted from a combined histogram.
pub fn build_stream_histograms(
    messages: &[MessageRecord],
    granularity: TimeDelta,
) -> AppResult<BTreeMap<String, RateHistogram>> {
    let mut by_stream: BTreeMap<&str, Vec<MessageRecord>> = BTreeMap::new();
    for msg in messages {
        by_stream
            .entry(msg.stream_name.as_str())
            .or_default()
            .push(msg.clone());
    }
    by_stream
        .into_iter()
        .map(|(name, msgs)| Ok((name.to_string(), build_histogram(&msgs, granularity)?)))
        .collect()
}

/// Spread every per-stream sequence gap across the buckets it spans.
///
/// Returns the total number of interpolated messages.
fn interpolate_deletions(
    messages: &[MessageRecord],
    grid: &BucketGrid,
    buckets: &mut [RateBucket],
    track_sources: bool,
) -> u64 {
    let mut by_stream: BTreeMap<&str, Vec<(u64, i64)>> = BTreeMap::new();
    for msg in messages {
        by_stream
            .entry(msg.stream_name.as_str())
            .or_default()
            .push((msg.sequence, to_unix_nanos(msg.timestamp)));
    }

    let mut total = 0;
    for (stream, mut points) in by_stream {
        points.sort_unstable();
        for pair in points.windows(2) {
            let ((s1, t1), (s2, t2)) = (pair[0], pair[1]);
            if s2.saturating_sub(s1) <= 1 {
                continue;
            }
            let missing = s2 - s1 - 1;
            for (idx, share) in apportion_gap(missing, t1, t2, grid) {
                buckets[idx].seq_count += share;
                if track_sources {
                    buckets[idx]
                        .per_source
                        .entry(stream.to_string())
                        .or_default()
                        .seq_count += share;
                }
            }
            total += missing;
        }
    }
    total
}

/// Split `missing` messages over the buckets overlapping `(t1, t2)`.
///
/// Shares are proportional to overlap duration and rounded with the
/// largest-remainder method, so they always sum to `missing`. Equal remainders
/// favour the earlier bucket. A zero-length interval assigns everything to the
/// bucket containing `t1`.
fn apportion_gap(missing: u64, t1: i64, t2: i64, grid: &BucketGrid) -> Vec<(usize, u64)> {
    let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
    if lo == hi {
        return vec![(grid.index_of(lo), missing)];
    }

    let span = (hi - lo) as u128;
    let mut shares: Vec<(usize, u64, u128)> = (grid.index_of(lo)..=grid.index_of(hi))
        .filter_map(|idx| {
            let (b_start, b_end) = grid.bounds(idx);
            let overlap = hi.min(b_end) - lo.max(b_start);
            (overlap > 0).then(|| {
                let quota = missing as u128 * overlap as u128;
                (idx, (quota / span) as u64, quota % span)
            })
        })
        .collect();

    let assigned: u64 = shares.iter().map(|&(_, share, _)| share).sum();
    let mut leftover = missing - assigned;
    if leftover > 0 {
        let mut order: Vec<usize> = (0..shares.len()).collect();
        order.sort_by(|&a, &b| shares[b].2.cmp(&shares[a].2).then(a.cmp(&b)));
        for pos in order {
            if leftover == 0 {
                break;
            }
            shares[pos].1 += 1;
            leftover -= 1;
        }
    }

    shares
        .into_iter()
        .filter(|&(_, share, _)| share > 0)
        .map(|(idx, share, _)| (idx, share))
        .collect()
}
