//! Per-source views of a combined histogram
//!
//! A histogram built over several streams keeps a per-source breakdown on
//! every bucket; these helpers read it back without re-fetching messages.

use super::rate_stats::calculate_stats;
use crate::types::{RateBucket, RateHistogram, StreamShare};
use crate::utils::time::delta_seconds;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Single-stream histogram taken from a combined histogram's breakdown.
///
/// Returns `None` when no bucket carries the named source. Buckets keep their
/// bounds; statistics are recomputed and size statistics degrade to
/// per-bucket means because individual sizes are not tracked per source.
pub fn extract_source_histogram(combined: &RateHistogram, name: &str) -> Option<RateHistogram> {
    if !combined.buckets.iter().any(|b| b.per_source.contains_key(name)) {
        return None;
    }

    let buckets: Vec<RateBucket> = combined
        .buckets
        .iter()
        .map(|b| {
            let mut bucket = RateBucket::empty(b.start, b.end);
            if let Some(counts) = b.per_source.get(name) {
                bucket.count = counts.count;
                bucket.seq_count = counts.seq_count;
                bucket.bytes = counts.bytes;
                bucket.first_seq = counts.first_seq;
                bucket.last_seq = counts.last_seq;
                bucket.refresh_rates(delta_seconds(b.duration()));
            }
            bucket
        })
        .collect();

    let stats = calculate_stats(&buckets);
    Some(RateHistogram {
        buckets,
        granularity: combined.granularity,
        stats,
    })
}

/// Per-stream totals for buckets overlapping `[start, end)`.
///
/// Streams without stored messages in the window are omitted. Sorted by
/// message count descending, then name.
pub fn stream_distribution(
    combined: &RateHistogram,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<StreamShare> {
    let mut totals: BTreeMap<&str, StreamShare> = BTreeMap::new();
    for bucket in combined
        .buckets
        .iter()
        .filter(|b| start.map_or(true, |s| b.end > s) && end.map_or(true, |e| b.start < e))
    {
        for (name, counts) in &bucket.per_source {
            let share = totals.entry(name.as_str()).or_insert_with(|| StreamShare {
                name: name.clone(),
                messages: 0,
                seq_messages: 0,
                bytes: 0,
            });
            share.messages += counts.count;
            share.seq_messages += counts.seq_count;
            share.bytes += counts.bytes;
        }
    }

    let mut shares: Vec<StreamShare> = totals
        .into_values()
        .filter(|s| s.messages > 0)
        .collect();
    shares.sort_by(|a, b| b.messages.cmp(&a.messages).then_with(|| a.name.cmp(&b.name)));
    shares
}
