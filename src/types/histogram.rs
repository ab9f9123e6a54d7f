use super::statistics::RateStatistics;
use crate::utils::math::per_second;
use crate::utils::time::duration_nanos;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-source counters carried by a bucket that aggregates several streams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub count: u64,
    pub seq_count: u64,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seq: Option<u64>,
}

impl SourceCounts {
    /// Count one stored message
    pub fn record_message(&mut self, sequence: u64, size: u64) {
        self.count += 1;
        self.seq_count += 1;
        self.bytes += size;
        self.first_seq = Some(self.first_seq.map_or(sequence, |s| s.min(sequence)));
        self.last_seq = Some(self.last_seq.map_or(sequence, |s| s.max(sequence)));
    }

    pub fn merge(&mut self, other: &SourceCounts) {
        self.count += other.count;
        self.seq_count += other.seq_count;
        self.bytes += other.bytes;
        self.first_seq = match (self.first_seq, other.first_seq) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_seq = match (self.last_seq, other.last_seq) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// One fixed-width time slice `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Stored messages whose timestamp falls in the bucket
    pub count: u64,
    /// Stored plus interpolated deleted messages
    pub seq_count: u64,
    pub bytes: u64,
    /// Stored messages per second
    pub rate: f64,
    /// Stored plus deleted messages per second
    pub seq_rate: f64,
    /// Stored bytes per second
    pub throughput: f64,
    pub min_msg_size: u64,
    pub max_msg_size: u64,
    /// Lowest stored sequence number seen in the bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seq: Option<u64>,
    /// Highest stored sequence number seen in the bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seq: Option<u64>,
    /// Observed payload sizes, kept for exact size statistics on any slice
    #[serde(skip)]
    pub message_sizes: Vec<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub per_source: BTreeMap<String, SourceCounts>,
}

impl RateBucket {
    pub fn empty(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            count: 0,
            seq_count: 0,
            bytes: 0,
            rate: 0.0,
            seq_rate: 0.0,
            throughput: 0.0,
            min_msg_size: 0,
            max_msg_size: 0,
            first_seq: None,
            last_seq: None,
            message_sizes: Vec::new(),
            per_source: BTreeMap::new(),
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Bucket holds at least one stored message
    pub fn is_active(&self) -> bool {
        self.count > 0
    }

    /// Gap evidence attributes deleted traffic here but nothing survived
    pub fn is_deletion_only(&self) -> bool {
        self.count == 0 && self.seq_count > 0
    }

    /// Interpolated deleted messages
    pub fn deleted_count(&self) -> u64 {
        self.seq_count.saturating_sub(self.count)
    }

    pub fn deleted_rate(&self) -> f64 {
        (self.seq_rate - self.rate).max(0.0)
    }

    /// Record a stored message
    pub fn record_message(&mut self, sequence: u64, size: u64) {
        if self.count == 0 {
            self.min_msg_size = size;
            self.max_msg_size = size;
        } else {
            self.min_msg_size = self.min_msg_size.min(size);
            self.max_msg_size = self.max_msg_size.max(size);
        }
        self.count += 1;
        self.seq_count += 1;
        self.bytes += size;
        self.message_sizes.push(size);
        self.first_seq = Some(self.first_seq.map_or(sequence, |s| s.min(sequence)));
        self.last_seq = Some(self.last_seq.map_or(sequence, |s| s.max(sequence)));
    }

    /// Recompute per-second values over the given span
    pub fn refresh_rates(&mut self, seconds: f64) {
        self.rate = per_second(self.count, seconds);
        self.seq_rate = per_second(self.seq_count, seconds);
        self.throughput = per_second(self.bytes, seconds);
    }
}

/// Chronological, fixed-granularity bucket sequence plus its statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateHistogram {
    pub buckets: Vec<RateBucket>,
    #[serde(rename = "granularity_ns", with = "duration_nanos")]
    pub granularity: TimeDelta,
    pub stats: RateStatistics,
}

impl RateHistogram {
    /// Zero-bucket histogram with zeroed statistics
    pub fn empty(granularity: TimeDelta) -> Self {
        Self {
            buckets: Vec::new(),
            granularity,
            stats: RateStatistics::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.buckets.first().map(|b| b.start)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.buckets.last().map(|b| b.end)
    }

    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn total_seq_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.seq_count).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.buckets.iter().map(|b| b.bytes).sum()
    }

    pub fn max_seq_rate(&self) -> f64 {
        self.buckets.iter().map(|b| b.seq_rate).fold(0.0, f64::max)
    }

    pub fn max_throughput(&self) -> f64 {
        self.buckets.iter().map(|b| b.throughput).fold(0.0, f64::max)
    }

    /// Names of all sources present in the per-source breakdowns
    pub fn source_names(&self) -> BTreeSet<String> {
        self.buckets
            .iter()
            .flat_map(|b| b.per_source.keys().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_message_tracks_sizes_and_sequences() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut bucket = RateBucket::empty(start, start + TimeDelta::seconds(1));
        bucket.record_message(12, 300);
        bucket.record_message(10, 100);
        bucket.record_message(11, 200);

        assert_eq!(bucket.count, 3);
        assert_eq!(bucket.seq_count, 3);
        assert_eq!(bucket.bytes, 600);
        assert_eq!(bucket.min_msg_size, 100);
        assert_eq!(bucket.max_msg_size, 300);
        assert_eq!(bucket.first_seq, Some(10));
        assert_eq!(bucket.last_seq, Some(12));
        assert!(bucket.is_active());
        assert!(!bucket.is_deletion_only());
    }

    #[test]
    fn test_deletion_only_bucket() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut bucket = RateBucket::empty(start, start + TimeDelta::seconds(2));
        bucket.seq_count = 4;
        bucket.refresh_rates(2.0);

        assert!(bucket.is_deletion_only());
        assert_eq!(bucket.deleted_count(), 4);
        assert_eq!(bucket.seq_rate, 2.0);
        assert_eq!(bucket.deleted_rate(), 2.0);
    }

    #[test]
    fn test_json_uses_granularity_nanos_and_omits_sizes() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut bucket = RateBucket::empty(start, start + TimeDelta::seconds(1));
        bucket.record_message(1, 42);
        let hist = RateHistogram {
            buckets: vec![bucket],
            granularity: TimeDelta::seconds(1),
            stats: RateStatistics::default(),
        };

        let json = serde_json::to_value(&hist).unwrap();
        assert_eq!(json["granularity_ns"], 1_000_000_000i64);
        assert!(json["buckets"][0].get("message_sizes").is_none());
        assert!(json["buckets"][0].get("per_source").is_none());
    }
}
