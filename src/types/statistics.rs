//! Rate statistics summarising a bucket slice
//!
//! Values here are always derived: the analysis layer computes a fresh
//! [`RateStatistics`] for whatever bucket slice it is handed.

use crate::utils::math::safe_percentage;
use crate::utils::time::duration_nanos;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Distribution summary for one metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub avg: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub p999: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

/// Aggregate view over a bucket sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateStatistics {
    pub total_messages: u64,
    pub total_bytes: u64,
    /// Stored plus interpolated deleted messages
    pub total_seq_messages: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "total_duration_ns", with = "duration_nanos")]
    pub total_duration: TimeDelta,
    /// Stored messages per second
    pub rate: MetricSummary,
    /// Messages per second with deletes interpolated
    pub seq_rate: MetricSummary,
    /// Bytes per second
    pub throughput: MetricSummary,
    /// Payload size in bytes
    pub msg_size: MetricSummary,
    pub first_seq: u64,
    pub last_seq: u64,
    /// Sequence-derived messages per second over the whole span
    pub overall_seq_rate: f64,
    pub active_buckets: usize,
    pub total_buckets: usize,
}

impl RateStatistics {
    /// Share of buckets holding at least one stored message
    pub fn coverage_pct(&self) -> f64 {
        safe_percentage(self.active_buckets, self.total_buckets)
    }

    /// Messages attributed to sequence gaps rather than observed directly
    pub fn deleted_messages(&self) -> u64 {
        self.total_seq_messages.saturating_sub(self.total_messages)
    }
}
