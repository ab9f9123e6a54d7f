use crate::utils::time::duration_nanos;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Sequence bounds and stored count a stream reported at discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedBounds {
    pub first_seq: u64,
    pub last_seq: u64,
    pub message_count: u64,
}

impl ReportedBounds {
    /// Sequence numbers inside the reported span that no longer hold a message
    pub fn estimated_deleted(&self) -> u64 {
        if self.last_seq < self.first_seq {
            return 0;
        }
        (self.last_seq - self.first_seq + 1).saturating_sub(self.message_count)
    }
}

/// Per-stream rollup of the analysed messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub name: String,
    pub messages: u64,
    pub bytes: u64,
    pub first_seq: u64,
    pub last_seq: u64,
    /// Sequence numbers from first to last inclusive
    pub sequence_span: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Stored messages per second over the report span
    pub msg_rate: f64,
    /// Sequence numbers advanced per second over the report span
    pub seq_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported: Option<ReportedBounds>,
}

impl StreamSummary {
    /// Sequence numbers in the analysed span without a surviving message
    pub fn missing_in_span(&self) -> u64 {
        self.sequence_span.saturating_sub(self.messages)
    }
}

/// Combined rollup over every analysed stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "duration_ns", with = "duration_nanos")]
    pub duration: TimeDelta,
    /// Streams discovered, including those without messages in range
    pub stream_count: usize,
    pub total_messages: u64,
    pub total_bytes: u64,
    /// Sum of per-stream sequence advances (last minus first)
    pub total_seqs: u64,
    pub msg_rate: f64,
    pub seq_rate: f64,
    pub throughput: f64,
    /// Ordered by message count descending, then name
    pub streams: Vec<StreamSummary>,
}

impl ReportSummary {
    /// Total deletions estimated from reported bounds, where known
    pub fn estimated_deleted(&self) -> u64 {
        self.streams
            .iter()
            .filter_map(|s| s.reported.map(|r| r.estimated_deleted()))
            .sum()
    }
}

/// Message and byte totals of one stream within a time window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamShare {
    pub name: String,
    pub messages: u64,
    pub seq_messages: u64,
    pub bytes: u64,
}
