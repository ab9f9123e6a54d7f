use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One surviving message as returned by a stream source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub stream_name: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Payload length in bytes
    pub size: u64,
}

impl MessageRecord {
    pub fn new(
        stream_name: impl Into<String>,
        sequence: u64,
        timestamp: DateTime<Utc>,
        size: u64,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            sequence,
            timestamp,
            size,
        }
    }
}

/// Sort messages chronologically, breaking ties by stream then sequence
pub fn sort_by_timestamp(messages: &mut [MessageRecord]) {
    messages.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.stream_name.cmp(&b.stream_name))
            .then_with(|| a.sequence.cmp(&b.sequence))
    });
}
