use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Retention policy a stream is configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    #[default]
    Limits,
    Interest,
    WorkQueue,
}

impl RetentionPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            RetentionPolicy::Limits => "limits",
            RetentionPolicy::Interest => "interest",
            RetentionPolicy::WorkQueue => "workqueue",
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RetentionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "limits" => Ok(RetentionPolicy::Limits),
            "interest" => Ok(RetentionPolicy::Interest),
            "workqueue" | "work_queue" => Ok(RetentionPolicy::WorkQueue),
            other => Err(format!("unknown retention policy: {}", other)),
        }
    }
}

/// Stream metadata as reported by the source at discovery time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    #[serde(default)]
    pub retention: RetentionPolicy,
    pub first_seq: u64,
    pub last_seq: u64,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Messages currently stored
    pub message_count: u64,
}

impl StreamInfo {
    /// Number of sequence numbers the stream has assigned within its retained span
    pub fn sequence_span(&self) -> u64 {
        if self.message_count == 0 || self.last_seq < self.first_seq {
            0
        } else {
            self.last_seq - self.first_seq + 1
        }
    }

    /// Sequence numbers inside the retained span whose messages are gone
    pub fn deleted_within_span(&self) -> u64 {
        self.sequence_span().saturating_sub(self.message_count)
    }
}
