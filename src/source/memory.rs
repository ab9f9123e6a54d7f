use super::{BatchStart, StreamSource};
use crate::errors::{SourceError, SourceResult};
use crate::types::{MessageRecord, RetentionPolicy, StreamInfo};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default)]
struct StoredStream {
    retention: RetentionPolicy,
    /// Sorted by sequence, unique
    messages: Vec<MessageRecord>,
    /// Highest sequence ever assigned; may exceed the last stored one
    last_assigned: Option<u64>,
}

/// In-memory stream store
///
/// Backs the dump-file source and doubles as a fixture in tests. Streams can be
/// marked as failing so that fetch-layer error handling is exercisable.
#[derive(Debug, Default)]
pub struct MemorySource {
    streams: BTreeMap<String, StoredStream>,
    failing: HashSet<String>,
    batch_requests: AtomicU64,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from loose records, all streams with limits retention
    pub fn from_messages(messages: impl IntoIterator<Item = MessageRecord>) -> Self {
        let mut source = Self::new();
        for msg in messages {
            source.insert(msg);
        }
        source
    }

    /// Store one message, replacing any previous message with the same sequence
    pub fn insert(&mut self, msg: MessageRecord) {
        let stream = self.streams.entry(msg.stream_name.clone()).or_default();
        match stream
            .messages
            .binary_search_by_key(&msg.sequence, |m| m.sequence)
        {
            Ok(pos) => stream.messages[pos] = msg,
            Err(pos) => stream.messages.insert(pos, msg),
        }
    }

    /// Declare a stream (possibly empty) with the given retention policy
    pub fn add_stream(&mut self, name: &str, retention: RetentionPolicy) {
        self.streams.entry(name.to_string()).or_default().retention = retention;
    }

    /// Record that sequences up to `last_seq` were assigned, even if not stored
    pub fn set_last_assigned(&mut self, name: &str, last_seq: u64) {
        self.streams.entry(name.to_string()).or_default().last_assigned = Some(last_seq);
    }

    /// Make every batch request against `name` fail
    pub fn fail_stream(&mut self, name: &str) {
        self.failing.insert(name.to_string());
    }

    /// Number of `get_batch` calls served so far
    pub fn batch_requests(&self) -> u64 {
        self.batch_requests.load(Ordering::Relaxed)
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    fn info_for(name: &str, stream: &StoredStream) -> StreamInfo {
        let first = stream.messages.first();
        let last = stream.messages.last();
        let last_stored = last.map(|m| m.sequence).unwrap_or(0);
        StreamInfo {
            name: name.to_string(),
            retention: stream.retention,
            first_seq: first.map(|m| m.sequence).unwrap_or(0),
            last_seq: stream.last_assigned.unwrap_or(last_stored).max(last_stored),
            first_timestamp: stream.messages.iter().map(|m| m.timestamp).min(),
            last_timestamp: stream.messages.iter().map(|m| m.timestamp).max(),
            message_count: stream.messages.len() as u64,
        }
    }
}

#[async_trait]
impl StreamSource for MemorySource {
    async fn list_streams(&self) -> SourceResult<Vec<StreamInfo>> {
        Ok(self
            .streams
            .iter()
            .map(|(name, stream)| Self::info_for(name, stream))
            .collect())
    }

    async fn get_batch(
        &self,
        stream: &str,
        start: BatchStart,
        count: usize,
    ) -> SourceResult<Vec<MessageRecord>> {
        self.batch_requests.fetch_add(1, Ordering::Relaxed);

        if self.failing.contains(stream) {
            return Err(SourceError::FetchFailed {
                stream: stream.to_string(),
                message: "stream marked as failing".to_string(),
            });
        }

        let stored = self
            .streams
            .get(stream)
            .ok_or_else(|| SourceError::StreamNotFound {
                name: stream.to_string(),
            })?;

        let from = match start {
            BatchStart::Sequence(seq) => stored.messages.partition_point(|m| m.sequence < seq),
            BatchStart::Time(ts) => stored
                .messages
                .iter()
                .position(|m| m.timestamp >= ts)
                .unwrap_or(stored.messages.len()),
        };

        Ok(stored.messages[from..]
            .iter()
            .take(count)
            .cloned()
            .collect())
    }
}
