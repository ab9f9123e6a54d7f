//! Stream sources and message fetching
//!
//! A [`StreamSource`] is the collaborator that knows which streams exist and
//! can hand back batches of surviving messages. Everything above it (discovery,
//! the fetcher, the CLI) works against the trait so a dump file and an
//! in-memory fixture are interchangeable.

pub mod csv_dump;
pub mod discovery;
pub mod fetcher;
pub mod memory;
pub mod retry;

use crate::errors::{SourceError, SourceResult};
use crate::types::{MessageRecord, StreamInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use csv_dump::CsvDumpSource;
pub use discovery::discover_streams;
pub use fetcher::{FetchOptions, FetchStrategy, MessageFetcher, TimeWindow};
pub use memory::MemorySource;
pub use retry::{calculate_next_backoff, execute_with_timeout, RetryConfig};

/// Where a batch request starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStart {
    /// First message with a sequence number at or above this one
    Sequence(u64),
    /// First message stored at or after this instant
    Time(DateTime<Utc>),
}

#[async_trait]
pub trait StreamSource: Send + Sync {
    /// All streams the source can see, in no particular order
    async fn list_streams(&self) -> SourceResult<Vec<StreamInfo>>;

    /// Up to `count` surviving messages of `stream` in sequence order, starting at `start`
    async fn get_batch(
        &self,
        stream: &str,
        start: BatchStart,
        count: usize,
    ) -> SourceResult<Vec<MessageRecord>>;

    /// Metadata for a single stream
    async fn stream_info(&self, stream: &str) -> SourceResult<StreamInfo> {
        self.list_streams()
            .await?
            .into_iter()
            .find(|info| info.name == stream)
            .ok_or_else(|| SourceError::StreamNotFound {
                name: stream.to_string(),
            })
    }
}
