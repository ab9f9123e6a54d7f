//! Message fetching
//!
//! Pulls surviving messages for each stream by advancing a sequence cursor
//! across batched requests. Two variants share the same contract:
//!
//! - **Sequential** walks the cursor one batch at a time and stops early once
//!   the time window or the limit is exhausted.
//! - **Concurrent** splits the stream's sequence span into fixed sub-ranges,
//!   fetches them with bounded concurrency into a position-indexed buffer and
//!   joins them in order.
//!
//! Either way the result is in sequence order, deduplicated, restricted to the
//! time window and truncated to the limit.

use super::retry::{retry_with_backoff, RetryConfig};
use super::{BatchStart, StreamSource};
use crate::errors::{AppError, AppResult, SourceError, SourceResult};
use crate::types::{MessageRecord, StreamInfo};
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How batches are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    #[default]
    Sequential,
    Concurrent,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::Sequential => f.write_str("sequential"),
            FetchStrategy::Concurrent => f.write_str("concurrent"),
        }
    }
}

impl FromStr for FetchStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Ok(FetchStrategy::Sequential),
            "concurrent" | "parallel" => Ok(FetchStrategy::Concurrent),
            other => Err(AppError::InvalidArgument(format!(
                "unknown fetch strategy '{}' (use sequential or concurrent)",
                other
            ))),
        }
    }
}

/// Half-open time window `[start, end)`; either side may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> AppResult<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AppError::InvalidTimeRange(format!(
                    "start {} is after end {}",
                    s.to_rfc3339(),
                    e.to_rfc3339()
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Combine explicit bounds with a relative `since` duration measured back from `now`
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        since: Option<TimeDelta>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        match since {
            Some(_) if start.is_some() => Err(AppError::InvalidTimeRange(
                "--since cannot be combined with --start".to_string(),
            )),
            Some(d) if d <= TimeDelta::zero() => Err(AppError::InvalidTimeRange(format!(
                "--since must be positive, got {}s",
                d.num_seconds()
            ))),
            Some(d) => Self::new(Some(now - d), end),
            None => Self::new(start, end),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| ts >= s) && self.end.is_none_or(|e| ts < e)
    }

    fn is_past_end(&self, ts: DateTime<Utc>) -> bool {
        self.end.is_some_and(|e| ts >= e)
    }
}

/// Fetch settings shared by every stream in a run
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub batch_size: usize,
    /// Maximum messages kept per stream
    pub limit: Option<usize>,
    pub window: TimeWindow,
    pub strategy: FetchStrategy,
    /// In-flight batch requests for the concurrent strategy
    pub concurrency: usize,
    pub retry: RetryConfig,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            limit: None,
            window: TimeWindow::default(),
            strategy: FetchStrategy::default(),
            concurrency: 8,
            retry: RetryConfig::default(),
        }
    }
}

impl FetchOptions {
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::InvalidArgument(
                "batch size must be positive".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(AppError::InvalidArgument(
                "concurrency must be positive".to_string(),
            ));
        }
        if self.limit == Some(0) {
            return Err(AppError::InvalidArgument(
                "limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Messages gathered across streams plus the streams that could not be read
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub messages: Vec<MessageRecord>,
    pub fetched_streams: Vec<String>,
    pub skipped_streams: Vec<String>,
}

pub struct MessageFetcher<'a> {
    source: &'a dyn StreamSource,
    options: FetchOptions,
}

impl<'a> MessageFetcher<'a> {
    pub fn new(source: &'a dyn StreamSource, options: FetchOptions) -> AppResult<Self> {
        options.validate()?;
        Ok(Self { source, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch every stream in turn; streams whose fetch fails are skipped with a warning
    pub async fn fetch_all(&self, streams: &[StreamInfo]) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        for info in streams {
            match self.fetch_stream(info).await {
                Ok(mut messages) => {
                    info!("Fetched {} messages from {}", messages.len(), info.name);
                    outcome.messages.append(&mut messages);
                    outcome.fetched_streams.push(info.name.clone());
                }
                Err(e) => {
                    warn!("Skipping stream {}: {}", info.name, e);
                    outcome.skipped_streams.push(info.name.clone());
                }
            }
        }
        outcome
    }

    /// Surviving messages of one stream in sequence order
    pub async fn fetch_stream(&self, info: &StreamInfo) -> SourceResult<Vec<MessageRecord>> {
        if info.message_count == 0 {
            return Ok(Vec::new());
        }
        let mut messages = match self.options.strategy {
            FetchStrategy::Sequential => self.fetch_sequential(info).await?,
            FetchStrategy::Concurrent => self.fetch_concurrent(info).await?,
        };

        messages.sort_by_key(|m| m.sequence);
        messages.dedup_by_key(|m| m.sequence);
        if let Some(limit) = self.options.limit {
            messages.truncate(limit);
        }
        Ok(messages)
    }

    async fn fetch_sequential(&self, info: &StreamInfo) -> SourceResult<Vec<MessageRecord>> {
        let source = self.source;
        let name = info.name.as_str();
        let batch_size = self.options.batch_size;
        let window = self.options.window;
        let limit = self.options.limit.unwrap_or(usize::MAX);

        let mut cursor = match window.start {
            Some(start) => BatchStart::Time(start),
            None => BatchStart::Sequence(info.first_seq),
        };
        let mut messages = Vec::new();
        let mut batches = 0usize;

        'batches: loop {
            let batch = retry_with_backoff(&self.options.retry, "get_batch", move || {
                source.get_batch(name, cursor, batch_size)
            })
            .await?;
            batches += 1;

            let Some(last_seq) = batch.last().map(|m| m.sequence) else {
                break;
            };
            let received = batch.len();
            debug!(
                "{}: batch {} returned {} messages up to seq {}",
                name, batches, received, last_seq
            );

            for msg in batch {
                if window.is_past_end(msg.timestamp) {
                    break 'batches;
                }
                if window.contains(msg.timestamp) {
                    messages.push(msg);
                    if messages.len() >= limit {
                        break 'batches;
                    }
                }
            }

            if received < batch_size || last_seq >= info.last_seq || last_seq == u64::MAX {
                break;
            }
            cursor = BatchStart::Sequence(last_seq + 1);
        }

        Ok(messages)
    }

    async fn fetch_concurrent(&self, info: &StreamInfo) -> SourceResult<Vec<MessageRecord>> {
        let source = self.source;
        let name = info.name.as_str();
        let retry = &self.options.retry;
        let window = self.options.window;
        let ranges = sequence_ranges(info.first_seq, info.last_seq, self.options.batch_size as u64);

        let results: Vec<(usize, SourceResult<Vec<MessageRecord>>)> =
            stream::iter(ranges.iter().copied().enumerate())
                .map(|(index, (lo, hi))| async move {
                    let count = usize::try_from(hi - lo + 1).unwrap_or(usize::MAX);
                    let result = retry_with_backoff(retry, "get_batch", move || {
                        source.get_batch(name, BatchStart::Sequence(lo), count)
                    })
                    .await
                    .map(|batch| {
                        batch
                            .into_iter()
                            .filter(|m| m.sequence <= hi)
                            .collect::<Vec<_>>()
                    });
                    (index, result)
                })
                .buffer_unordered(self.options.concurrency)
                .collect()
                .await;

        let mut slots: Vec<Option<Vec<MessageRecord>>> = vec![None; ranges.len()];
        for (index, result) in results {
            slots[index] = Some(result?);
        }

        let mut messages = Vec::new();
        for (index, slot) in slots.into_iter().enumerate() {
            let batch = slot.ok_or_else(|| SourceError::FetchFailed {
                stream: name.to_string(),
                message: format!("range {} produced no result", index),
            })?;
            messages.extend(batch.into_iter().filter(|m| window.contains(m.timestamp)));
        }
        debug!(
            "{}: {} ranges fetched concurrently, {} messages kept",
            name,
            ranges.len(),
            messages.len()
        );
        Ok(messages)
    }
}

/// Split `[first, last]` into inclusive sub-ranges of at most `width` sequences
fn sequence_ranges(first: u64, last: u64, width: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    if last < first || width == 0 {
        return ranges;
    }
    let mut lo = first;
    loop {
        let hi = lo.saturating_add(width - 1).min(last);
        ranges.push((lo, hi));
        if hi >= last {
            break;
        }
        lo = hi + 1;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// Sequences 1..=20 with every third one missing, one second apart
    fn source() -> MemorySource {
        MemorySource::from_messages((1u64..=20).filter(|s| s % 3 != 0).map(|seq| {
            MessageRecord::new("ORDERS", seq, base() + TimeDelta::seconds(seq as i64), 10)
        }))
    }

    async fn info(src: &MemorySource) -> StreamInfo {
        src.stream_info("ORDERS").await.unwrap()
    }

    fn options(strategy: FetchStrategy) -> FetchOptions {
        FetchOptions {
            batch_size: 4,
            strategy,
            ..FetchOptions::default()
        }
    }

    #[test]
    fn test_sequence_ranges() {
        assert_eq!(sequence_ranges(1, 10, 4), vec![(1, 4), (5, 8), (9, 10)]);
        assert_eq!(sequence_ranges(5, 5, 100), vec![(5, 5)]);
        assert!(sequence_ranges(5, 4, 10).is_empty());
    }

    #[test]
    fn test_time_window_resolution() {
        let now = base();
        let w = TimeWindow::resolve(None, None, Some(TimeDelta::hours(1)), now).unwrap();
        assert_eq!(w.start, Some(now - TimeDelta::hours(1)));

        assert!(matches!(
            TimeWindow::resolve(Some(now), None, Some(TimeDelta::hours(1)), now),
            Err(AppError::InvalidTimeRange(_))
        ));
        assert!(matches!(
            TimeWindow::new(Some(now), Some(now - TimeDelta::seconds(1))),
            Err(AppError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn test_window_is_half_open() {
        let w = TimeWindow::new(Some(base()), Some(base() + TimeDelta::seconds(2))).unwrap();
        assert!(w.contains(base()));
        assert!(w.contains(base() + TimeDelta::seconds(1)));
        assert!(!w.contains(base() + TimeDelta::seconds(2)));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let src = MemorySource::new();
        let opts = FetchOptions {
            batch_size: 0,
            ..FetchOptions::default()
        };
        assert!(matches!(
            MessageFetcher::new(&src, opts),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_strategies_agree() {
        let src = source();
        let info = info(&src).await;
        let seq = MessageFetcher::new(&src, options(FetchStrategy::Sequential))
            .unwrap()
            .fetch_stream(&info)
            .await
            .unwrap();
        let con = MessageFetcher::new(&src, options(FetchStrategy::Concurrent))
            .unwrap()
            .fetch_stream(&info)
            .await
            .unwrap();
        assert_eq!(seq.len(), 14);
        assert_eq!(seq, con);
    }

    #[tokio::test]
    async fn test_window_and_limit() {
        let src = source();
        let info = info(&src).await;
        for strategy in [FetchStrategy::Sequential, FetchStrategy::Concurrent] {
            let opts = FetchOptions {
                window: TimeWindow::new(
                    Some(base() + TimeDelta::seconds(4)),
                    Some(base() + TimeDelta::seconds(11)),
                )
                .unwrap(),
                limit: Some(3),
                ..options(strategy)
            };
            let msgs = MessageFetcher::new(&src, opts)
                .unwrap()
                .fetch_stream(&info)
                .await
                .unwrap();
            let seqs: Vec<u64> = msgs.iter().map(|m| m.sequence).collect();
            assert_eq!(seqs, vec![4, 5, 7], "strategy {}", strategy);
        }
    }

    #[tokio::test]
    async fn test_failing_stream_is_skipped() {
        let mut src = source();
        src.insert(MessageRecord::new("AUDIT", 1, base(), 5));
        src.fail_stream("AUDIT");
        let streams = src.list_streams().await.unwrap();

        let opts = FetchOptions {
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff_ms: 1,
                ..RetryConfig::default()
            },
            ..options(FetchStrategy::Sequential)
        };
        let outcome = MessageFetcher::new(&src, opts)
            .unwrap()
            .fetch_all(&streams)
            .await;
        assert_eq!(outcome.skipped_streams, vec!["AUDIT".to_string()]);
        assert_eq!(outcome.fetched_streams, vec!["ORDERS".to_string()]);
        assert_eq!(outcome.messages.len(), 14);
    }
}
