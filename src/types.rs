//! Traffic history type system
//!
//! - `message`: Surviving message records returned by a stream source
//! - `stream`: Stream metadata and retention policy
//! - `histogram`: Rate buckets and histograms
//! - `statistics`: Rate statistics over a bucket slice
//! - `summary`: Per-stream and combined report rollups

pub mod histogram;
pub mod message;
pub mod statistics;
pub mod stream;
pub mod summary;

pub use histogram::{RateBucket, RateHistogram, SourceCounts};
pub use message::{sort_by_timestamp, MessageRecord};
pub use statistics::{MetricSummary, RateStatistics};
pub use stream::{RetentionPolicy, StreamInfo};
pub use summary::{ReportSummary, ReportedBounds, StreamShare, StreamSummary};
