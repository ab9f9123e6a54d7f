//! Rate reconstruction and analysis
//!
//! This module turns surviving stream messages into rate histograms and the
//! views derived from them:
//!
//! - **Histogram Builder** - Epoch-aligned buckets with sequence-gap interpolation
//! - **Rate Statistics** - Percentiles, standard deviation and coverage for any bucket slice
//! - **Downsampling** - Time-range filtering and peak/average bucket merging
//! - **Breakdown** - Per-source extraction and stream distribution from combined histograms
//! - **Summary** - Per-stream and combined rollups
//! - **Session** - Zoom stack with stale-result suppression for interactive use
//! - **Report Generation** - Console, JSON and CSV output
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{TimeDelta, Utc};
//! use traffic_history::analysis::{build_histogram, downsample, DownsamplePolicy};
//! use traffic_history::errors::AppResult;
//! use traffic_history::types::MessageRecord;
//!
//! fn example() -> AppResult<()> {
//!     let now = Utc::now();
//!     let messages = vec![
//!         MessageRecord::new("ORDERS", 1, now, 128),
//!         MessageRecord::new("ORDERS", 5, now + TimeDelta::seconds(3), 128),
//!     ];
//!
//!     let hist = build_histogram(&messages, TimeDelta::seconds(1))?;
//!     assert_eq!(hist.stats.deleted_messages(), 3);
//!
//!     let coarse = downsample(&hist, 2, DownsamplePolicy::Peak)?;
//!     assert!(coarse.len() <= 2);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod breakdown;
pub mod downsample;
pub mod histogram_builder;
pub mod rate_stats;
pub mod reports;
pub mod session;
pub mod summary;

// Re-export main types and interfaces
pub use breakdown::{extract_source_histogram, stream_distribution};
pub use downsample::{downsample, downsample_recomputed, filter_by_time, DownsamplePolicy};
pub use histogram_builder::{build_histogram, build_stream_histograms};
pub use rate_stats::{calculate_stats, percentile, summarize};
pub use reports::{GraphOptions, OutputFormat, ReportFormatter};
pub use session::{compute_view, ViewSession, ViewTicket, ViewWindow};
pub use summary::{build_summary, build_summary_with_info};
