//! Report formatting and output generation
//!
//! Provides formatting for histograms and summaries via the [`ReportFormatter`]
//! facade. Supports Console and JSON output formats, plus bucket-level CSV export.

pub mod csv_export;
pub mod histogram;
pub mod summary;
pub mod utils;

use crate::errors::AppResult;
use crate::types::{RateHistogram, RateStatistics, ReportSummary, StreamInfo, StreamShare};
pub use histogram::GraphOptions;

/// Output format options for reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

impl OutputFormat {
    /// Parse a format name, falling back to console output
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Console,
        }
    }
}

/// Facade for all report formatting operations
pub struct ReportFormatter;

impl ReportFormatter {
    // Utilities
    pub fn format_number(n: u64) -> String {
        utils::format_number(n)
    }
    pub fn format_bytes(bytes: u64) -> String {
        utils::format_bytes(bytes)
    }

    // Summary
    pub fn format_report_summary(
        s: &ReportSummary,
        stats: Option<&RateStatistics>,
        distribution: bool,
        width: usize,
        f: &OutputFormat,
    ) -> AppResult<String> {
        summary::format_report_summary(s, stats, distribution, width, f)
    }
    pub fn format_distribution(
        shares: &[StreamShare],
        width: usize,
        f: &OutputFormat,
    ) -> AppResult<String> {
        summary::format_distribution(shares, width, f)
    }
    pub fn format_stream_list(streams: &[StreamInfo], f: &OutputFormat) -> AppResult<String> {
        summary::format_stream_list(streams, f)
    }

    // Histograms
    pub fn format_stream_header(name: &str, messages: u64) -> String {
        histogram::format_stream_header(name, messages)
    }
    pub fn format_rate_histogram(
        h: &RateHistogram,
        opts: &GraphOptions,
        f: &OutputFormat,
    ) -> AppResult<String> {
        histogram::format_rate_histogram(h, opts, f)
    }
}
