//! Rate histogram report formatters
//!
//! Console output draws one row per bucket: stored traffic as `█`, interpolated
//! deletions as `░`, with the stored, deleted and total rates written into the
//! bar. Empty or below-threshold buckets and runs of deletion-only buckets are
//! collapsed into single summary rows.

use super::utils::{
    export_json, format_bytes, format_bytes_per_sec, format_duration, format_number,
    format_scale_value, format_time, TIME_FORMAT,
};
use super::OutputFormat;
use crate::errors::AppResult;
use crate::types::{MetricSummary, RateBucket, RateHistogram, RateStatistics};
use chrono::{DateTime, TimeDelta, Utc};

/// Width of the `=`/`-` header rules
pub const HEADER_WIDTH: usize = 70;
const TIME_COL: usize = 19;
const MIN_GRAPH_WIDTH: usize = 20;

/// Which graphs and statistic blocks to render
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOptions {
    pub show_graph: bool,
    pub show_rate: bool,
    pub show_throughput: bool,
    /// Buckets below this percentage of the peak are collapsed
    pub min_rate_pct: f64,
    /// Total output width in columns
    pub width: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            show_graph: true,
            show_rate: true,
            show_throughput: false,
            min_rate_pct: 0.0,
            width: 120,
        }
    }
}

impl GraphOptions {
    fn graph_width(&self, fixed_cols: usize) -> usize {
        self.width.saturating_sub(fixed_cols).max(MIN_GRAPH_WIDTH)
    }
}

/// Format a histogram with its statistics
pub fn format_rate_histogram(
    hist: &RateHistogram,
    opts: &GraphOptions,
    format: &OutputFormat,
) -> AppResult<String> {
    match format {
        OutputFormat::Json => export_json(hist),
        OutputFormat::Console => {
            let mut output = String::new();
            output.push_str(&format!(
                "-- Stored Message Rate Over Time (granularity: {}) {}\n\n",
                format_duration(hist.granularity),
                "-".repeat(22)
            ));

            if hist.is_empty() {
                output.push_str("  No data to display\n\n");
                return Ok(output);
            }

            if opts.show_graph {
                if opts.show_rate {
                    output.push_str(&render_rate_graph(hist, opts));
                }
                if opts.show_throughput {
                    output.push_str(&render_throughput_graph(hist, opts));
                }
            }

            output.push_str(&render_rate_stats(
                &hist.stats,
                opts.show_rate,
                opts.show_throughput,
            ));
            Ok(output)
        }
    }
}

/// Header separating per-stream sections
pub fn format_stream_header(name: &str, messages: u64) -> String {
    format!(
        "{rule}\nStream: {} ({} messages)\n{rule}\n\n",
        name,
        format_number(messages),
        rule = "-".repeat(HEADER_WIDTH)
    )
}

/// A run of consecutive buckets shown as one row
#[derive(Debug, Clone, Copy)]
struct CollapsedRun {
    start: DateTime<Utc>,
    last: DateTime<Utc>,
    count: usize,
}

impl CollapsedRun {
    fn extend(run: &mut Option<CollapsedRun>, bucket: &RateBucket) {
        match run {
            Some(r) => {
                r.last = bucket.start;
                r.count += 1;
            }
            None => {
                *run = Some(CollapsedRun {
                    start: bucket.start,
                    last: bucket.start,
                    count: 1,
                })
            }
        }
    }

    fn render(&self, label: &str, granularity: TimeDelta, graph_width: usize) -> String {
        let message = format!(
            "... {} {} +{} ...",
            self.count,
            label,
            format_duration(self.last - self.start + granularity)
        );
        format!(
            "  {:<tw$} | {:<gw$}\n",
            self.start.format(TIME_FORMAT),
            message,
            tw = TIME_COL,
            gw = graph_width
        )
    }
}

/// Time-series graph of stored and interpolated-deleted rate per bucket
pub fn render_rate_graph(hist: &RateHistogram, opts: &GraphOptions) -> String {
    let mut output = String::new();
    let graph_width = opts.graph_width(2 + TIME_COL + 3);
    let max_seq_rate = hist.max_seq_rate();

    if max_seq_rate == 0.0 {
        output.push_str("  No messages in any bucket\n\n");
        return output;
    }
    let threshold = max_seq_rate * opts.min_rate_pct / 100.0;

    output.push_str(&format!(
        "  Message Rate (hiding < {:.1}%, █=stored ░=deleted, total right-aligned)\n",
        opts.min_rate_pct
    ));
    output.push_str(&format!(
        "  {:<tw$} | {}\n",
        "Time",
        "Graph (stored | deleted | total)",
        tw = TIME_COL
    ));
    output.push_str(&format!(
        "  {}-+-{}\n",
        "-".repeat(TIME_COL),
        "-".repeat(graph_width)
    ));

    let prefix = format!("  {:<tw$} | ", "", tw = TIME_COL);
    output.push_str(&render_scale(&prefix, graph_width, max_seq_rate, "msg/s"));

    let mut skipped: Option<CollapsedRun> = None;
    let mut deletion_only: Option<CollapsedRun> = None;

    for bucket in &hist.buckets {
        if bucket.seq_count == 0 || bucket.seq_rate < threshold {
            if let Some(run) = deletion_only.take() {
                output.push_str(&run.render("del-only", hist.granularity, graph_width));
            }
            CollapsedRun::extend(&mut skipped, bucket);
            continue;
        }

        if bucket.is_deletion_only() {
            if let Some(run) = skipped.take() {
                output.push_str(&run.render("skipped", hist.granularity, graph_width));
            }
            CollapsedRun::extend(&mut deletion_only, bucket);
            continue;
        }

        if let Some(run) = skipped.take() {
            output.push_str(&run.render("skipped", hist.granularity, graph_width));
        }
        if let Some(run) = deletion_only.take() {
            output.push_str(&run.render("del-only", hist.granularity, graph_width));
        }

        let total_len = bar_length(bucket.seq_rate, max_seq_rate, graph_width);
        let stored_len = bar_length(bucket.rate, max_seq_rate, graph_width).min(total_len);
        let bar = build_rate_bar(
            graph_width,
            stored_len,
            total_len - stored_len,
            bucket.rate,
            bucket.deleted_rate(),
            bucket.seq_rate,
        );
        output.push_str(&format!(
            "  {:<tw$} | {}\n",
            bucket.start.format(TIME_FORMAT),
            bar,
            tw = TIME_COL
        ));
    }

    if let Some(run) = skipped.take() {
        output.push_str(&run.render("skipped", hist.granularity, graph_width));
    }
    if let Some(run) = deletion_only.take() {
        output.push_str(&run.render("del-only", hist.granularity, graph_width));
    }

    output.push_str(&render_scale(&prefix, graph_width, max_seq_rate, "msg/s"));
    output.push('\n');
    output
}

/// Time-series graph of stored bytes per second
pub fn render_throughput_graph(hist: &RateHistogram, opts: &GraphOptions) -> String {
    let mut output = String::new();
    let graph_width = opts.graph_width(2 + 20 + 3 + 12 + 3);
    let max_tput = hist.max_throughput();
    if max_tput == 0.0 {
        return output;
    }
    let threshold = max_tput * opts.min_rate_pct / 100.0;

    output.push_str(&format!(
        "  Throughput (hiding < {:.1}%)\n",
        opts.min_rate_pct
    ));
    output.push_str(&format!(
        "  {:<20} | {:>12} | Graph\n",
        "Time", "Throughput"
    ));
    output.push_str(&format!(
        "  {}-+-{}-+-{}\n",
        "-".repeat(20),
        "-".repeat(12),
        "-".repeat(graph_width)
    ));

    let prefix = format!("  {:<20} | {:>12} | ", "", "");
    output.push_str(&render_scale(&prefix, graph_width, max_tput, "B/s"));

    let mut skipped: Option<CollapsedRun> = None;
    let flush = |run: Option<CollapsedRun>, output: &mut String| {
        if let Some(run) = run {
            output.push_str(&format!(
                "  {:<20} | {:>12} | ... {} buckets skipped ...\n",
                run.start.format(TIME_FORMAT),
                format!("+{}", format_duration(run.last - run.start + hist.granularity)),
                run.count
            ));
        }
    };

    for bucket in &hist.buckets {
        if bucket.bytes == 0 || bucket.throughput < threshold {
            CollapsedRun::extend(&mut skipped, bucket);
            continue;
        }
        flush(skipped.take(), &mut output);
        output.push_str(&format!(
            "  {:<20} | {:>12} | {}\n",
            bucket.start.format(TIME_FORMAT),
            format_bytes_per_sec(bucket.throughput),
            "█".repeat(bar_length(bucket.throughput, max_tput, graph_width))
        ));
    }
    flush(skipped.take(), &mut output);

    output.push_str(&render_scale(&prefix, graph_width, max_tput, "B/s"));
    output.push('\n');
    output
}

fn bar_length(value: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / max) * width as f64) as usize
}

/// Bar with the stored rate written over `█`, the deleted rate over `░`,
/// and the total right-aligned
fn build_rate_bar(
    width: usize,
    stored_len: usize,
    deleted_len: usize,
    stored_rate: f64,
    deleted_rate: f64,
    total_rate: f64,
) -> String {
    let mut cells: Vec<char> = (0..width)
        .map(|i| {
            if i < stored_len {
                '█'
            } else if i < stored_len + deleted_len {
                '░'
            } else {
                ' '
            }
        })
        .collect();

    if stored_rate > 0.0 {
        for (i, c) in format_scale_value(stored_rate).chars().enumerate() {
            if i < stored_len.min(width) {
                cells[i] = c;
            }
        }
    }
    if deleted_rate > 0.0 {
        for (i, c) in format_scale_value(deleted_rate).chars().enumerate() {
            let pos = stored_len + i;
            if pos < (stored_len + deleted_len).min(width) {
                cells[pos] = c;
            }
        }
    }

    let total: Vec<char> = format_scale_value(total_rate).chars().collect();
    let start = width.saturating_sub(total.len());
    for (i, c) in total.into_iter().enumerate() {
        if start + i < width {
            cells[start + i] = c;
        }
    }

    cells.into_iter().collect()
}

/// Two-line scale with ticks at 0%, 50% and 100%
fn render_scale(prefix: &str, width: usize, max: f64, unit: &str) -> String {
    let mid = width / 2;
    let mut ticks = vec![' '; width];
    ticks[0] = '|';
    ticks[mid] = '|';
    ticks[width - 1] = '|';

    let mut labels = vec![' '; width];
    labels[0] = '0';
    let mid_label: Vec<char> = format_scale_value(max * 0.5).chars().collect();
    let mid_pos = mid.saturating_sub(mid_label.len() / 2).max(2);
    if mid_pos + mid_label.len() <= width {
        labels[mid_pos..mid_pos + mid_label.len()].copy_from_slice(&mid_label);
    }
    let end_label: Vec<char> = format!("{} {}", format_scale_value(max), unit)
        .chars()
        .collect();
    if let Some(end_pos) = width.checked_sub(end_label.len()) {
        if end_pos > mid_pos + mid_label.len() {
            labels[end_pos..].copy_from_slice(&end_label);
        }
    }

    format!(
        "{prefix}{}\n{prefix}{}\n",
        ticks.into_iter().collect::<String>(),
        labels.into_iter().collect::<String>()
    )
}

fn push_rate_block(output: &mut String, title: &str, m: &MetricSummary) {
    output.push_str(&format!("  {}:\n", title));
    for (label, value) in metric_rows(m) {
        output.push_str(&format!("    {:<15} {:.2} msg/s\n", label, value));
    }
    output.push('\n');
}

fn push_bytes_block(output: &mut String, title: &str, m: &MetricSummary, suffix: &str) {
    output.push_str(&format!("  {}:\n", title));
    for (label, value) in metric_rows(m) {
        output.push_str(&format!(
            "    {:<15} {}{}\n",
            label,
            format_bytes(value.max(0.0) as u64),
            suffix
        ));
    }
    output.push('\n');
}

fn metric_rows(m: &MetricSummary) -> [(&'static str, f64); 8] {
    [
        ("Average:", m.avg),
        ("P50:", m.p50),
        ("P90:", m.p90),
        ("P99:", m.p99),
        ("P99.9:", m.p999),
        ("Min:", m.min),
        ("Max:", m.max),
        ("Std Dev:", m.std_dev),
    ]
}

/// Statistics block for a histogram
pub fn render_rate_stats(stats: &RateStatistics, show_rate: bool, show_throughput: bool) -> String {
    let mut output = String::new();
    output.push_str("Statistics:\n");
    output.push_str(&format!(
        "  Total Messages:                {}\n",
        format_number(stats.total_messages)
    ));
    output.push_str(&format!(
        "  Total Messages (per seq nums): {}\n",
        format_number(stats.total_seq_messages)
    ));
    output.push_str(&format!(
        "  Interpolated Deletions:        {}\n",
        format_number(stats.deleted_messages())
    ));
    output.push_str(&format!(
        "  Total Data:                    {}\n",
        format_bytes(stats.total_bytes)
    ));
    output.push_str(&format!(
        "  Time Span:                     {} ({} to {})\n",
        format_duration(stats.total_duration),
        format_time(stats.start_time),
        format_time(stats.end_time)
    ));
    output.push_str(&format!(
        "  Total Buckets:                 {} (active: {}, {:.1}%)\n",
        format_number(stats.total_buckets as u64),
        format_number(stats.active_buckets as u64),
        stats.coverage_pct()
    ));
    output.push_str(&format!(
        "  Sequence Range:                {} - {} ({:.2} msg/s)\n\n",
        stats.first_seq, stats.last_seq, stats.overall_seq_rate
    ));

    if show_rate {
        push_rate_block(&mut output, "Message Storage Rate", &stats.rate);
        push_rate_block(
            &mut output,
            "Message Storage Rate (per sequence numbers, with deletes interpolated)",
            &stats.seq_rate,
        );
    }
    if show_throughput {
        push_bytes_block(&mut output, "Throughput", &stats.throughput, "/s");
    }
    if stats.total_messages > 0 {
        push_bytes_block(&mut output, "Message Size", &stats.msg_size, "");
    }
    output
}
