//! Report overview and stream distribution formatters

use super::histogram::HEADER_WIDTH;
use super::utils::{
    export_json, format_bytes, format_bytes_per_sec, format_duration, format_number, format_time,
};
use super::OutputFormat;
use crate::errors::AppResult;
use crate::types::{RateStatistics, ReportSummary, StreamInfo, StreamShare, StreamSummary};
use crate::utils::math::safe_percentage_u64;
use serde::Serialize;

const MIN_GRAPH_WIDTH: usize = 20;

/// Overview printed at the top of a report, optionally with distribution tables
pub fn format_report_summary(
    summary: &ReportSummary,
    stats: Option<&RateStatistics>,
    distribution: bool,
    width: usize,
    format: &OutputFormat,
) -> AppResult<String> {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct SummaryExport<'a> {
                summary: &'a ReportSummary,
                #[serde(skip_serializing_if = "Option::is_none")]
                stats: Option<&'a RateStatistics>,
            }
            export_json(&SummaryExport { summary, stats })
        }
        OutputFormat::Console => {
            let mut output = String::new();
            let rule = "=".repeat(HEADER_WIDTH);
            output.push_str(&format!("{rule}\nTRAFFIC HISTORY REPORT\n{rule}\n\n"));

            if summary.total_messages == 0 {
                output.push_str("  No messages found\n\n");
                return Ok(output);
            }

            output.push_str("Overview:\n");
            output.push_str(&format!(
                "  Duration:                      {} ({} to {})\n",
                format_duration(summary.duration),
                format_time(summary.start_time),
                format_time(summary.end_time)
            ));
            output.push_str(&format!(
                "  Streams:                       {}\n",
                summary.stream_count
            ));
            output.push_str(&format!(
                "  Total Messages:                {}\n",
                format_number(summary.total_messages)
            ));
            if let Some(stats) = stats {
                output.push_str(&format!(
                    "  Total Messages (per seq nums): {}\n",
                    format_number(stats.total_seq_messages)
                ));
            }
            let deleted = summary.estimated_deleted();
            if deleted > 0 {
                output.push_str(&format!(
                    "  Deleted (stream-reported):     {}\n",
                    format_number(deleted)
                ));
            }
            output.push_str(&format!(
                "  Total Data:                    {}\n",
                format_bytes(summary.total_bytes)
            ));
            if summary.throughput > 0.0 {
                output.push_str(&format!(
                    "  Avg Throughput:                {}\n",
                    format_bytes_per_sec(summary.throughput)
                ));
            }
            output.push('\n');

            if distribution && !summary.streams.is_empty() {
                output.push_str(&render_message_table(&summary.streams, width));
                output.push_str(&render_sequence_table(&summary.streams, width));
            }
            Ok(output)
        }
    }
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(|n| n.chars().count()).max().unwrap_or(0).max(6)
}

fn bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 || value == 0 {
        return String::new();
    }
    let len = (safe_percentage_u64(value, max) * width as f64 / 100.0) as usize;
    "█".repeat(len.max(1))
}

/// Streams by stored message count
fn render_message_table(streams: &[StreamSummary], width: usize) -> String {
    let nw = name_width(streams.iter().map(|s| s.name.as_str()));
    let gw = width
        .saturating_sub(2 + nw + 3 + 10 + 3 + 10 + 3)
        .max(MIN_GRAPH_WIDTH);
    let max = streams.iter().map(|s| s.messages).max().unwrap_or(0);

    let mut output = String::from("Streams Distribution by Stored Message Count:\n");
    output.push_str(&format!(
        "  {:<nw$} | {:>10} | {:>10} | Graph\n",
        "Stream", "Messages", "Data"
    ));
    output.push_str(&format!(
        "  {}-+-{}-+-{}-+-{}\n",
        "-".repeat(nw),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(gw)
    ));
    for s in streams {
        output.push_str(&format!(
            "  {:<nw$} | {:>10} | {:>10} | {}\n",
            s.name,
            s.messages,
            format_bytes(s.bytes),
            bar(s.messages, max, gw)
        ));
    }
    output.push('\n');
    output
}

/// Streams by sequence numbers advanced
fn render_sequence_table(streams: &[StreamSummary], width: usize) -> String {
    let mut by_seq: Vec<&StreamSummary> = streams.iter().collect();
    by_seq.sort_by(|a, b| {
        (b.last_seq - b.first_seq)
            .cmp(&(a.last_seq - a.first_seq))
            .then_with(|| a.name.cmp(&b.name))
    });

    let nw = name_width(streams.iter().map(|s| s.name.as_str()));
    let gw = width
        .saturating_sub(2 + nw + 3 + 10 + 3 + 12 + 3)
        .max(MIN_GRAPH_WIDTH);
    let max = by_seq
        .first()
        .map(|s| s.last_seq - s.first_seq)
        .unwrap_or(0);

    let mut output = String::from("Streams Distribution by Sequence Number Count:\n");
    output.push_str(&format!(
        "  {:<nw$} | {:>10} | {:>12} | Graph\n",
        "Stream", "Seq Count", "Avg Rate"
    ));
    output.push_str(&format!(
        "  {}-+-{}-+-{}-+-{}\n",
        "-".repeat(nw),
        "-".repeat(10),
        "-".repeat(12),
        "-".repeat(gw)
    ));
    for s in by_seq {
        let advanced = s.last_seq - s.first_seq;
        output.push_str(&format!(
            "  {:<nw$} | {:>10} | {:>10.2}/s | {}\n",
            s.name,
            advanced,
            s.seq_rate,
            bar(advanced, max, gw)
        ));
    }
    output.push('\n');
    output
}

/// Per-stream shares of a time window
pub fn format_distribution(
    shares: &[StreamShare],
    width: usize,
    format: &OutputFormat,
) -> AppResult<String> {
    match format {
        OutputFormat::Json => export_json(&shares),
        OutputFormat::Console => {
            if shares.is_empty() {
                return Ok("  No stream activity in range\n\n".to_string());
            }
            let nw = name_width(shares.iter().map(|s| s.name.as_str()));
            let gw = width
                .saturating_sub(2 + nw + 3 + 10 + 3 + 10 + 3 + 10 + 3)
                .max(MIN_GRAPH_WIDTH);
            let max = shares.iter().map(|s| s.messages).max().unwrap_or(0);

            let mut output = String::from("Stream Distribution:\n");
            output.push_str(&format!(
                "  {:<nw$} | {:>10} | {:>10} | {:>10} | Graph\n",
                "Stream", "Messages", "Deleted", "Data"
            ));
            output.push_str(&format!(
                "  {}-+-{}-+-{}-+-{}-+-{}\n",
                "-".repeat(nw),
                "-".repeat(10),
                "-".repeat(10),
                "-".repeat(10),
                "-".repeat(gw)
            ));
            for s in shares {
                output.push_str(&format!(
                    "  {:<nw$} | {:>10} | {:>10} | {:>10} | {}\n",
                    s.name,
                    s.messages,
                    s.seq_messages.saturating_sub(s.messages),
                    format_bytes(s.bytes),
                    bar(s.messages, max, gw)
                ));
            }
            output.push('\n');
            Ok(output)
        }
    }
}

/// Discovered streams and their reported bounds
pub fn format_stream_list(streams: &[StreamInfo], format: &OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Json => export_json(&streams),
        OutputFormat::Console => {
            if streams.is_empty() {
                return Ok("No limits-based streams found\n".to_string());
            }
            let nw = name_width(streams.iter().map(|s| s.name.as_str()));
            let mut output = format!(
                "  {:<nw$} | {:>12} | {:>12} | {:>12} | {:>12} | {:<19} | {:<19}\n",
                "Stream", "Messages", "First Seq", "Last Seq", "Deleted", "First", "Last"
            );
            output.push_str(&format!("  {}\n", "-".repeat(nw + 2 + 4 * 15 + 2 * 22)));
            for s in streams {
                output.push_str(&format!(
                    "  {:<nw$} | {:>12} | {:>12} | {:>12} | {:>12} | {:<19} | {:<19}\n",
                    s.name,
                    format_number(s.message_count),
                    s.first_seq,
                    s.last_seq,
                    format_number(s.deleted_within_span()),
                    format_time(s.first_timestamp),
                    format_time(s.last_timestamp)
                ));
            }
            Ok(output)
        }
    }
}
