use super::args::{load_config, load_messages, resolve_width, write_output_to_file, FetchArgs, SourceArgs};
use crate::analysis::reports::csv_export::CsvExporter;
use crate::analysis::reports::utils::export_json;
use crate::analysis::{
    build_histogram, build_stream_histograms, build_summary_with_info, GraphOptions, OutputFormat,
    ReportFormatter,
};
use crate::errors::AppResult;
use crate::types::{RateHistogram, RateStatistics, ReportSummary};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    fetch: FetchArgs,

    /// Output format: console or json
    #[arg(long, default_value = "console")]
    format: String,

    /// Show per-stream distribution tables
    #[arg(long)]
    distribution: bool,

    /// Print a histogram section for every stream as well as the combined one
    #[arg(long)]
    per_stream: bool,

    /// Statistics only, no bar graphs
    #[arg(long)]
    no_graph: bool,

    /// Also render the throughput graph
    #[arg(long)]
    throughput: bool,

    /// Collapse buckets below this percentage of the peak rate
    #[arg(long, default_value_t = 0.0)]
    min_rate_pct: f64,

    /// Output width in columns (default: config, then $COLUMNS, then 120)
    #[arg(long)]
    width: Option<usize>,

    /// Export bucket rows to this CSV file (.csv appended when missing)
    #[arg(long)]
    csv: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ReportExport<'a> {
    summary: &'a ReportSummary,
    stats: &'a RateStatistics,
    histogram: &'a RateHistogram,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    streams: BTreeMap<String, RateHistogram>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped_streams: &'a Vec<String>,
}

impl ReportCommand {
    pub async fn run(&self) -> AppResult<()> {
        info!("=== Traffic History - Report ===");
        let app_config = load_config()?;
        let format = OutputFormat::parse(&self.format);
        let width = resolve_width(self.width, &app_config);

        let data = load_messages(&self.source, &self.fetch, &app_config).await?;
        let fetched = data.fetched_streams();

        let combined = build_histogram(&data.messages, data.granularity)?;
        let summary = build_summary_with_info(&data.messages, &fetched);

        // Per-stream histograms, used for sections and CSV export
        let per_stream = if self.per_stream || self.csv.is_some() {
            build_stream_histograms(&data.messages, data.granularity)?
        } else {
            BTreeMap::new()
        };

        if let Some(name) = &self.csv {
            let mut exporter = CsvExporter::new(name);
            for (stream, hist) in &per_stream {
                exporter.export(hist, stream)?;
            }
            println!(
                "CSV export ({} rows) written to: {}",
                exporter.rows_written(),
                exporter.path().display()
            );
        }

        let output = match format {
            OutputFormat::Json => export_json(&ReportExport {
                summary: &summary,
                stats: &combined.stats,
                histogram: &combined,
                streams: if self.per_stream {
                    per_stream
                } else {
                    BTreeMap::new()
                },
                skipped_streams: &data.skipped,
            })?,
            OutputFormat::Console => {
                let opts = GraphOptions {
                    show_graph: !self.no_graph,
                    show_rate: true,
                    show_throughput: self.throughput,
                    min_rate_pct: self.min_rate_pct,
                    width,
                };
                let mut out = ReportFormatter::format_report_summary(
                    &summary,
                    Some(&combined.stats),
                    self.distribution,
                    width,
                    &format,
                )?;
                if !data.skipped.is_empty() {
                    out.push_str(&format!(
                        "Skipped streams (fetch failed): {}\n\n",
                        data.skipped.join(", ")
                    ));
                }
                if !combined.is_empty() {
                    out.push_str(&ReportFormatter::format_stream_header(
                        "All Streams",
                        summary.total_messages,
                    ));
                    out.push_str(&ReportFormatter::format_rate_histogram(&combined, &opts, &format)?);
                }
                if self.per_stream && fetched.len() > 1 {
                    for (name, hist) in &per_stream {
                        out.push_str(&ReportFormatter::format_stream_header(name, hist.total_count()));
                        out.push_str(&ReportFormatter::format_rate_histogram(hist, &opts, &format)?);
                    }
                }
                out
            }
        };

        match &self.output {
            Some(path) => write_output_to_file(path, &output, "Report")?,
            None => print!("{}", output),
        }
        Ok(())
    }
}
