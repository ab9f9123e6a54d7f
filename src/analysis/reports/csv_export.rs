//! Bucket-level CSV export
//!
//! One row per bucket: `stream,timestamp,count,bytes,rate_msg_per_sec,throughput_bytes_per_sec`.
//! The first histogram written to a file creates it with a header; later ones
//! append rows only.

use crate::errors::{AppError, AppResult};
use crate::types::RateHistogram;
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Column names of the export
pub const CSV_HEADER: [&str; 6] = [
    "stream",
    "timestamp",
    "count",
    "bytes",
    "rate_msg_per_sec",
    "throughput_bytes_per_sec",
];

/// One exported bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRow {
    pub stream: String,
    pub timestamp: DateTime<Utc>,
    pub count: u64,
    pub bytes: u64,
    pub rate_msg_per_sec: f64,
    pub throughput_bytes_per_sec: f64,
}

impl BucketRow {
    fn to_record(&self) -> [String; 6] {
        [
            self.stream.clone(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.count.to_string(),
            self.bytes.to_string(),
            format!("{:.2}", self.rate_msg_per_sec),
            format!("{:.2}", self.throughput_bytes_per_sec),
        ]
    }
}

/// Rows for every bucket of `hist`, labelled with `stream`
pub fn bucket_rows(hist: &RateHistogram, stream: &str) -> Vec<BucketRow> {
    hist.buckets
        .iter()
        .map(|b| BucketRow {
            stream: stream.to_string(),
            timestamp: b.start,
            count: b.count,
            bytes: b.bytes,
            rate_msg_per_sec: b.rate,
            throughput_bytes_per_sec: b.throughput,
        })
        .collect()
}

/// Add a `.csv` extension unless the name already ends with one
pub fn csv_path(name: &str) -> PathBuf {
    if name.to_lowercase().ends_with(".csv") {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{}.csv", name))
    }
}

/// Create (or truncate) `path` and write the header plus one row per bucket
pub fn write_csv(path: &Path, hist: &RateHistogram, stream: &str) -> AppResult<()> {
    let file = File::create(path).map_err(AppError::Io)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(CSV_HEADER)?;
    for row in bucket_rows(hist, stream) {
        writer.write_record(row.to_record())?;
    }
    writer.flush().map_err(AppError::Io)?;
    Ok(())
}

/// Append bucket rows to an existing export without repeating the header
pub fn append_csv(path: &Path, hist: &RateHistogram, stream: &str) -> AppResult<()> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(AppError::Io)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    for row in bucket_rows(hist, stream) {
        writer.write_record(row.to_record())?;
    }
    writer.flush().map_err(AppError::Io)?;
    Ok(())
}

/// Read an export back into rows
pub fn read_csv(path: &Path) -> AppResult<Vec<BucketRow>> {
    let file = File::open(path).map_err(AppError::Io)?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut rows = Vec::new();
    for result in reader.deserialize::<BucketRow>() {
        rows.push(result.map_err(AppError::Csv)?);
    }
    Ok(rows)
}

/// Writes several histograms into one file: the first creates it, the rest append
#[derive(Debug)]
pub struct CsvExporter {
    path: PathBuf,
    rows_written: usize,
    started: bool,
}

impl CsvExporter {
    pub fn new(name: &str) -> Self {
        Self {
            path: csv_path(name),
            rows_written: 0,
            started: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn export(&mut self, hist: &RateHistogram, stream: &str) -> AppResult<()> {
        if self.started {
            append_csv(&self.path, hist, stream)?;
        } else {
            write_csv(&self.path, hist, stream)?;
            self.started = true;
        }
        self.rows_written += hist.len();
        info!(
            "Exported {} buckets for {} to {}",
            hist.len(),
            stream,
            self.path.display()
        );
        Ok(())
    }
}
