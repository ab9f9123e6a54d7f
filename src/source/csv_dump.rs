//! Stream dump files
//!
//! A dump is a CSV file with the header `stream,sequence,timestamp,size` and
//! one row per surviving message. An optional `retention` column marks the
//! stream's retention policy (limits when absent).

use super::{BatchStart, MemorySource, StreamSource};
use crate::errors::{AppError, AppResult, SourceResult};
use crate::types::{MessageRecord, RetentionPolicy, StreamInfo};
use crate::utils::time::parse_timestamp;
use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

const REQUIRED_COLUMNS: [&str; 4] = ["stream", "sequence", "timestamp", "size"];

struct Columns {
    stream: usize,
    sequence: usize,
    timestamp: usize,
    size: usize,
    retention: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> AppResult<Self> {
        let find = |name: &str| header.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let mut positions = [0usize; 4];
        for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name).ok_or_else(|| AppError::InvalidRecord {
                line: 1,
                reason: format!("missing column '{}'", name),
            })?;
        }
        Ok(Self {
            stream: positions[0],
            sequence: positions[1],
            timestamp: positions[2],
            size: positions[3],
            retention: find("retention"),
        })
    }
}

/// Stream source backed by a dump file, loaded fully at open time
#[derive(Debug)]
pub struct CsvDumpSource {
    path: PathBuf,
    inner: MemorySource,
    rows: usize,
}

impl CsvDumpSource {
    pub fn open(path: &Path) -> AppResult<Self> {
        let file = File::open(path).map_err(AppError::Io)?;
        let (inner, rows) = Self::parse(file)?;
        info!(
            "Loaded {} messages across {} streams from {}",
            rows,
            inner.stream_count(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            inner,
            rows,
        })
    }

    /// Parse dump contents from any reader
    pub fn parse<R: Read>(reader: R) -> AppResult<(MemorySource, usize)> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns = Columns::from_header(reader.headers()?)?;

        let mut source = MemorySource::new();
        let mut rows = 0;
        for result in reader.records() {
            let record = result?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(rows + 2);
            let (msg, retention) = parse_record(&record, &columns, line)?;
            if let Some(policy) = retention {
                source.add_stream(&msg.stream_name, policy);
            }
            source.insert(msg);
            rows += 1;
        }
        Ok((source, rows))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows read from the file
    pub fn rows(&self) -> usize {
        self.rows
    }
}

fn field<'a>(record: &'a StringRecord, index: usize, name: &str, line: usize) -> AppResult<&'a str> {
    match record.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::InvalidRecord {
            line,
            reason: format!("missing {}", name),
        }),
    }
}

fn parse_record(
    record: &StringRecord,
    columns: &Columns,
    line: usize,
) -> AppResult<(MessageRecord, Option<RetentionPolicy>)> {
    let invalid = |reason: String| AppError::InvalidRecord { line, reason };

    let stream = field(record, columns.stream, "stream", line)?;
    let sequence = field(record, columns.sequence, "sequence", line)?
        .parse::<u64>()
        .map_err(|e| invalid(format!("bad sequence: {}", e)))?;
    let timestamp = parse_timestamp(field(record, columns.timestamp, "timestamp", line)?)
        .map_err(|e| invalid(e.to_string()))?;
    let size = field(record, columns.size, "size", line)?
        .parse::<u64>()
        .map_err(|e| invalid(format!("bad size: {}", e)))?;

    let retention = match columns.retention.and_then(|i| record.get(i)) {
        Some(value) if !value.is_empty() => Some(value.parse::<RetentionPolicy>().map_err(invalid)?),
        _ => None,
    };

    Ok((MessageRecord::new(stream, sequence, timestamp, size), retention))
}

#[async_trait]
impl StreamSource for CsvDumpSource {
    async fn list_streams(&self) -> SourceResult<Vec<StreamInfo>> {
        self.inner.list_streams().await
    }

    async fn get_batch(
        &self,
        stream: &str,
        start: BatchStart,
        count: usize,
    ) -> SourceResult<Vec<MessageRecord>> {
        self.inner.get_batch(stream, start, count).await
    }
}
