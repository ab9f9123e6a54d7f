//! Common Test Utilities
//!
//! Shared message builders and dump-file helpers used across unit and
//! integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use traffic_history::types::MessageRecord;

/// Global counter for unique file names within one test process
static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fixed origin all test timestamps are offset from
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    base_time() + TimeDelta::seconds(seconds)
}

pub fn at_millis(millis: i64) -> DateTime<Utc> {
    base_time() + TimeDelta::milliseconds(millis)
}

pub fn msg(stream: &str, sequence: u64, seconds: i64, size: u64) -> MessageRecord {
    MessageRecord::new(stream, sequence, at(seconds), size)
}

/// Two interleaved streams with gaps in both
///
/// ORDERS: seq 1..=20 every second, 6..=10 removed
/// AUDIT:  seq 1..=10 every two seconds, 4 removed
pub fn two_stream_messages() -> Vec<MessageRecord> {
    let mut messages = Vec::new();
    for seq in (1..=20u64).filter(|s| !(6..=10).contains(s)) {
        messages.push(msg("ORDERS", seq, seq as i64 - 1, 100 + seq));
    }
    for seq in (1..=10u64).filter(|s| *s != 4) {
        messages.push(msg("AUDIT", seq, (seq as i64 - 1) * 2, 40));
    }
    messages
}

/// Unique path in the system temp directory for a test artifact
pub fn unique_temp_path(test_name: &str, extension: &str) -> PathBuf {
    let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "traffic_history_{}_{}_{}.{}",
        test_name,
        std::process::id(),
        unique_id,
        extension
    ))
}

/// Write messages as a dump file and return the handle keeping it alive
pub fn write_dump(messages: &[MessageRecord]) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    writeln!(file, "stream,sequence,timestamp,size")?;
    for m in messages {
        writeln!(
            file,
            "{},{},{},{}",
            m.stream_name,
            m.sequence,
            m.timestamp.to_rfc3339(),
            m.size
        )?;
    }
    file.flush()?;
    Ok(file)
}
