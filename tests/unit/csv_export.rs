//! Bucket CSV export round trips

use crate::common::{two_stream_messages, unique_temp_path};
use chrono::TimeDelta;
use traffic_history::analysis::reports::csv_export::{read_csv, write_csv, CsvExporter};
use traffic_history::analysis::{build_histogram, extract_source_histogram};

#[test]
fn test_export_round_trip_preserves_totals() -> anyhow::Result<()> {
    let hist = build_histogram(&two_stream_messages(), TimeDelta::seconds(1))?;
    let path = unique_temp_path("round_trip", "csv");

    write_csv(&path, &hist, "all")?;
    let rows = read_csv(&path)?;
    std::fs::remove_file(&path)?;

    assert_eq!(rows.len(), hist.len());
    assert_eq!(rows.iter().map(|r| r.count).sum::<u64>(), hist.total_count());
    assert_eq!(rows.iter().map(|r| r.bytes).sum::<u64>(), hist.total_bytes());
    for (row, bucket) in rows.iter().zip(&hist.buckets) {
        assert_eq!(row.timestamp, bucket.start);
        assert!((row.rate_msg_per_sec - bucket.rate).abs() < 0.005 + f64::EPSILON);
        assert!((row.throughput_bytes_per_sec - bucket.throughput).abs() < 0.005 + f64::EPSILON);
    }
    Ok(())
}

#[test]
fn test_sub_second_timestamps_survive_export() -> anyhow::Result<()> {
    let hist = build_histogram(&two_stream_messages(), TimeDelta::milliseconds(250))?;
    let path = unique_temp_path("sub_second", "csv");

    write_csv(&path, &hist, "all")?;
    let rows = read_csv(&path)?;
    std::fs::remove_file(&path)?;

    let starts: Vec<_> = hist.buckets.iter().map(|b| b.start).collect();
    let exported: Vec<_> = rows.iter().map(|r| r.timestamp).collect();
    assert_eq!(exported, starts);
    Ok(())
}

#[test]
fn test_exporter_appends_each_stream_once() -> anyhow::Result<()> {
    let combined = build_histogram(&two_stream_messages(), TimeDelta::seconds(1))?;
    let orders = extract_source_histogram(&combined, "ORDERS").expect("ORDERS breakdown");
    let audit = extract_source_histogram(&combined, "AUDIT").expect("AUDIT breakdown");

    let path = unique_temp_path("exporter", "csv");
    let mut exporter = CsvExporter::new(&path.to_string_lossy());
    exporter.export(&orders, "ORDERS")?;
    exporter.export(&audit, "AUDIT")?;
    assert_eq!(exporter.rows_written(), orders.len() + audit.len());

    let rows = read_csv(exporter.path())?;
    std::fs::remove_file(exporter.path())?;

    assert_eq!(rows.len(), orders.len() + audit.len());
    let orders_count: u64 = rows.iter().filter(|r| r.stream == "ORDERS").map(|r| r.count).sum();
    let audit_count: u64 = rows.iter().filter(|r| r.stream == "AUDIT").map(|r| r.count).sum();
    assert_eq!(orders_count, 15);
    assert_eq!(audit_count, 9);
    Ok(())
}
