//! Dump file through discovery, fetching and histogram construction

use crate::common::{at, msg, two_stream_messages, write_dump};
use chrono::TimeDelta;
use std::io::Write;
use traffic_history::analysis::{
    build_histogram, build_summary_with_info, extract_source_histogram, stream_distribution,
};
use traffic_history::source::{
    discover_streams, CsvDumpSource, FetchOptions, FetchStrategy, MessageFetcher, TimeWindow,
};
use traffic_history::types::sort_by_timestamp;

#[tokio::test]
async fn test_dump_to_histogram_pipeline() -> anyhow::Result<()> {
    let dump = write_dump(&two_stream_messages())?;
    let source = CsvDumpSource::open(dump.path())?;
    assert_eq!(source.rows(), 24);

    let streams = discover_streams(&source, &[]).await?;
    let names: Vec<&str> = streams.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["AUDIT", "ORDERS"]);

    let fetcher = MessageFetcher::new(&source, FetchOptions::default())?;
    let outcome = fetcher.fetch_all(&streams).await;
    assert!(outcome.skipped_streams.is_empty());
    assert_eq!(outcome.messages.len(), 24);

    let hist = build_histogram(&outcome.messages, TimeDelta::seconds(1))?;
    assert_eq!(hist.total_count(), 24);
    assert_eq!(hist.stats.deleted_messages(), 6);

    let orders = extract_source_histogram(&hist, "ORDERS").expect("ORDERS breakdown");
    assert_eq!(orders.total_count(), 15);
    assert_eq!(orders.total_seq_count(), 20);

    let shares = stream_distribution(&hist, None, None);
    assert_eq!(shares[0].name, "ORDERS");
    assert_eq!(shares[0].messages, 15);
    assert_eq!(shares[1].seq_messages, 10);

    let summary = build_summary_with_info(&outcome.messages, &streams);
    assert_eq!(summary.stream_count, 2);
    assert_eq!(summary.total_messages, 24);
    let orders_summary = summary
        .streams
        .iter()
        .find(|s| s.name == "ORDERS")
        .expect("ORDERS summary");
    assert_eq!(orders_summary.missing_in_span(), 5);
    assert_eq!(orders_summary.reported.map(|r| r.message_count), Some(15));
    Ok(())
}

#[tokio::test]
async fn test_strategies_agree_on_windowed_fetch() -> anyhow::Result<()> {
    let dump = write_dump(&two_stream_messages())?;
    let source = CsvDumpSource::open(dump.path())?;
    let streams = discover_streams(&source, &[]).await?;

    let window = TimeWindow::new(Some(at(4)), Some(at(14)))?;
    let mut results = Vec::new();
    for strategy in [FetchStrategy::Sequential, FetchStrategy::Concurrent] {
        let options = FetchOptions {
            batch_size: 3,
            window,
            strategy,
            concurrency: 4,
            ..FetchOptions::default()
        };
        let mut messages = MessageFetcher::new(&source, options)?
            .fetch_all(&streams)
            .await
            .messages;
        sort_by_timestamp(&mut messages);
        assert!(messages.iter().all(|m| window.contains(m.timestamp)));
        results.push(messages);
    }
    assert_eq!(results[0], results[1]);
    assert!(!results[0].is_empty());
    Ok(())
}

#[tokio::test]
async fn test_stream_filter_and_retention_skip() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    writeln!(file, "stream,sequence,timestamp,size,retention")?;
    for m in two_stream_messages() {
        writeln!(file, "{},{},{},{},limits", m.stream_name, m.sequence, m.timestamp.to_rfc3339(), m.size)?;
    }
    writeln!(file, "JOBS,1,{},10,workqueue", at(0).to_rfc3339())?;
    file.flush()?;

    let source = CsvDumpSource::open(file.path())?;
    let all = discover_streams(&source, &[]).await?;
    assert_eq!(all.len(), 2);

    let filters = vec!["AUDIT".to_string(), "JOBS".to_string()];
    let filtered = discover_streams(&source, &filters).await?;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "AUDIT");
    Ok(())
}

#[tokio::test]
async fn test_limit_keeps_oldest_messages_per_stream() -> anyhow::Result<()> {
    let messages: Vec<_> = (1..=50u64).map(|s| msg("ORDERS", s, s as i64, 8)).collect();
    let dump = write_dump(&messages)?;
    let source = CsvDumpSource::open(dump.path())?;
    let streams = discover_streams(&source, &[]).await?;

    let options = FetchOptions {
        batch_size: 7,
        limit: Some(12),
        ..FetchOptions::default()
    };
    let outcome = MessageFetcher::new(&source, options)?.fetch_all(&streams).await;
    let sequences: Vec<u64> = outcome.messages.iter().map(|m| m.sequence).collect();
    assert_eq!(sequences, (1..=12).collect::<Vec<_>>());
    Ok(())
}
