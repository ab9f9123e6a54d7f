//! Query API over a histogram built from a dump file

use crate::common::{at_millis, two_stream_messages, write_dump};
use chrono::TimeDelta;
use hyper::{Method, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use traffic_history::analysis::{build_histogram, build_summary_with_info};
use traffic_history::server::{route, serve_listener, ApiState};
use traffic_history::source::{discover_streams, CsvDumpSource, FetchOptions, MessageFetcher};
use traffic_history::types::{MessageRecord, RateHistogram, ReportSummary, StreamShare};

async fn state_from_dump(max_buckets: usize) -> anyhow::Result<ApiState> {
    let dump = write_dump(&two_stream_messages())?;
    let source = CsvDumpSource::open(dump.path())?;
    let streams = discover_streams(&source, &[]).await?;
    let outcome = MessageFetcher::new(&source, FetchOptions::default())?
        .fetch_all(&streams)
        .await;
    let hist = build_histogram(&outcome.messages, TimeDelta::seconds(1))?;
    let summary = build_summary_with_info(&outcome.messages, &streams);
    Ok(ApiState::new(hist, summary, max_buckets))
}

#[test]
fn test_fractional_start_keeps_sub_second_buckets() -> anyhow::Result<()> {
    let messages: Vec<_> = (0..4u64)
        .map(|i| MessageRecord::new("S", i + 1, at_millis(i as i64 * 250), 10))
        .collect();
    let hist = build_histogram(&messages, TimeDelta::milliseconds(250))?;
    let summary = build_summary_with_info(&messages, &[]);
    let state = ApiState::new(hist, summary, 100);

    let resp = route(
        &state,
        &Method::GET,
        "/api/histogram",
        Some("start=1704067200.25&end=1704067201"),
    );
    assert_eq!(resp.status, StatusCode::OK);
    let hist: RateHistogram = serde_json::from_str(&resp.body)?;
    assert_eq!(hist.len(), 3);
    assert_eq!(hist.start(), Some(at_millis(250)));
    assert_eq!(hist.total_count(), 3);
    Ok(())
}

/// Issue one request over a fresh connection and return status plus body
async fn http_get(addr: std::net::SocketAddr, target: &str) -> anyhow::Result<(u16, String)> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        target, addr
    );
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let text = String::from_utf8(raw)?;
    let (head, body) = text
        .split_once("\r\n\r\n")
        .ok_or_else(|| anyhow::anyhow!("malformed response: {}", text))?;
    let status = head
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("missing status line"))?
        .parse()?;
    Ok((status, body.to_string()))
}

#[tokio::test]
async fn test_routes_serve_dump_data() -> anyhow::Result<()> {
    let state = state_from_dump(5).await?;

    let resp = route(&state, &Method::GET, "/api/summary", None);
    assert_eq!(resp.status, StatusCode::OK);
    let summary: ReportSummary = serde_json::from_str(&resp.body)?;
    assert_eq!(summary.total_messages, 24);

    let resp = route(&state, &Method::GET, "/api/histogram", Some("stream=AUDIT&downsample=avg"));
    assert_eq!(resp.status, StatusCode::OK);
    let hist: RateHistogram = serde_json::from_str(&resp.body)?;
    assert!(hist.len() <= 5);
    assert_eq!(hist.total_count(), 9);
    assert_eq!(hist.total_seq_count(), 10);

    let resp = route(
        &state,
        &Method::GET,
        "/api/distribution",
        Some("start=1704067200&end=1704067205"),
    );
    let shares: Vec<StreamShare> = serde_json::from_str(&resp.body)?;
    let orders = shares.iter().find(|s| s.name == "ORDERS").expect("ORDERS share");
    assert_eq!(orders.messages, 5);

    let resp = route(&state, &Method::GET, "/api/histogram", Some("stream=NOPE"));
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_http_server_answers_queries() -> anyhow::Result<()> {
    let state = state_from_dump(10).await?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(serve_listener(listener, 8, state, async move {
        let _ = stop_rx.await;
    }));

    let (status, body) = http_get(addr, "/api/streams").await?;
    assert_eq!(status, 200);
    let streams: Vec<String> = serde_json::from_str(&body)?;
    assert_eq!(streams, ["AUDIT", "ORDERS"]);

    let (status, body) = http_get(addr, "/api/histogram?start=1704067202&end=1704067208").await?;
    assert_eq!(status, 200);
    let hist: RateHistogram = serde_json::from_str(&body)?;
    assert_eq!(hist.len(), 6);

    let (status, body) = http_get(addr, "/api/histogram?start=yesterday").await?;
    assert_eq!(status, 400);
    assert!(body.contains("error"));

    let (status, _) = http_get(addr, "/metrics").await?;
    assert_eq!(status, 404);

    let _ = stop_tx.send(());
    server.await??;
    Ok(())
}
