//! Query API handlers
//!
//! Routing is a pure function of the shared state and the request line so the
//! API can be exercised without a socket.

use super::query::QueryParams;
use super::ApiError;
use crate::analysis::reports::utils::export_json;
use crate::analysis::{compute_view, extract_source_histogram, stream_distribution, ViewTicket, ViewWindow};
use crate::types::{RateHistogram, ReportSummary, StreamShare};
use chrono::{DateTime, Utc};
use hyper::{Method, StatusCode};
use tracing::debug;

/// Read-only data shared by every request
#[derive(Debug, Clone)]
pub struct ApiState {
    combined: RateHistogram,
    summary: ReportSummary,
    streams: Vec<String>,
    max_buckets: usize,
}

impl ApiState {
    pub fn new(combined: RateHistogram, summary: ReportSummary, max_buckets: usize) -> Self {
        let mut streams: Vec<String> = summary.streams.iter().map(|s| s.name.clone()).collect();
        streams.sort();
        streams.dedup();
        Self {
            combined,
            summary,
            streams,
            max_buckets,
        }
    }

    pub fn streams(&self) -> &[String] {
        &self.streams
    }

    /// A lone stream's combined histogram carries no breakdown, so it is its own view
    fn single_stream(&self) -> Option<&str> {
        match self.streams.as_slice() {
            [only] if self.combined.source_names().is_empty() => Some(only.as_str()),
            _ => None,
        }
    }

    /// Histogram for `stream`, or the combined one when no stream is given
    pub fn histogram_for(&self, stream: Option<&str>) -> Option<RateHistogram> {
        match stream {
            None => Some(self.combined.clone()),
            Some(name) if self.single_stream() == Some(name) => Some(self.combined.clone()),
            Some(name) => extract_source_histogram(&self.combined, name),
        }
    }

    pub fn distribution(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Vec<StreamShare> {
        let Some(name) = self.single_stream() else {
            return stream_distribution(&self.combined, start, end);
        };
        let mut share = StreamShare {
            name: name.to_string(),
            messages: 0,
            seq_messages: 0,
            bytes: 0,
        };
        for b in self
            .combined
            .buckets
            .iter()
            .filter(|b| start.is_none_or(|s| b.end > s) && end.is_none_or(|e| b.start < e))
        {
            share.messages += b.count;
            share.seq_messages += b.seq_count;
            share.bytes += b.bytes;
        }
        if share.messages == 0 {
            Vec::new()
        } else {
            vec![share]
        }
    }
}

/// Status and JSON body of a handled request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    fn ok(body: String) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

impl From<ApiError> for ApiResponse {
    fn from(err: ApiError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() }).to_string();
        Self {
            status: err.status(),
            body,
        }
    }
}

pub fn route(state: &ApiState, method: &Method, path: &str, query: Option<&str>) -> ApiResponse {
    debug!("{} {} {:?}", method, path, query);
    let params = QueryParams::parse(query);
    let result = match path {
        "/api/summary" | "/api/streams" | "/api/histogram" | "/api/distribution"
            if *method != Method::GET =>
        {
            Err(ApiError::MethodNotAllowed(method.to_string()))
        }
        "/api/summary" => handle_summary(state),
        "/api/streams" => handle_streams(state),
        "/api/histogram" => handle_histogram(state, &params),
        "/api/distribution" => handle_distribution(state, &params),
        other => Err(ApiError::NotFound(other.to_string())),
    };
    match result {
        Ok(body) => ApiResponse::ok(body),
        Err(e) => e.into(),
    }
}

fn handle_summary(state: &ApiState) -> Result<String, ApiError> {
    Ok(export_json(&state.summary)?)
}

fn handle_streams(state: &ApiState) -> Result<String, ApiError> {
    Ok(export_json(&state.streams)?)
}

fn handle_histogram(state: &ApiState, params: &QueryParams) -> Result<String, ApiError> {
    let stream = params.get("stream");
    let start = params.timestamp("start")?;
    let end = params.timestamp("end")?;
    let policy = params.policy()?;

    let hist = state
        .histogram_for(stream)
        .ok_or_else(|| ApiError::NotFound(format!("stream {}", stream.unwrap_or_default())))?;

    let ticket = ViewTicket {
        version: 0,
        window: ViewWindow { start, end },
        policy,
    };
    let view = compute_view(&hist, &ticket, state.max_buckets)?;
    Ok(export_json(&view)?)
}

fn handle_distribution(state: &ApiState, params: &QueryParams) -> Result<String, ApiError> {
    let start = params.timestamp("start")?;
    let end = params.timestamp("end")?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(ApiError::BadRequest("start is after end".to_string()));
        }
    }
    Ok(export_json(&state.distribution(start, end))?)
}
