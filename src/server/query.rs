use super::ApiError;
use crate::analysis::DownsamplePolicy;
use crate::utils::time::unix_seconds_to_datetime;
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

/// Decoded query-string parameters; the last occurrence of a key wins
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        let values = query
            .unwrap_or("")
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (decode(k), decode(v)),
                None => (decode(pair), String::new()),
            })
            .collect();
        Self { values }
    }

    /// Non-empty value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Unix seconds (fractional allowed) as a timestamp
    pub fn timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<f64>()
            .ok()
            .and_then(unix_seconds_to_datetime)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid {} timestamp: {}", key, raw)))
    }

    pub fn policy(&self) -> Result<DownsamplePolicy, ApiError> {
        match self.get("downsample") {
            None => Ok(DownsamplePolicy::default()),
            Some(raw) => raw
                .parse::<DownsamplePolicy>()
                .map_err(|e| ApiError::BadRequest(e.to_string())),
        }
    }
}
