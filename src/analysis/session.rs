//! Interactive view session
//!
//! Holds the zoom stack and a monotonically increasing request version. Every
//! navigation step issues a [`ViewTicket`]; when the computed view comes back,
//! [`ViewSession::complete`] drops it if a newer ticket has been issued since.

use super::downsample::{downsample, filter_by_time, DownsamplePolicy};
use crate::errors::{AppError, AppResult};
use crate::types::RateHistogram;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Visible time range; `None` bounds extend to the data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ViewWindow {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn is_full(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// A view request tagged with the version it was issued under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTicket {
    pub version: u64,
    pub window: ViewWindow,
    pub policy: DownsamplePolicy,
}

#[derive(Debug)]
pub struct ViewSession {
    current_window: ViewWindow,
    zoom_history: Vec<ViewWindow>,
    request_version: u64,
    policy: DownsamplePolicy,
}

impl Default for ViewSession {
    fn default() -> Self {
        Self::new(DownsamplePolicy::default())
    }
}

impl ViewSession {
    pub fn new(policy: DownsamplePolicy) -> Self {
        Self {
            current_window: ViewWindow::full(),
            zoom_history: Vec::new(),
            request_version: 0,
            policy,
        }
    }

    pub fn current_window(&self) -> ViewWindow {
        self.current_window
    }

    pub fn policy(&self) -> DownsamplePolicy {
        self.policy
    }

    pub fn request_version(&self) -> u64 {
        self.request_version
    }

    /// Number of windows that `back` can return to
    pub fn zoom_depth(&self) -> usize {
        self.zoom_history.len()
    }

    /// Re-issue a request for the current view
    pub fn refresh(&mut self) -> ViewTicket {
        self.request_version += 1;
        ViewTicket {
            version: self.request_version,
            window: self.current_window,
            policy: self.policy,
        }
    }

    /// Narrow the view to `[start, end)`, remembering the previous window
    pub fn zoom(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<ViewTicket> {
        if start >= end {
            return Err(AppError::InvalidTimeRange(format!(
                "zoom start {} must be before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        self.zoom_history.push(self.current_window);
        self.current_window = ViewWindow {
            start: Some(start),
            end: Some(end),
        };
        Ok(self.refresh())
    }

    /// Return to the previous window, if any
    pub fn back(&mut self) -> Option<ViewTicket> {
        let previous = self.zoom_history.pop()?;
        self.current_window = previous;
        Some(self.refresh())
    }

    /// Clear the zoom stack and show everything
    pub fn reset(&mut self) -> ViewTicket {
        self.zoom_history.clear();
        self.current_window = ViewWindow::full();
        self.refresh()
    }

    pub fn set_policy(&mut self, policy: DownsamplePolicy) -> ViewTicket {
        self.policy = policy;
        self.refresh()
    }

    pub fn is_current(&self, ticket: &ViewTicket) -> bool {
        ticket.version == self.request_version
    }

    /// Accept a computed view only if its ticket is still the latest
    pub fn complete<T>(&self, ticket: &ViewTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            debug!(
                "Discarding stale view v{} (current v{})",
                ticket.version, self.request_version
            );
            None
        }
    }
}

/// Compute the histogram a ticket asks for: filter to the window, then downsample
pub fn compute_view(
    hist: &RateHistogram,
    ticket: &ViewTicket,
    max_buckets: usize,
) -> AppResult<RateHistogram> {
    let filtered = if ticket.window.is_full() {
        hist.clone()
    } else {
        filter_by_time(hist, ticket.window.start, ticket.window.end)?
    };
    downsample(&filtered, max_buckets, ticket.policy)
}
