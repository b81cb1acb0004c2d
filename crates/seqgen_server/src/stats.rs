//! Request statistics.

use crate::response::StatResponse;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-command request counters.
#[derive(Debug)]
pub struct Stats {
    start_time: DateTime<Utc>,
    inner: Mutex<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    requests: BTreeMap<&'static str, u64>,
    last_request: Option<DateTime<Utc>>,
}

impl Stats {
    /// Starts counting from now.
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            inner: Mutex::new(Counters::default()),
        }
    }

    /// Counts one request for `command`.
    pub fn record(&self, command: &'static str) {
        let mut inner = self.inner.lock();
        *inner.requests.entry(command).or_insert(0) += 1;
        inner.last_request = Some(Utc::now());
    }

    /// Returns the number of requests counted for `command`.
    pub fn count(&self, command: &str) -> u64 {
        self.inner.lock().requests.get(command).copied().unwrap_or(0)
    }

    /// Builds the `/stat/` body.
    pub fn report(&self, len: usize, num_workers: usize) -> StatResponse {
        let inner = self.inner.lock();
        StatResponse {
            request_count: inner
                .requests
                .iter()
                .map(|(command, count)| ((*command).to_string(), *count))
                .collect(),
            start_time: self.start_time.format(TIME_FORMAT).to_string(),
            last_request_time: inner
                .last_request
                .map(|time| time.format(TIME_FORMAT).to_string())
                .unwrap_or_default(),
            len,
            num_workers,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
