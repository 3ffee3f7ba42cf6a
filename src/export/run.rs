//! Mutable state of one export run

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::OutputMode;

/// Running counters threaded through one export.
///
/// `total_hits` always equals the number of records handed to the sink, and
/// `batch_index` the number of non-empty batches. The fetch loop issues one
/// more query than there are batches to discover exhaustion.
#[derive(Debug, Clone)]
pub struct ExportRun {
    pub started_at: DateTime<Utc>,
    pub started: Instant,
    pub batch_index: u64,
    pub total_hits: u64,
    pub total_bytes: u64,
    pub total_server_time_ms: u64,
    pub mode: OutputMode,
    /// Populated only for per-batch output.
    pub batch_keys: Vec<String>,
}

impl ExportRun {
    pub fn new(started_at: DateTime<Utc>, mode: OutputMode) -> Self {
        Self {
            started_at,
            started: Instant::now(),
            batch_index: 0,
            total_hits: 0,
            total_bytes: 0,
            total_server_time_ms: 0,
            mode,
            batch_keys: Vec::new(),
        }
    }

    /// Account for one batch handed to the sink.
    pub fn record_batch(&mut self, hits: usize, bytes: usize, server_time_ms: u64) {
        self.total_hits += hits as u64;
        self.total_bytes += bytes as u64;
        self.total_server_time_ms += server_time_ms;
        self.batch_index += 1;
    }

    pub fn is_first_batch(&self) -> bool {
        self.batch_index == 0
    }

    /// Queries issued by a completed run: every batch plus the empty one.
    pub fn fetch_calls(&self) -> u64 {
        self.batch_index + 1
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
