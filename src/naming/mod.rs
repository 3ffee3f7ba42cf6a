//! Object key naming
//!
//! Keys are either a fixed name (one-shot mode) or prefixed with the run's
//! UTC start date and minute: `YYYY-MM-DD/HH:MM/{file}`. The prefix is frozen
//! when the policy is built so every object of one run shares it.

use chrono::{DateTime, Utc};

use crate::config::RunMode;

/// Derives object keys for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    run_mode: RunMode,
    file_name: String,
    date_path: String,
    time_path: String,
}

impl NamingPolicy {
    /// Create a policy for a run started at `started_at`.
    pub fn new(run_mode: RunMode, file_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_mode,
            file_name: file_name.into(),
            date_path: started_at.format("%Y-%m-%d").to_string(),
            time_path: started_at.format("%H:%M").to_string(),
        }
    }

    /// Key of the consolidated backup (single file) or the manifest (per batch).
    pub fn backup_object_name(&self) -> String {
        match self.run_mode {
            RunMode::OneShot => self.file_name.clone(),
            RunMode::TimePartitioned => self.timed_name(&self.file_name),
        }
    }

    /// Key of the batch object at `index`.
    pub fn timed_batch_name(&self, index: u64) -> String {
        self.timed_name(&format!("{index}.json"))
    }

    /// Join `file_name` under the run's date/time prefix.
    pub fn timed_name(&self, file_name: &str) -> String {
        let file_name = file_name.trim_start_matches('/');
        format!("{}/{}/{}", self.date_path, self.time_path, file_name)
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}
