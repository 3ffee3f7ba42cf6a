//! Backup summary record
//!
//! Built once when a run completes. In per-batch mode it is stored as the
//! manifest object; in single-file mode it is only logged.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BackupConfig;
use crate::error::Result;

use super::run::ExportRun;
use super::sinks::SinkOutcome;

/// Immutable description of a completed backup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    /// Number of non-empty batches exported.
    pub batch_count: u64,
    /// Number of search queries issued, including the final empty page.
    pub fetch_calls: u64,
    /// Configured page size.
    pub batch_size: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub completed_at: DateTime<Utc>,
    pub region: String,
    pub document_endpoint: String,
    /// Batch object keys, per-batch output only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_keys: Option<Vec<String>>,
    pub stats: BackupStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupStats {
    /// Sum of server-reported processing time.
    pub server_time_ms: u64,
    /// Wall time of the run up to the summary.
    pub elapsed_ms: u64,
    pub document_count: u64,
    /// Sum of the serialized batch lengths.
    pub byte_length: u64,
    /// Size of the uploaded object, single-file output only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_object_size: Option<u64>,
}

impl BackupSummary {
    /// Snapshot a finished run.
    ///
    /// `completed_at` is cut to whole milliseconds, the precision it is
    /// stored with, so a summary equals its own manifest once read back.
    pub fn build(
        run: &ExportRun,
        config: &BackupConfig,
        outcome: &SinkOutcome,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let single_file = run.mode.is_single_file();

        Self {
            batch_count: run.batch_index,
            fetch_calls: run.fetch_calls(),
            batch_size: config.search.page_size,
            completed_at: completed_at.trunc_subsecs(3),
            region: config.target.region.clone(),
            document_endpoint: config.search.endpoint.clone(),
            batch_keys: (!single_file).then(|| run.batch_keys.clone()),
            stats: BackupStats {
                server_time_ms: run.total_server_time_ms,
                elapsed_ms: run.elapsed_ms(),
                document_count: run.total_hits,
                byte_length: run.total_bytes,
                final_object_size: if single_file { outcome.object_size } else { None },
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputMode;
    use chrono::{TimeZone, Timelike};

    fn finished_run(mode: OutputMode) -> ExportRun {
        let mut run = ExportRun::new(Utc::now(), mode);
        run.record_batch(3, 90, 4);
        run
    }

    #[test]
    fn test_single_file_summary() {
        let mut config = BackupConfig::default();
        config.target.region = "us-east-1".to_string();
        config.search.endpoint = "search-docs.example.com".to_string();
        let outcome = SinkOutcome {
            object_key: "csbackup.json".to_string(),
            object_size: Some(94),
            batch_keys: Vec::new(),
        };
        let completed_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 8, 0).unwrap();

        let summary = BackupSummary::build(
            &finished_run(OutputMode::SingleFile),
            &config,
            &outcome,
            completed_at,
        );
        assert_eq!(summary.batch_count, 1);
        assert_eq!(summary.fetch_calls, 2);
        assert_eq!(summary.batch_size, 10_000);
        assert_eq!(summary.batch_keys, None);
        assert_eq!(summary.stats.final_object_size, Some(94));

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["batchCount"], 1);
        assert_eq!(json["documentEndpoint"], "search-docs.example.com");
        assert_eq!(json["completedAt"], completed_at.timestamp_millis());
        assert_eq!(json["stats"]["documentCount"], 3);
        assert_eq!(json["stats"]["byteLength"], 90);
        assert!(json.get("batchKeys").is_none());
    }

    #[test]
    fn test_per_batch_summary() {
        let mut run = finished_run(OutputMode::PerBatch);
        run.batch_keys = vec!["2024-03-01/09:07/0.json".to_string()];
        let outcome = SinkOutcome {
            object_key: "2024-03-01/09:07/csbackup.json".to_string(),
            object_size: None,
            batch_keys: run.batch_keys.clone(),
        };

        let summary = BackupSummary::build(&run, &BackupConfig::default(), &outcome, Utc::now());
        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();

        assert_eq!(json["batchKeys"].as_array().unwrap().len(), 1);
        assert!(json["stats"].get("finalObjectSize").is_none());

        let parsed: BackupSummary = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.batch_keys, summary.batch_keys);
    }

    #[test]
    fn test_completed_at_survives_manifest_roundtrip() {
        let completed_at = Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 8, 50)
            .unwrap()
            .with_nanosecond(546_155_527)
            .unwrap();
        let outcome = SinkOutcome {
            object_key: "2024-03-01/09:07/csbackup.json".to_string(),
            object_size: None,
            batch_keys: Vec::new(),
        };

        let summary = BackupSummary::build(
            &finished_run(OutputMode::PerBatch),
            &BackupConfig::default(),
            &outcome,
            completed_at,
        );
        assert_eq!(summary.completed_at.timestamp_subsec_nanos(), 546_000_000);

        let parsed: BackupSummary = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(parsed, summary);
    }
}
