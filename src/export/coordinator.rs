//! Export engine orchestrating a backup run
//!
//! Brings together the page fetcher, the configured sink, and progress
//! tracking:
//!
//! ```text
//! Init -> Fetching -> Routing -> (Fetching | Finalizing) -> Done
//! ```
//!
//! Any error aborts the run where it happens. Nothing is rolled back: batch
//! objects already uploaded in per-batch mode stay in the store.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{BackupConfig, OutputMode};
use crate::error::Result;
use crate::naming::NamingPolicy;
use crate::search::{PageFetcher, SearchGateway};
use crate::storage::{JSON_CONTENT_TYPE, ObjectStore};

use super::progress::ProgressTracker;
use super::run::ExportRun;
use super::sinks::{BatchSink, PerBatchSink, SingleFileSink};
use super::summary::BackupSummary;

/// Value returned by a successful [`backup`].
pub const SUCCESS_TOKEN: &str = "OK";

/// Engine for one or more independent export runs
pub struct ExportEngine {
    config: BackupConfig,
    search: Arc<dyn SearchGateway>,
    store: Arc<dyn ObjectStore>,
}

impl ExportEngine {
    /// Create a new export engine
    pub fn new(
        config: BackupConfig,
        search: Arc<dyn SearchGateway>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            search,
            store,
        }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Export the whole index, starting now
    pub async fn run(&self) -> Result<BackupSummary> {
        self.run_at(Utc::now()).await
    }

    /// Export the whole index with keys derived from `started_at`
    ///
    /// This is the main entry point that drives the run:
    /// 1. Open the sink for the configured output mode
    /// 2. Fetch pages until the first empty one, handing each to the sink
    /// 3. Finalize the sink
    /// 4. Build the summary and, for per-batch output, store it as the manifest
    ///
    /// # Returns
    /// * `Result<BackupSummary>` - Summary of the completed backup
    pub async fn run_at(&self, started_at: DateTime<Utc>) -> Result<BackupSummary> {
        self.config.validate()?;

        let export = &self.config.export;
        let bucket = self.config.target.bucket.as_str();
        let naming = NamingPolicy::new(export.run_mode, export.file_name.clone(), started_at);
        let mut run = ExportRun::new(started_at, export.output_mode);

        info!(
            "Starting backup of {} to bucket '{}' ({:?}, {:?})",
            self.config.search.endpoint, bucket, export.output_mode, export.run_mode
        );

        let mut sink = self.open_sink(&naming).await?;
        let mut fetcher = PageFetcher::new(self.search.clone(), self.config.search.page_size);
        let tracker = ProgressTracker::new(export.show_progress);

        loop {
            let batch = fetcher.fetch_page().await?;
            if batch.is_empty() {
                debug!("Empty page after {} batches, result set exhausted", run.batch_index);
                break;
            }

            let serialized = serde_json::to_string(&batch.records)?;
            sink.accept(&serialized, run.is_first_batch()).await?;
            run.record_batch(batch.len(), serialized.len(), batch.server_time_ms);

            tracker.update(run.total_hits, run.batch_index);
            info!(
                batch = run.batch_index,
                hits = batch.len(),
                total_hits = run.total_hits,
                "Exported batch"
            );
        }
        debug_assert_eq!(fetcher.fetch_calls(), run.fetch_calls());

        let outcome = sink.finalize().await?;
        tracker.finish();
        run.batch_keys = outcome.batch_keys.clone();

        let summary = BackupSummary::build(&run, &self.config, &outcome, Utc::now());
        let summary_json = summary.to_json()?;

        if !run.mode.is_single_file() {
            self.store
                .put_object(
                    bucket,
                    &outcome.object_key,
                    Bytes::from(summary_json.clone()),
                    Some(JSON_CONTENT_TYPE),
                )
                .await?;
            info!("Stored backup index {}", outcome.object_key);
        }

        info!(summary = %summary_json, "Backup summary");
        info!(
            "Backup completed: {} documents, {} batches, {} ms",
            summary.stats.document_count,
            summary.batch_count,
            run.elapsed_ms()
        );

        Ok(summary)
    }

    async fn open_sink(&self, naming: &NamingPolicy) -> Result<Box<dyn BatchSink>> {
        let bucket = self.config.target.bucket.clone();

        match self.config.export.output_mode {
            OutputMode::SingleFile => {
                let file_name = &self.config.export.file_name;
                let stem = Path::new(file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "csbackup".to_string());

                let sink = SingleFileSink::open(
                    self.store.clone(),
                    bucket,
                    naming.backup_object_name(),
                    &self.config.scratch_dir(),
                    &stem,
                )
                .await?;
                Ok(Box::new(sink))
            }
            OutputMode::PerBatch => Ok(Box::new(PerBatchSink::new(
                self.store.clone(),
                bucket,
                naming.clone(),
            ))),
        }
    }
}

/// Run one backup and return the success token
///
/// # Arguments
/// * `config` - Backup configuration
/// * `search` - Search service to export from
/// * `store` - Object store to write to
pub async fn backup(
    config: BackupConfig,
    search: Arc<dyn SearchGateway>,
    store: Arc<dyn ObjectStore>,
) -> Result<&'static str> {
    ExportEngine::new(config, search, store).run().await?;
    Ok(SUCCESS_TOKEN)
}
