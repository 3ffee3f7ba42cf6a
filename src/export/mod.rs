//! Export module for backing up a search index
//!
//! This module drives a full scan of the index and writes it to object
//! storage. It supports:
//! - Paged reads via an opaque cursor, one page at a time
//! - A single consolidated JSON array, buffered locally and uploaded once
//! - One object per batch plus a manifest describing the backup
//! - Running statistics collected into a [`BackupSummary`]
//!
//! # Architecture
//!
//! 1. **PageFetcher** (in `search`): yields batches until the first empty one
//! 2. **BatchSink**: single-file or per-batch output strategy
//! 3. **ProgressTracker**: optional spinner for interactive runs
//!
//! These components are orchestrated by the **ExportEngine**.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use csbackup::config::BackupConfig;
//! use csbackup::export::ExportEngine;
//! use csbackup::search::CloudSearchClient;
//! use csbackup::storage::ObjectStoreBackend;
//!
//! # async fn example() -> csbackup::Result<()> {
//! let config = BackupConfig::default();
//! let search = Arc::new(CloudSearchClient::from_config(&config)?);
//! let store = Arc::new(ObjectStoreBackend::from_config(&config));
//!
//! let summary = ExportEngine::new(config, search, store).run().await?;
//! println!("{} documents", summary.stats.document_count);
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod coordinator;
pub mod progress;
pub mod run;
pub mod sinks;
pub mod summary;


pub use buffer::AppendBuffer;
pub use coordinator::{ExportEngine, SUCCESS_TOKEN, backup};
pub use progress::ProgressTracker;
pub use run::ExportRun;
pub use sinks::{BatchSink, PerBatchSink, SingleFileSink, SinkOutcome};
pub use summary::{BackupStats, BackupSummary};
