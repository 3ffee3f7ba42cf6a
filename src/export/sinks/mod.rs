//! Output strategies for exported batches
//!
//! Each serialized batch is handed to a [`BatchSink`]:
//! - [`SingleFileSink`]: merges every batch into one JSON array on local disk
//!   and uploads it once at the end
//! - [`PerBatchSink`]: uploads every batch as its own object right away

use async_trait::async_trait;

use crate::error::{BackupError, Result};

pub mod per_batch;
pub mod single_file;

pub use per_batch::PerBatchSink;
pub use single_file::SingleFileSink;

/// What a sink produced once finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOutcome {
    /// Key of the consolidated backup, or of the manifest for per-batch output.
    pub object_key: String,
    /// Size of the consolidated backup. `None` for multi-object output.
    pub object_size: Option<u64>,
    /// Keys of the uploaded batch objects, in upload order.
    pub batch_keys: Vec<String>,
}

/// Destination for serialized batches.
#[async_trait]
pub trait BatchSink: Send {
    /// Take one batch serialized as a JSON array.
    ///
    /// # Arguments
    /// * `serialized` - The batch's records as a JSON array
    /// * `is_first` - Whether this is the first batch of the run
    async fn accept(&mut self, serialized: &str, is_first: bool) -> Result<()>;

    /// Complete the output. Can only be called once.
    async fn finalize(&mut self) -> Result<SinkOutcome>;
}

/// Inner comma-separated element list of a serialized JSON array.
pub(crate) fn strip_array_delimiters(serialized: &str) -> Result<&str> {
    serialized
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| BackupError::Generic("Serialized batch is not a JSON array".to_string()))
}
