//! Buffered single-file output
//!
//! Batches are merged into one JSON array in a local [`AppendBuffer`]:
//!
//! ```text
//! [
//! {batch 1 records},
//! {batch 2 records}
//! ]
//! ```
//!
//! On finalize the buffer is closed and streamed to the backup key.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{BufferError, Result};
use crate::export::buffer::AppendBuffer;
use crate::storage::{JSON_CONTENT_TYPE, ObjectStore};

use super::{BatchSink, SinkOutcome, strip_array_delimiters};

pub struct SingleFileSink {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    buffer: Option<AppendBuffer>,
    batches: u64,
}

impl SingleFileSink {
    /// Open the scratch buffer and write the opening delimiter
    ///
    /// # Arguments
    /// * `store` - Destination store
    /// * `bucket` - Destination bucket
    /// * `key` - Key of the consolidated backup
    /// * `scratch_dir` - Directory for the local buffer
    /// * `stem` - Prefix of the scratch file name
    pub async fn open(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        scratch_dir: &Path,
        stem: &str,
    ) -> Result<Self> {
        let mut buffer = AppendBuffer::create(scratch_dir, stem).await?;
        buffer.append(b"[\n").await?;

        Ok(Self {
            store,
            bucket: bucket.into(),
            key: key.into(),
            buffer: Some(buffer),
            batches: 0,
        })
    }
}

#[async_trait]
impl BatchSink for SingleFileSink {
    async fn accept(&mut self, serialized: &str, is_first: bool) -> Result<()> {
        let buffer = self.buffer.as_mut().ok_or(BufferError::AlreadyFinished)?;
        let records = strip_array_delimiters(serialized)?;

        if !is_first {
            buffer.append(b",\n").await?;
        }
        buffer.append(records.as_bytes()).await?;

        self.batches += 1;
        debug!(
            "Buffered batch #{} ({} bytes so far)",
            self.batches,
            buffer.bytes_written()
        );
        Ok(())
    }

    async fn finalize(&mut self) -> Result<SinkOutcome> {
        // Taking the buffer drops it, and its scratch file, at the end of this call.
        let mut buffer = self.buffer.take().ok_or(BufferError::AlreadyFinished)?;
        buffer.append(b"\n]").await?;
        let size = buffer.finish().await?;

        debug!("Uploading {} ({} bytes) to {}", buffer.path().display(), size, self.key);
        let source = buffer.reader().await?;
        let uploaded = self
            .store
            .stream_upload(&self.bucket, &self.key, source, JSON_CONTENT_TYPE)
            .await?;

        if uploaded != size {
            warn!("Uploaded {} bytes of a {} byte backup", uploaded, size);
        }
        info!("Uploaded backup {} ({} bytes)", self.key, size);

        Ok(SinkOutcome {
            object_key: self.key.clone(),
            object_size: Some(size),
            batch_keys: Vec::new(),
        })
    }
}
