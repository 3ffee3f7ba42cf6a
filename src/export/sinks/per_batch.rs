//! Per-batch output
//!
//! Every batch is uploaded as soon as it arrives, at
//! `{date}/{time}/{index}.json`. Nothing is buffered locally. If the run
//! fails part way, the batches already uploaded stay in the store.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{BackupError, Result};
use crate::naming::NamingPolicy;
use crate::storage::{JSON_CONTENT_TYPE, ObjectStore};

use super::{BatchSink, SinkOutcome};

pub struct PerBatchSink {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    naming: NamingPolicy,
    batch_keys: Vec<String>,
    finalized: bool,
}

impl PerBatchSink {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, naming: NamingPolicy) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            naming,
            batch_keys: Vec::new(),
            finalized: false,
        }
    }

    /// Keys uploaded so far.
    pub fn batch_keys(&self) -> &[String] {
        &self.batch_keys
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            return Err(BackupError::Generic("Per-batch sink already finalized".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchSink for PerBatchSink {
    async fn accept(&mut self, serialized: &str, _is_first: bool) -> Result<()> {
        self.ensure_open()?;

        let key = self.naming.timed_batch_name(self.batch_keys.len() as u64);
        self.store
            .put_object(
                &self.bucket,
                &key,
                Bytes::copy_from_slice(serialized.as_bytes()),
                Some(JSON_CONTENT_TYPE),
            )
            .await?;

        debug!("Uploaded batch {} ({} bytes)", key, serialized.len());
        self.batch_keys.push(key);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<SinkOutcome> {
        self.ensure_open()?;
        self.finalized = true;

        Ok(SinkOutcome {
            object_key: self.naming.backup_object_name(),
            object_size: None,
            batch_keys: self.batch_keys.clone(),
        })
    }
}
