//! In-memory object store
//!
//! Wraps the `object_store` in-memory provider. Supports failing all writes
//! after a given number of successful ones to exercise partial-output
//! behavior.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{Attribute, ObjectStore as _};

use crate::error::{BackupError, Result, StorageError};

use super::backend::{ObjectStoreBackend, object_path};
use super::{ByteStream, ObjectStore, check_key};

/// One stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Object store held in process memory.
pub struct MemoryObjectStore {
    backend: ObjectStoreBackend,
    writes: AtomicUsize,
    fail_after: Option<usize>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self {
            backend: ObjectStoreBackend::memory(),
            writes: AtomicUsize::new(0),
            fail_after: None,
        }
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write after the first `writes` succeed.
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    /// Fetch a stored object.
    pub async fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let store = self.backend.bucket(bucket).ok()?;
        let result = store.get(&object_path(key).ok()?).await.ok()?;
        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| v.to_string());
        let body = result.bytes().await.ok()?;
        Some(StoredObject { body, content_type })
    }

    /// Keys stored in `bucket`, in lexical order.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let Ok(store) = self.backend.bucket(bucket) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = store
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of objects across all buckets.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for (bucket, _) in self.backend.opened() {
            total += self.keys(&bucket).await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Count one write, or refuse it once the limit is reached.
    fn admit(&self) -> std::result::Result<(), String> {
        let admitted = self
            .writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |writes| {
                match self.fail_after {
                    Some(limit) if writes >= limit => None,
                    _ => Some(writes + 1),
                }
            });
        admitted
            .map(|_| ())
            .map_err(|_| "injected write failure".to_string())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<()> {
        check_key(key)?;
        self.admit().map_err(|message| -> BackupError {
            StorageError::PutFailed {
                key: key.to_string(),
                message,
            }
            .into()
        })?;
        self.backend.put_object(bucket, key, body, content_type).await
    }

    async fn stream_upload(
        &self,
        bucket: &str,
        key: &str,
        source: ByteStream,
        content_type: &str,
    ) -> Result<u64> {
        check_key(key)?;
        self.admit().map_err(|message| -> BackupError {
            StorageError::UploadFailed {
                key: key.to_string(),
                message,
            }
            .into()
        })?;
        self.backend
            .stream_upload(bucket, key, source, content_type)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&'static str]) -> ByteStream {
        let items: Vec<std::io::Result<Bytes>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryObjectStore::new();
        store
            .put_object("bucket", "a/0.json", Bytes::from_static(b"[]"), None)
            .await
            .unwrap();

        let object = store.get("bucket", "a/0.json").await.unwrap();
        assert_eq!(object.body, Bytes::from_static(b"[]"));
        assert_eq!(object.content_type, None);
        assert!(store.get("other", "a/0.json").await.is_none());
    }

    #[tokio::test]
    async fn test_stream_upload() {
        let store = MemoryObjectStore::new();
        let size = store
            .stream_upload("bucket", "all.json", chunks(&["[\n", "{}", "\n]"]), "application/json")
            .await
            .unwrap();

        assert_eq!(size, 6);
        let object = store.get("bucket", "all.json").await.unwrap();
        assert_eq!(object.body, Bytes::from_static(b"[\n{}\n]"));
        assert_eq!(object.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_failing_after() {
        let store = MemoryObjectStore::failing_after(1);
        store
            .put_object("b", "0.json", Bytes::new(), None)
            .await
            .unwrap();

        let err = store
            .put_object("b", "1.json", Bytes::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Storage(StorageError::PutFailed { .. })));
        assert_eq!(store.keys("b").await, vec!["0.json".to_string()]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_key() {
        let store = MemoryObjectStore::new();
        let result = store.put_object("b", "/0.json", Bytes::new(), None).await;
        assert!(result.is_err());
        assert!(store.is_empty().await);
    }
}
