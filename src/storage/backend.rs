//! Object storage on top of the `object_store` crate
//!
//! One client is opened per bucket on first use and reused for the rest of
//! the process. Amazon S3 is the production provider; the local filesystem
//! maps a bucket to `{root}/{bucket}`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ObjectStore as _, PutMultipartOpts, PutOptions, PutPayload,
    WriteMultipart,
};
use tracing::{debug, warn};

use crate::config::{BackupConfig, StoreKind};
use crate::error::{BackupError, Result, StorageError};

use super::{ByteStream, ObjectStore, check_key};

/// Parts kept in flight while streaming a multipart upload.
const MAX_IN_FLIGHT_PARTS: usize = 4;

pub(crate) type BucketStore = Arc<dyn object_store::ObjectStore>;

#[derive(Debug, Clone)]
enum Provider {
    S3 { region: String },
    Local { root: PathBuf },
    Memory,
}

impl Provider {
    fn open(&self, bucket: &str) -> Result<BucketStore> {
        if bucket.contains('/') || bucket == "." || bucket == ".." {
            return Err(unavailable(bucket, "not a valid bucket name"));
        }

        let store: BucketStore = match self {
            Provider::S3 { region } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if !region.is_empty() {
                    builder = builder.with_region(region);
                }
                Arc::new(builder.build().map_err(|e| unavailable(bucket, e))?)
            }
            Provider::Local { root } => {
                let dir = root.join(bucket);
                std::fs::create_dir_all(&dir).map_err(|e| unavailable(bucket, e))?;
                let local =
                    LocalFileSystem::new_with_prefix(&dir).map_err(|e| unavailable(bucket, e))?;
                Arc::new(local)
            }
            Provider::Memory => Arc::new(InMemory::new()),
        };
        Ok(store)
    }

    /// The local filesystem has nowhere to keep object attributes.
    fn keeps_attributes(&self) -> bool {
        !matches!(self, Provider::Local { .. })
    }
}

fn unavailable(bucket: &str, message: impl ToString) -> BackupError {
    StorageError::BucketUnavailable {
        bucket: bucket.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Map an export key onto an `object_store` path.
pub(crate) fn object_path(key: &str) -> Result<ObjectPath> {
    check_key(key)?;
    ObjectPath::parse(key).map_err(|_| StorageError::InvalidKey(key.to_string()).into())
}

/// [`ObjectStore`] backed by an `object_store` provider.
pub struct ObjectStoreBackend {
    provider: Provider,
    buckets: Mutex<HashMap<String, BucketStore>>,
}

impl ObjectStoreBackend {
    fn with_provider(provider: Provider) -> Self {
        Self {
            provider,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Amazon S3. Credentials and endpoint overrides come from the standard
    /// `AWS_*` environment variables; an empty `region` defers to them too.
    pub fn s3(region: impl Into<String>) -> Self {
        Self::with_provider(Provider::S3 {
            region: region.into(),
        })
    }

    /// Local directory, one subdirectory per bucket.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::with_provider(Provider::Local { root: root.into() })
    }

    /// Process memory, one map per bucket.
    pub fn memory() -> Self {
        Self::with_provider(Provider::Memory)
    }

    /// Backend selected by `target.store`.
    pub fn from_config(config: &BackupConfig) -> Self {
        match config.target.store {
            StoreKind::S3 => Self::s3(config.target.region.clone()),
            StoreKind::Local => Self::local(config.target.store_root.clone()),
        }
    }

    /// Client for `bucket`, opened on first use.
    pub(crate) fn bucket(&self, bucket: &str) -> Result<BucketStore> {
        let mut buckets = self.lock();
        if let Some(store) = buckets.get(bucket) {
            return Ok(store.clone());
        }

        let store = self.provider.open(bucket)?;
        debug!("Opened {:?} store for bucket '{}'", self.provider, bucket);
        buckets.insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    /// Buckets opened so far.
    pub(crate) fn opened(&self) -> Vec<(String, BucketStore)> {
        self.lock()
            .iter()
            .map(|(name, store)| (name.clone(), store.clone()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BucketStore>> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn attributes(&self, content_type: Option<&str>) -> Attributes {
        let mut attributes = Attributes::new();
        if let Some(content_type) = content_type {
            if self.provider.keeps_attributes() {
                attributes.insert(Attribute::ContentType, content_type.to_string().into());
            }
        }
        attributes
    }
}

/// Feed `source` into the multipart writer, returning the bytes written.
async fn pump(
    writer: &mut WriteMultipart,
    source: &mut ByteStream,
) -> std::result::Result<u64, String> {
    let mut written = 0u64;
    while let Some(chunk) = source.next().await {
        let chunk = chunk.map_err(|e| format!("Failed to read source: {e}"))?;
        writer
            .wait_for_capacity(MAX_IN_FLIGHT_PARTS)
            .await
            .map_err(|e| e.to_string())?;
        writer.write(&chunk);
        written += chunk.len() as u64;
    }
    Ok(written)
}

#[async_trait]
impl ObjectStore for ObjectStoreBackend {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<()> {
        let path = object_path(key)?;
        let store = self.bucket(bucket)?;
        let size = body.len();
        let opts = PutOptions {
            attributes: self.attributes(content_type),
            ..Default::default()
        };

        store
            .put_opts(&path, PutPayload::from(body), opts)
            .await
            .map_err(|e| StorageError::PutFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        debug!("Stored {} bytes at {}/{}", size, bucket, key);
        Ok(())
    }

    async fn stream_upload(
        &self,
        bucket: &str,
        key: &str,
        mut source: ByteStream,
        content_type: &str,
    ) -> Result<u64> {
        let path = object_path(key)?;
        let store = self.bucket(bucket)?;
        let upload_failed = |message: String| -> BackupError {
            StorageError::UploadFailed {
                key: key.to_string(),
                message,
            }
            .into()
        };

        let opts = PutMultipartOpts {
            attributes: self.attributes(Some(content_type)),
            ..Default::default()
        };
        let upload = store
            .put_multipart_opts(&path, opts)
            .await
            .map_err(|e| upload_failed(e.to_string()))?;
        let mut writer = WriteMultipart::new(upload);

        let written = match pump(&mut writer, &mut source).await {
            Ok(written) => written,
            Err(message) => {
                if let Err(e) = writer.abort().await {
                    warn!("Failed to abort upload of {}/{}: {}", bucket, key, e);
                }
                return Err(upload_failed(message));
            }
        };

        writer
            .finish()
            .await
            .map_err(|e| upload_failed(e.to_string()))?;

        debug!("Streamed {} bytes to {}/{}", written, bucket, key);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use object_store::ObjectStore as _;

    fn chunks(parts: &[&'static str]) -> ByteStream {
        let items: Vec<std::io::Result<Bytes>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_local_put_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ObjectStoreBackend::local(dir.path());

        backend
            .put_object(
                "bucket",
                "2024-03-01/09:07/0.json",
                Bytes::from_static(b"[1]"),
                Some("application/json"),
            )
            .await
            .unwrap();

        let path = dir.path().join("bucket").join("2024-03-01").join("09:07").join("0.json");
        assert_eq!(std::fs::read(&path).unwrap(), b"[1]");
    }

    #[tokio::test]
    async fn test_local_stream_upload() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ObjectStoreBackend::local(dir.path());

        let size = backend
            .stream_upload("bucket", "csbackup.json", chunks(&["[\n", "\n]"]), "application/json")
            .await
            .unwrap();

        assert_eq!(size, 4);
        let content = std::fs::read_to_string(dir.path().join("bucket/csbackup.json")).unwrap();
        assert_eq!(content, "[\n\n]");
    }

    #[tokio::test]
    async fn test_memory_keeps_content_type() {
        let backend = ObjectStoreBackend::memory();
        backend
            .stream_upload("bucket", "all.json", chunks(&["[", "{}", "]"]), "application/json")
            .await
            .unwrap();

        let store = backend.bucket("bucket").unwrap();
        let result = store.get(&ObjectPath::from("all.json")).await.unwrap();
        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| v.to_string());
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(result.bytes().await.unwrap(), Bytes::from_static(b"[{}]"));
    }

    #[tokio::test]
    async fn test_failed_source_leaves_no_object() {
        let backend = ObjectStoreBackend::memory();
        let source: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"[")),
            Err(std::io::Error::other("scratch file vanished")),
        ]));

        let err = backend
            .stream_upload("bucket", "all.json", source, "application/json")
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Storage(StorageError::UploadFailed { .. })));

        let store = backend.bucket("bucket").unwrap();
        assert!(store.head(&ObjectPath::from("all.json")).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_bad_keys_and_buckets() {
        let backend = ObjectStoreBackend::memory();
        for key in ["", "/0.json", "a//b.json", "x/../y.json"] {
            assert!(backend.put_object("bucket", key, Bytes::new(), None).await.is_err());
        }

        let err = backend
            .put_object("../escape", "0.json", Bytes::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackupError::Storage(StorageError::BucketUnavailable { .. })
        ));
    }

    #[test]
    fn test_buckets_are_opened_once() {
        let backend = ObjectStoreBackend::memory();
        let first = backend.bucket("bucket").unwrap();
        let second = backend.bucket("bucket").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.opened().len(), 1);
    }
}
