//! Object storage access
//!
//! The export only needs two capabilities from object storage: putting a
//! small object in one call and streaming a larger object from a local
//! source. Both are expressed by [`ObjectStore`], implemented on the
//! `object_store` crate by [`ObjectStoreBackend`].

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::{Result, StorageError};

pub mod backend;
pub mod memory;

pub use backend::ObjectStoreBackend;
pub use memory::{MemoryObjectStore, StoredObject};

/// Content type of every object the export writes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Readable source for streamed uploads.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Put/stream capability of the object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` at `bucket`/`key`, replacing any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<()>;

    /// Stream `source` to `bucket`/`key`.
    ///
    /// # Returns
    /// * `Result<u64>` - Number of bytes uploaded
    async fn stream_upload(
        &self,
        bucket: &str,
        key: &str,
        source: ByteStream,
        content_type: &str,
    ) -> Result<u64>;
}

/// Whether every `/`-separated segment of `key` is a plain name.
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.split('/').any(|s| s.is_empty() || s == "." || s == "..")
}

/// Reject keys the export never produces and stores cannot map safely.
pub(crate) fn check_key(key: &str) -> Result<()> {
    if !is_valid_key(key) {
        return Err(StorageError::InvalidKey(key.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("csbackup.json").is_ok());
        assert!(check_key("2024-03-01/09:07/0.json").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("/csbackup.json").is_err());
        assert!(check_key("a//b.json").is_err());
        assert!(check_key("../escape.json").is_err());
        assert!(check_key("x/../y.json").is_err());
        assert!(check_key("dir/").is_err());
    }
}
