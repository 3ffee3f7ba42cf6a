//! Local append-only buffer for single-file exports
//!
//! The buffer owns a uniquely named scratch file. Bytes can only be appended;
//! [`AppendBuffer::finish`] flushes and closes it exactly once, after which
//! it can be read back as a byte stream for upload. The scratch file is
//! removed when the buffer is dropped, whether the run succeeded or not.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{BufferError, Result};
use crate::storage::ByteStream;

const WRITE_BUFFER_CAPACITY: usize = 8 * 1024 * 1024;

pub struct AppendBuffer {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    written: u64,
}

impl AppendBuffer {
    /// Create a fresh scratch file `{stem}-{uuid}.json` in `dir`.
    pub async fn create(dir: &Path, stem: &str) -> Result<Self> {
        let path = dir.join(format!("{stem}-{}.json", Uuid::new_v4()));
        let file = File::create(&path)
            .await
            .map_err(|e| BufferError::OpenFailed(format!("{}: {e}", path.display())))?;

        debug!("Created scratch buffer at {}", path.display());
        Ok(Self {
            writer: Some(BufWriter::with_capacity(WRITE_BUFFER_CAPACITY, file)),
            path,
            written: 0,
        })
    }

    /// Append bytes to the end of the buffer.
    pub async fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(BufferError::AlreadyFinished)?;
        writer
            .write_all(bytes)
            .await
            .map_err(|e| BufferError::WriteFailed(e.to_string()))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Flush and close the scratch file.
    ///
    /// # Returns
    /// * `Result<u64>` - Size of the file on disk
    pub async fn finish(&mut self) -> Result<u64> {
        let mut writer = self.writer.take().ok_or(BufferError::AlreadyFinished)?;
        writer
            .flush()
            .await
            .map_err(|e| BufferError::FlushFailed(e.to_string()))?;
        writer
            .shutdown()
            .await
            .map_err(|e| BufferError::FlushFailed(e.to_string()))?;
        drop(writer);

        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| BufferError::FlushFailed(format!("Failed to stat buffer: {e}")))?;

        if metadata.len() != self.written {
            warn!(
                "Scratch buffer holds {} bytes, {} were appended",
                metadata.len(),
                self.written
            );
        }
        Ok(metadata.len())
    }

    /// Open the finished buffer as an upload source.
    pub async fn reader(&self) -> Result<ByteStream> {
        if self.writer.is_some() {
            return Err(BufferError::OpenFailed("buffer is still open for writing".into()).into());
        }
        let file = File::open(&self.path)
            .await
            .map_err(|e| BufferError::OpenFailed(format!("{}: {e}", self.path.display())))?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn is_finished(&self) -> bool {
        self.writer.is_none()
    }
}

impl Drop for AppendBuffer {
    fn drop(&mut self) {
        if self.writer.is_some() {
            debug!("AppendBuffer dropped before finish");
        }
        self.writer = None;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove scratch buffer {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_append_finish_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = AppendBuffer::create(dir.path(), "csbackup").await.unwrap();

        buffer.append(b"[\n").await.unwrap();
        buffer.append(b"{\"id\":1}").await.unwrap();
        buffer.append(b"\n]").await.unwrap();

        let size = buffer.finish().await.unwrap();
        assert_eq!(size, 12);
        assert_eq!(buffer.bytes_written(), 12);

        let chunks: Vec<bytes::Bytes> = buffer.reader().await.unwrap().try_collect().await.unwrap();
        let content: Vec<u8> = chunks.concat();
        assert_eq!(content, b"[\n{\"id\":1}\n]");
    }

    #[tokio::test]
    async fn test_finish_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = AppendBuffer::create(dir.path(), "csbackup").await.unwrap();

        buffer.finish().await.unwrap();
        assert!(buffer.is_finished());
        assert!(buffer.finish().await.is_err());
        assert!(buffer.append(b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_reader_requires_finish() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = AppendBuffer::create(dir.path(), "csbackup").await.unwrap();
        assert!(buffer.reader().await.is_err());
    }

    #[tokio::test]
    async fn test_drop_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = AppendBuffer::create(dir.path(), "csbackup").await.unwrap();
        buffer.append(b"[\n").await.unwrap();

        let path = buffer.path().to_path_buf();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("csbackup-"));

        drop(buffer);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_create_in_missing_directory() {
        let result = AppendBuffer::create(Path::new("/nonexistent/scratch"), "csbackup").await;
        assert!(result.is_err());
    }
}
