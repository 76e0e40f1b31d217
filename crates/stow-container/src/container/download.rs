//! Download family: local folder, byte buffer and caller-supplied stream.

use std::path::Path as LocalPath;

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::BlobContainer;
use crate::{BlobName, DownloadOutcome, Error, Result, TRACING_TARGET_CONTAINER};

impl BlobContainer {
    /// Download a blob into `folder`, one local directory per name segment.
    ///
    /// Missing intermediate directories are created and an existing local
    /// file is overwritten. A missing blob yields
    /// [`DownloadOutcome::NotFound`] and writes nothing.
    #[tracing::instrument(name = "blob.download_file", skip(self, folder), fields(folder = %folder.as_ref().display()))]
    pub async fn download_to_file(
        &self,
        name: &str,
        folder: impl AsRef<LocalPath>,
    ) -> Result<DownloadOutcome> {
        let name = BlobName::new(name)?;
        let path = name.local_path(folder)?;

        if self.probe(&name).await?.is_none() {
            tracing::debug!(
                target: TRACING_TARGET_CONTAINER,
                name = %name,
                "Blob does not exist, nothing to download"
            );
            return Ok(DownloadOutcome::NotFound);
        }

        let result = match self.store.get(name.as_path()).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(DownloadOutcome::NotFound),
            Err(err) => return Err(Error::Store(err)),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = result.into_stream();
        let mut size = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(
            target: TRACING_TARGET_CONTAINER,
            name = %name,
            path = %path.display(),
            size,
            "Downloaded blob to file"
        );

        Ok(DownloadOutcome::Downloaded { path, size })
    }

    /// Download a blob into a buffer sized from its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the blob does not exist.
    #[tracing::instrument(name = "blob.download_bytes", skip(self), fields(size))]
    pub async fn download_to_bytes(&self, name: &str) -> Result<Bytes> {
        let name = BlobName::new(name)?;
        let meta = self
            .store
            .head(name.as_path())
            .await
            .map_err(|e| Error::from_store(name.as_str(), e))?;
        tracing::Span::current().record("size", meta.size);

        let capacity = buffer_capacity(meta.size).ok_or_else(|| Error::TooLarge {
            name: name.as_str().to_owned(),
            size: meta.size,
        })?;
        let mut buffer = BytesMut::with_capacity(capacity);

        let result = self
            .store
            .get(name.as_path())
            .await
            .map_err(|e| Error::from_store(name.as_str(), e))?;
        let mut stream = result.into_stream();
        while let Some(chunk) = stream.try_next().await? {
            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer.freeze())
    }

    /// Stream a blob's content into `writer`, returning the bytes written.
    ///
    /// There is no existence check up front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the blob does not exist.
    #[tracing::instrument(name = "blob.download_stream", skip(self, writer), fields(size))]
    pub async fn download_to_stream<W>(&self, name: &str, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let name = BlobName::new(name)?;
        let result = self
            .store
            .get(name.as_path())
            .await
            .map_err(|e| Error::from_store(name.as_str(), e))?;

        let mut stream = result.into_stream();
        let mut size = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            writer.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        writer.flush().await?;

        tracing::Span::current().record("size", size);
        Ok(size)
    }
}

/// Allocation size for a blob of `size` bytes; buffers are capped at `isize::MAX`.
fn buffer_capacity(size: u64) -> Option<usize> {
    isize::try_from(size).ok().and_then(|size| usize::try_from(size).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_container() -> BlobContainer {
        BlobContainer::in_memory("photos")
    }

    #[tokio::test]
    async fn download_to_file_creates_directories() {
        let container = test_container();
        container
            .upload_text("nested content", "a/b/c.txt")
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let outcome = container
            .download_to_file("a/b/c.txt", dir.path())
            .await
            .unwrap();

        let expected = dir.path().join("a").join("b").join("c.txt");
        assert_eq!(
            outcome,
            DownloadOutcome::Downloaded {
                path: expected.clone(),
                size: 14,
            }
        );
        assert_eq!(tokio::fs::read(&expected).await.unwrap(), b"nested content");
    }

    #[tokio::test]
    async fn download_to_file_overwrites_local_file() {
        let container = test_container();
        container.upload_text("new", "f.txt").await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("f.txt"), b"old and longer")
            .await
            .unwrap();

        container.download_to_file("f.txt", dir.path()).await.unwrap();
        assert_eq!(
            tokio::fs::read(dir.path().join("f.txt")).await.unwrap(),
            b"new"
        );
    }

    #[tokio::test]
    async fn download_to_file_missing_blob_writes_nothing() {
        let container = test_container();
        let dir = tempfile::tempdir().unwrap();

        let outcome = container
            .download_to_file("missing/file.txt", dir.path())
            .await
            .unwrap();
        assert_eq!(outcome, DownloadOutcome::NotFound);
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn download_to_bytes_exact_length() {
        let container = test_container();
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        container
            .upload_bytes(payload.clone(), "bin/payload")
            .await
            .unwrap();

        let data = container.download_to_bytes("bin/payload").await.unwrap();
        assert_eq!(data.len(), payload.len());
        assert_eq!(&data[..], &payload[..]);
    }

    #[tokio::test]
    async fn download_to_bytes_missing_is_not_found() {
        let container = test_container();
        let err = container.download_to_bytes("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref name, .. } if name == "nope"));
    }

    #[test]
    fn oversized_blobs_are_not_buffered() {
        assert_eq!(buffer_capacity(0), Some(0));
        assert_eq!(buffer_capacity(4096), Some(4096));
        assert_eq!(buffer_capacity(u64::MAX), None);

        let err = Error::TooLarge {
            name: "huge.bin".to_owned(),
            size: u64::MAX,
        };
        assert!(!matches!(err, Error::InvalidName { .. }));
        assert_eq!(
            err.to_string(),
            format!("Blob 'huge.bin' is too large to buffer in memory ({} bytes)", u64::MAX)
        );
    }

    #[tokio::test]
    async fn download_to_stream_round_trip() {
        let container = test_container();
        let mut source = std::io::Cursor::new(b"streamed bytes".to_vec());
        container
            .upload_stream(&mut source, "s/stream.bin")
            .await
            .unwrap();

        let mut sink = Vec::new();
        let written = container
            .download_to_stream("s/stream.bin", &mut sink)
            .await
            .unwrap();
        assert_eq!(written, 14);
        assert_eq!(sink, b"streamed bytes");
    }

    #[tokio::test]
    async fn download_to_stream_missing_fails() {
        let container = test_container();
        let mut sink = Vec::new();
        let err = container
            .download_to_stream("absent", &mut sink)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(sink.is_empty());
    }
}
