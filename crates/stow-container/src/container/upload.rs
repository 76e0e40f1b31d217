//! Upload family: file, text, bytes and seekable streams.

use std::io::SeekFrom;
use std::path::Path as LocalPath;
use std::sync::Arc;

use bytes::Bytes;
use object_store::buffered::BufWriter;
use object_store::{Attribute, PutOptions, PutPayload};
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWriteExt};

use super::BlobContainer;
use crate::{BlobName, Error, Result, TRACING_TARGET_CONTAINER, Uploaded, WriteOutcome};

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

impl BlobContainer {
    /// Upload a local file under its file name.
    #[tracing::instrument(name = "blob.upload_file", skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn upload_file(&self, path: impl AsRef<LocalPath>) -> Result<Uploaded> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::invalid_name(path.display().to_string(), "path has no UTF-8 file name")
            })?;
        self.upload_file_as(path, file_name).await
    }

    /// Upload a local file under `name`.
    pub async fn upload_file_as(
        &self,
        path: impl AsRef<LocalPath>,
        name: &str,
    ) -> Result<Uploaded> {
        let mut file = tokio::fs::File::open(path.as_ref()).await?;
        self.upload_stream(&mut file, name).await
    }

    /// Upload UTF-8 text, stored with a `text/plain` content type.
    pub async fn upload_text(&self, text: &str, name: &str) -> Result<Uploaded> {
        let data = Bytes::copy_from_slice(text.as_bytes());
        self.put(name, data, Some(TEXT_CONTENT_TYPE)).await
    }

    /// Upload a byte buffer.
    pub async fn upload_bytes(&self, data: impl Into<Bytes>, name: &str) -> Result<Uploaded> {
        self.put(name, data.into(), None).await
    }

    /// Upload everything in `reader`.
    ///
    /// The reader is rewound to its start first, so content consumed before
    /// the call is still uploaded. Data is streamed through a buffered
    /// multipart writer rather than held in memory.
    #[tracing::instrument(name = "blob.upload_stream", skip(self, reader), fields(size))]
    pub async fn upload_stream<R>(&self, reader: &mut R, name: &str) -> Result<Uploaded>
    where
        R: AsyncRead + AsyncSeek + Unpin + ?Sized,
    {
        let name = BlobName::new(name)?;
        reader.seek(SeekFrom::Start(0)).await?;
        let outcome = self.write_outcome(&name).await?;

        let mut writer = BufWriter::new(Arc::clone(&self.store), name.as_path().clone());
        let size = match tokio::io::copy(reader, &mut writer).await {
            Ok(size) => size,
            Err(err) => {
                if let Err(abort) = writer.abort().await {
                    tracing::warn!(
                        target: TRACING_TARGET_CONTAINER,
                        name = %name,
                        error = %abort,
                        "Failed to abort partial upload"
                    );
                }
                return Err(err.into());
            }
        };
        writer.shutdown().await?;

        tracing::Span::current().record("size", size);
        tracing::debug!(
            target: TRACING_TARGET_CONTAINER,
            name = %name,
            size,
            ?outcome,
            "Uploaded stream"
        );

        Ok(Uploaded {
            name,
            size,
            outcome,
        })
    }

    #[tracing::instrument(name = "blob.put", skip(self, data), fields(size = data.len()))]
    async fn put(&self, name: &str, data: Bytes, content_type: Option<&str>) -> Result<Uploaded> {
        let name = BlobName::new(name)?;
        let outcome = self.write_outcome(&name).await?;
        let size = data.len() as u64;

        let mut opts = PutOptions::default();
        if let Some(ct) = content_type {
            opts.attributes
                .insert(Attribute::ContentType, ct.to_owned().into());
        }

        self.store
            .put_opts(name.as_path(), PutPayload::from(data), opts)
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_CONTAINER,
            name = %name,
            size,
            ?outcome,
            "Uploaded blob"
        );

        Ok(Uploaded {
            name,
            size,
            outcome,
        })
    }

    async fn write_outcome(&self, name: &BlobName) -> Result<WriteOutcome> {
        Ok(match self.probe(name).await? {
            Some(_) => WriteOutcome::Overwritten,
            None => WriteOutcome::Created,
        })
    }
}
