//! Flat listing of blob names, optionally filtered by a prefix.

use futures::TryStreamExt;
use jiff::Timestamp;
use object_store::ObjectMeta;
use object_store::path::Path;
use serde::Serialize;

use super::BlobContainer;
use crate::name::{DELIMITER, blob_url, normalize_prefix};
use crate::{Error, Result, TRACING_TARGET_CONTAINER};

/// One listed blob with the metadata the store returns for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobEntry {
    /// Container-relative name.
    pub name: String,
    /// Full URL of the blob.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
}

impl BlobContainer {
    /// Names of every blob in the container, sorted.
    pub async fn list_all(&self) -> Result<Vec<String>> {
        self.list_by_prefix("").await
    }

    /// Names of blobs whose name starts with `relative_path`, sorted.
    ///
    /// The prefix is normalized like a blob name, so `/foo/`, `foo/` and
    /// `\foo\` list the same blobs. Matching is a plain string prefix: `a/b`
    /// matches `a/b.txt` as well as `a/b/c.txt`.
    pub async fn list_by_prefix(&self, relative_path: &str) -> Result<Vec<String>> {
        let entries = self.list_entries(relative_path).await?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    /// Blobs whose name starts with `relative_path`, with size and metadata.
    #[tracing::instrument(name = "blob.list", skip(self), fields(count))]
    pub async fn list_entries(&self, relative_path: &str) -> Result<Vec<BlobEntry>> {
        let prefix = normalize_prefix(relative_path);

        // The store lists whole segments only; narrow to the directory part
        // and filter the rest by string prefix.
        let directory = match prefix.rfind(DELIMITER) {
            Some(index) => Some(
                Path::parse(&prefix[..index])
                    .map_err(|e| Error::invalid_name(relative_path, e.to_string()))?,
            ),
            None => None,
        };

        let objects: Vec<ObjectMeta> = self.store.list(directory.as_ref()).try_collect().await?;

        let mut entries: Vec<BlobEntry> = objects
            .into_iter()
            .filter(|meta| meta.location.as_ref().starts_with(prefix.as_str()))
            .map(|meta| self.entry(meta))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::Span::current().record("count", entries.len());
        tracing::debug!(
            target: TRACING_TARGET_CONTAINER,
            prefix = %prefix,
            count = entries.len(),
            "Listed blobs"
        );

        Ok(entries)
    }

    fn entry(&self, meta: ObjectMeta) -> BlobEntry {
        let name = String::from(meta.location);
        let url = blob_url(&self.endpoint, &self.container, &name).into();
        BlobEntry {
            url,
            size: meta.size,
            last_modified: Timestamp::from_millisecond(meta.last_modified.timestamp_millis()).ok(),
            e_tag: meta.e_tag,
            name,
        }
    }
}
