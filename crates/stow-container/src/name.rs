//! Blob name normalization and container-relative name extraction.
//!
//! The store uses `/` as its only separator. Names and prefixes coming from
//! local paths may use `\` and a leading separator; both are normalized away
//! before they reach the store.

use std::path::{Component, Path as LocalPath, PathBuf};

use derive_more::Display;
use object_store::path::Path;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::{Error, Result};

/// Separator used by the blob store.
pub(crate) const DELIMITER: char = '/';

/// Convert local-style separators to the store's and strip one leading separator.
///
/// Used for both blob names and listing prefixes; an empty result is allowed
/// here (an empty prefix lists the whole container).
pub fn normalize_prefix(raw: &str) -> String {
    let converted = raw.replace('\\', "/");
    match converted.strip_prefix(DELIMITER) {
        Some(rest) => rest.to_owned(),
        None => converted,
    }
}

/// A normalized, container-relative blob name such as `photos/2024/cat.png`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct BlobName(Path);

impl BlobName {
    /// Normalize and validate a blob name.
    ///
    /// Rejects empty names, names ending in a separator, empty segments and
    /// `.` / `..` segments.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        let normalized = normalize_prefix(raw);

        if normalized.is_empty() {
            return Err(Error::invalid_name(raw, "name is empty"));
        }

        if normalized.ends_with(DELIMITER) {
            return Err(Error::invalid_name(raw, "name ends with a separator"));
        }

        let path =
            Path::parse(&normalized).map_err(|e| Error::invalid_name(raw, e.to_string()))?;
        Ok(Self(path))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    /// The final segment of the name.
    pub fn file_name(&self) -> &str {
        self.0.filename().unwrap_or_default()
    }

    /// Object store location for this name.
    pub(crate) fn as_path(&self) -> &Path {
        &self.0
    }

    /// Local file path for this blob under `folder`, one directory per segment.
    pub fn local_path(&self, folder: impl AsRef<LocalPath>) -> Result<PathBuf> {
        let mut path = folder.as_ref().to_path_buf();
        for segment in self.as_str().split(DELIMITER) {
            let mut components = LocalPath::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => path.push(part),
                _ => {
                    return Err(Error::invalid_name(
                        self.as_str(),
                        format!("segment '{segment}' cannot be used as a local path component"),
                    ));
                }
            }
        }
        Ok(path)
    }
}

impl AsRef<str> for BlobName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for BlobName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BlobName> for String {
    fn from(name: BlobName) -> Self {
        name.0.into()
    }
}

/// Extract the container-relative blob name from a full blob URL.
///
/// The container is matched as a whole path segment, never inside the host,
/// and everything after it is the blob name. Percent-encoded segments are
/// decoded.
///
/// ```
/// # use stow_container::logical_name_from_url;
/// let name = logical_name_from_url(
///     "https://photos.blob.core.windows.net/photos/2024/cat%20one.png",
///     "photos",
/// )?;
/// assert_eq!(name.as_str(), "2024/cat one.png");
/// # Ok::<(), stow_container::Error>(())
/// ```
pub fn logical_name_from_url(blob_url: &str, container: &str) -> Result<BlobName> {
    let url = parse_blob_url(blob_url)?;
    let segments = path_segments(&url);

    let Some(position) = segments.iter().position(|segment| *segment == container) else {
        return Err(not_in_container(blob_url, container));
    };

    decode_name(blob_url, &segments[position + 1..])
}

/// Extract the blob name from a URL under a known blob service `endpoint`.
///
/// The endpoint's own path (such as the emulator's account segment) is
/// removed first, so the next segment must be the container even when the
/// account segment has the same name.
///
/// ```
/// # use stow_container::logical_name_under_endpoint;
/// # use url::Url;
/// let endpoint = Url::parse("http://127.0.0.1:10000/photos").unwrap();
/// let name = logical_name_under_endpoint(
///     "http://127.0.0.1:10000/photos/photos/a.txt",
///     &endpoint,
///     "photos",
/// )?;
/// assert_eq!(name.as_str(), "a.txt");
/// # Ok::<(), stow_container::Error>(())
/// ```
pub fn logical_name_under_endpoint(
    blob_url: &str,
    endpoint: &Url,
    container: &str,
) -> Result<BlobName> {
    let url = parse_blob_url(blob_url)?;
    let segments = path_segments(&url);
    let base: Vec<&str> = path_segments(endpoint)
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect();

    let Some(rest) = segments.strip_prefix(base.as_slice()) else {
        return Err(Error::invalid_name(
            blob_url,
            format!("URL is not under endpoint '{endpoint}'"),
        ));
    };

    match rest.split_first() {
        Some((first, name)) if *first == container => decode_name(blob_url, name),
        _ => Err(not_in_container(blob_url, container)),
    }
}

fn parse_blob_url(blob_url: &str) -> Result<Url> {
    Url::parse(blob_url).map_err(|e| Error::invalid_name(blob_url, e.to_string()))
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.collect())
        .unwrap_or_default()
}

fn not_in_container(blob_url: &str, container: &str) -> Error {
    Error::invalid_name(
        blob_url,
        format!("URL does not address container '{container}'"),
    )
}

/// Percent-decode the name segments and join them into a blob name.
fn decode_name(blob_url: &str, segments: &[&str]) -> Result<BlobName> {
    let decoded = segments
        .iter()
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(|s| s.into_owned())
                .map_err(|e| Error::invalid_name(blob_url, e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    BlobName::new(decoded.join("/"))
}

/// Build the full URL of a blob: endpoint, then container, then each name segment.
pub(crate) fn blob_url(endpoint: &Url, container: &str, name: &str) -> Url {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push(container)
            .extend(name.split(DELIMITER));
    }
    url
}
