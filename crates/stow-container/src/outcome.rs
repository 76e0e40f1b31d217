//! Structured results of container operations.
//!
//! Each outcome's `Display` is the short human-readable status line shown by
//! the CLI; callers branch on the variants, never on the text.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::BlobName;

/// Whether a write created a new blob or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// No blob existed under the name.
    Created,
    /// An existing blob was replaced.
    Overwritten,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uploaded {
    /// Normalized name the content was stored under.
    #[serde(serialize_with = "serialize_name")]
    pub name: BlobName,
    /// Number of bytes written.
    pub size: u64,
    /// Whether the blob was created or replaced.
    pub outcome: WriteOutcome,
}

impl fmt::Display for Uploaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.outcome {
            WriteOutcome::Created => "Uploaded",
            WriteOutcome::Overwritten => "Replaced",
        };
        write!(f, "{verb} {} ({} bytes).", self.name, self.size)
    }
}

/// Result of downloading a blob into a local folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// The blob was written to `path`.
    Downloaded { path: PathBuf, size: u64 },
    /// The blob does not exist; nothing was written.
    NotFound,
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloaded { path, size } => {
                write!(f, "Downloaded file to {} ({size} bytes).", path.display())
            }
            Self::NotFound => f.write_str("Blob does not exist; nothing downloaded."),
        }
    }
}

/// Result of renaming a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameOutcome {
    /// The blob was copied to the new name and the source deleted.
    Renamed,
    /// The source does not exist; nothing was copied.
    SourceMissing,
}

impl fmt::Display for RenameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed => f.write_str("Finished renaming the blob."),
            Self::SourceMissing => f.write_str("Source blob did not exist; nothing renamed."),
        }
    }
}

/// Result of deleting a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The blob existed and was deleted.
    Deleted,
    /// The blob did not exist.
    AlreadyAbsent,
}

impl DeleteOutcome {
    /// Whether the blob existed before the delete.
    #[inline]
    pub fn existed(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted => f.write_str("Blob existed; deleted."),
            Self::AlreadyAbsent => f.write_str("Blob did not exist."),
        }
    }
}

/// Result of making sure the container exists with blob-level public access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    /// The container was created.
    Created,
    /// The container already existed with blob-level access; nothing changed.
    AlreadyExisted,
    /// The container already existed and its access level was changed to blob.
    AccessUpdated,
}

impl fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("Container created with blob-level public access."),
            Self::AlreadyExisted => {
                f.write_str("Container exists with blob-level public access; nothing to do.")
            }
            Self::AccessUpdated => f.write_str("Container exists; blob-level public access set."),
        }
    }
}

fn serialize_name<S>(name: &BlobName, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(name.as_str())
}
