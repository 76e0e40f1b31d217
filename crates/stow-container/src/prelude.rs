//! Convenience re-exports.

pub use crate::admin::{ContainerAdmin, MemoryAdmin, PublicAccess, SharedKeyAdmin};
pub use crate::config::ContainerConfig;
pub use crate::container::{BlobContainer, BlobEntry};
pub use crate::error::{Error, Result};
pub use crate::name::BlobName;
pub use crate::outcome::{
    DeleteOutcome, DownloadOutcome, EnsureOutcome, RenameOutcome, Uploaded, WriteOutcome,
};
