#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for blob operations on a container.
///
/// Use this target for uploads, downloads, renames, deletes and listings.
pub const TRACING_TARGET_CONTAINER: &str = "stow_container::container";

/// Tracing target for container management calls.
///
/// Use this target for container creation and access-level changes.
pub const TRACING_TARGET_ADMIN: &str = "stow_container::admin";

pub mod admin;
mod config;
mod container;
mod error;
mod name;
mod outcome;

#[doc(hidden)]
pub mod prelude;

pub use config::ContainerConfig;
pub use container::{BlobContainer, BlobEntry};
pub use error::{Error, Result};
pub use name::{BlobName, logical_name_from_url, logical_name_under_endpoint, normalize_prefix};
pub use outcome::{
    DeleteOutcome, DownloadOutcome, EnsureOutcome, RenameOutcome, Uploaded, WriteOutcome,
};
