//! Container-level management: creation and anonymous access level.
//!
//! The data-plane store client has no notion of creating a container or
//! changing its public access, so those calls go through [`ContainerAdmin`].

mod memory;
mod shared_key;

use std::fmt;
use std::str::FromStr;

pub use memory::MemoryAdmin;
use serde::{Deserialize, Serialize};
pub use shared_key::SharedKeyAdmin;

use crate::{Error, Result};

/// Anonymous read access level of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicAccess {
    /// No anonymous access.
    Private,
    /// Anonymous callers can read a blob when they know its address, but
    /// cannot enumerate the container.
    Blob,
    /// Anonymous callers can read blobs and enumerate the container.
    Container,
}

impl PublicAccess {
    /// Value of the `x-ms-blob-public-access` header, `None` for private.
    pub fn header_value(self) -> Option<&'static str> {
        match self {
            Self::Private => None,
            Self::Blob => Some("blob"),
            Self::Container => Some("container"),
        }
    }

    /// Parse the `x-ms-blob-public-access` header; a missing header is private.
    pub fn from_header(value: Option<&str>) -> Result<Self> {
        match value {
            None | Some("") => Ok(Self::Private),
            Some(value) => value.parse(),
        }
    }
}

impl FromStr for PublicAccess {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "private" | "none" => Ok(Self::Private),
            "blob" => Ok(Self::Blob),
            "container" => Ok(Self::Container),
            other => Err(Error::invalid_config(format!(
                "unknown public access level '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PublicAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value().unwrap_or("private"))
    }
}

/// Management operations on the one container a facade is bound to.
#[async_trait::async_trait]
pub trait ContainerAdmin: Send + Sync + 'static {
    /// Short identifier used in logs (e.g. `"shared-key"`).
    fn id(&self) -> &str;

    /// Create the container with `access` if it does not exist.
    ///
    /// Returns `true` when this call created it.
    async fn create_if_not_exists(&self, access: PublicAccess) -> Result<bool>;

    /// Replace the container's anonymous access level.
    async fn set_public_access(&self, access: PublicAccess) -> Result<()>;

    /// Current access level, or `None` when the container does not exist.
    async fn public_access(&self) -> Result<Option<PublicAccess>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values() {
        assert_eq!(PublicAccess::Blob.header_value(), Some("blob"));
        assert_eq!(PublicAccess::Private.header_value(), None);
        assert_eq!(PublicAccess::from_header(None).unwrap(), PublicAccess::Private);
        assert_eq!(
            PublicAccess::from_header(Some("container")).unwrap(),
            PublicAccess::Container
        );
        assert!(PublicAccess::from_header(Some("everyone")).is_err());
    }
}
