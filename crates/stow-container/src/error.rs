//! Error types for container operations.

/// Result type for all container operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for container operations.
///
/// Store failures are passed through unchanged (with their source chain), so
/// callers see exactly what the underlying client reported.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or malformed configuration (credentials, container name, endpoint).
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A blob name that cannot be used for the requested operation.
    #[error("Invalid blob name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The blob does not exist.
    #[error("Blob '{name}' not found")]
    NotFound {
        name: String,
        #[source]
        source: object_store::Error,
    },

    /// The blob cannot be held in a single in-memory buffer.
    #[error("Blob '{name}' is too large to buffer in memory ({size} bytes)")]
    TooLarge { name: String, size: u64 },

    /// Any other object store failure.
    #[error("Object store error: {0}")]
    Store(#[from] object_store::Error),

    /// Local filesystem or stream I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure on a container management call.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A container management request could not be signed.
    #[error("Request signing failed: {reason}")]
    Signing { reason: String },

    /// The storage service rejected a container management call.
    #[error("Storage service returned {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// The copy step of a rename succeeded but deleting the source failed.
    ///
    /// Both blobs exist. Deleting `from` again completes the rename.
    #[error("Rename of '{from}' to '{to}' copied the blob but left the source in place: {source}")]
    RenameIncomplete {
        from: String,
        to: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid blob name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the blob (or container) does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Store(object_store::Error::NotFound { .. }) => true,
            Self::Service { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Attach the blob name to a store error, promoting not-found errors.
    pub(crate) fn from_store(name: &str, err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => Self::NotFound {
                name: name.to_owned(),
                source: err,
            },
            other => Self::Store(other),
        }
    }
}
