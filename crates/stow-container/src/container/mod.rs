//! Single-container blob facade backed by [`object_store::ObjectStore`].
//!
//! [`BlobContainer`] is a thin, cloneable handle bound to one container. It
//! normalizes blob names, delegates every data call to the store and turns
//! the results into structured outcomes. Container creation and access level
//! go through a [`ContainerAdmin`].

mod download;
mod listing;
mod upload;

use std::fmt;
use std::sync::Arc;

pub use listing::BlobEntry;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::memory::InMemory;
use object_store::{ObjectMeta, ObjectStore};
use url::Url;

use crate::admin::{ContainerAdmin, MemoryAdmin, PublicAccess, SharedKeyAdmin};
use crate::name::{blob_url, logical_name_under_endpoint};
use crate::{
    BlobName, ContainerConfig, DeleteOutcome, EnsureOutcome, Error, RenameOutcome, Result,
    TRACING_TARGET_CONTAINER,
};

/// Cloneable handle to one blob container.
///
/// All methods accept blob names as strings and normalize them with
/// [`BlobName::new`]. Store errors propagate unchanged apart from not-found
/// errors, which carry the blob name.
#[derive(Clone)]
pub struct BlobContainer {
    store: Arc<dyn ObjectStore>,
    admin: Arc<dyn ContainerAdmin>,
    container: String,
    endpoint: Url,
}

impl BlobContainer {
    /// Connect to the Azure container described by `config`.
    ///
    /// No request is made; the credentials are only validated locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for malformed credentials, container
    /// names or endpoints.
    pub fn connect(config: ContainerConfig) -> Result<Self> {
        config.validate()?;

        let endpoint_str = config.endpoint_url();
        let endpoint = Url::parse(&endpoint_str).map_err(|e| {
            Error::invalid_config(format!("invalid endpoint '{endpoint_str}': {e}"))
        })?;

        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&config.account_name)
            .with_access_key(&config.account_key)
            .with_container_name(&config.container_name);

        if let Some(custom) = &config.endpoint {
            builder = builder.with_endpoint(custom.clone());
            if endpoint.scheme() == "http" {
                builder = builder.with_allow_http(true);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::invalid_config(e.to_string()))?;
        let admin = SharedKeyAdmin::new(&config)?;

        tracing::info!(
            target: TRACING_TARGET_CONTAINER,
            account = %config.account_name,
            container = %config.container_name,
            endpoint = %endpoint,
            "Connected blob container"
        );

        Ok(Self::from_parts(
            Arc::new(store),
            Arc::new(admin),
            config.container_name,
            endpoint,
        ))
    }

    /// Wrap a concrete store and admin bound to `container`.
    pub fn new(
        store: impl ObjectStore,
        admin: impl ContainerAdmin,
        container: impl Into<String>,
        endpoint: Url,
    ) -> Self {
        Self::from_parts(Arc::new(store), Arc::new(admin), container, endpoint)
    }

    /// Wrap shared store and admin handles bound to `container`.
    pub fn from_parts(
        store: Arc<dyn ObjectStore>,
        admin: Arc<dyn ContainerAdmin>,
        container: impl Into<String>,
        endpoint: Url,
    ) -> Self {
        Self {
            store,
            admin,
            container: container.into(),
            endpoint,
        }
    }

    /// A container held entirely in process memory, not yet created.
    pub fn in_memory(container: impl Into<String>) -> Self {
        let endpoint = Url::parse("memory:///").expect("static URL is valid");
        Self::new(InMemory::new(), MemoryAdmin::new(), container, endpoint)
    }

    /// Name of the container this handle is bound to.
    #[inline]
    pub fn container_name(&self) -> &str {
        &self.container
    }

    /// Blob service endpoint (without the container).
    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The underlying object store.
    #[inline]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Full URL of the blob `name`.
    pub fn blob_url(&self, name: &str) -> Result<Url> {
        let name = BlobName::new(name)?;
        Ok(blob_url(&self.endpoint, &self.container, name.as_str()))
    }

    /// Blob name addressed by a full blob URL under this container's endpoint.
    pub fn logical_name(&self, blob_url: &str) -> Result<BlobName> {
        logical_name_under_endpoint(blob_url, &self.endpoint, &self.container)
    }

    /// Create the container if needed and give it blob-level public access:
    /// anonymous callers can read a blob by address but cannot enumerate
    /// the container.
    ///
    /// A container that already has blob-level access is left untouched.
    #[tracing::instrument(name = "blob.ensure_accessible", skip(self), fields(container = %self.container))]
    pub async fn ensure_accessible(&self) -> Result<EnsureOutcome> {
        let created = self.admin.create_if_not_exists(PublicAccess::Blob).await?;
        if created {
            tracing::info!(
                target: TRACING_TARGET_CONTAINER,
                container = %self.container,
                admin = self.admin.id(),
                "Created container"
            );
            return Ok(EnsureOutcome::Created);
        }

        // Setting the access level also replaces the stored access policies,
        // so it is only sent when the level actually differs.
        let current = self.admin.public_access().await?;
        if current == Some(PublicAccess::Blob) {
            tracing::debug!(
                target: TRACING_TARGET_CONTAINER,
                container = %self.container,
                "Container exists with blob-level public access"
            );
            return Ok(EnsureOutcome::AlreadyExisted);
        }

        self.admin.set_public_access(PublicAccess::Blob).await?;
        tracing::info!(
            target: TRACING_TARGET_CONTAINER,
            container = %self.container,
            previous = ?current,
            "Applied blob-level public access"
        );
        Ok(EnsureOutcome::AccessUpdated)
    }

    /// Current anonymous access level, `None` when the container is missing.
    pub async fn public_access(&self) -> Result<Option<PublicAccess>> {
        self.admin.public_access().await
    }

    /// Whether the blob `name` exists.
    #[tracing::instrument(name = "blob.exists", skip(self))]
    pub async fn exists(&self, name: &str) -> Result<bool> {
        let name = BlobName::new(name)?;
        Ok(self.probe(&name).await?.is_some())
    }

    /// Rename a blob by copying it server-side and deleting the source.
    ///
    /// The two steps are not atomic. A missing source is a no-op and the
    /// destination is never created. If the copy succeeds but the delete
    /// fails, [`Error::RenameIncomplete`] is returned: both blobs exist and
    /// calling [`delete_blob`](Self::delete_blob) on the source completes
    /// the rename.
    ///
    /// The store issues a plain server-side copy and does not wait on the
    /// copy status. Copies within one storage account normally finish before
    /// the call returns, but the service may accept a copy as pending; the
    /// source is then deleted while the copy is still in flight.
    #[tracing::instrument(name = "blob.rename", skip(self))]
    pub async fn rename_blob(&self, from: &str, to: &str) -> Result<RenameOutcome> {
        let from = BlobName::new(from)?;
        let to = BlobName::new(to)?;

        if self.probe(&from).await?.is_none() {
            tracing::debug!(
                target: TRACING_TARGET_CONTAINER,
                from = %from,
                "Rename source does not exist"
            );
            return Ok(RenameOutcome::SourceMissing);
        }

        if from == to {
            return Ok(RenameOutcome::Renamed);
        }

        self.store
            .copy(from.as_path(), to.as_path())
            .await
            .map_err(|e| Error::from_store(from.as_str(), e))?;

        if let Err(err) = self.store.delete(from.as_path()).await {
            tracing::warn!(
                target: TRACING_TARGET_CONTAINER,
                from = %from,
                to = %to,
                error = %err,
                "Copied blob but failed to delete the source"
            );
            return Err(Error::RenameIncomplete {
                from: from.into(),
                to: to.into(),
                source: Box::new(Error::Store(err)),
            });
        }

        tracing::debug!(target: TRACING_TARGET_CONTAINER, from = %from, to = %to, "Renamed blob");
        Ok(RenameOutcome::Renamed)
    }

    /// Delete a blob if it exists. Never fails because the blob is absent.
    #[tracing::instrument(name = "blob.delete", skip(self))]
    pub async fn delete_blob(&self, name: &str) -> Result<DeleteOutcome> {
        let name = BlobName::new(name)?;

        if self.probe(&name).await?.is_none() {
            return Ok(DeleteOutcome::AlreadyAbsent);
        }

        match self.store.delete(name.as_path()).await {
            Ok(()) => {
                tracing::debug!(target: TRACING_TARGET_CONTAINER, name = %name, "Deleted blob");
                Ok(DeleteOutcome::Deleted)
            }
            Err(object_store::Error::NotFound { .. }) => Ok(DeleteOutcome::AlreadyAbsent),
            Err(err) => Err(Error::Store(err)),
        }
    }

    /// Metadata for `name`, `None` when the blob does not exist.
    async fn probe(&self, name: &BlobName) -> Result<Option<ObjectMeta>> {
        match self.store.head(name.as_path()).await {
            Ok(meta) => Ok(Some(meta)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(err) => Err(Error::Store(err)),
        }
    }
}

impl fmt::Debug for BlobContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobContainer")
            .field("container", &self.container)
            .field("endpoint", &self.endpoint.as_str())
            .field("store", &self.store.to_string())
            .field("admin", &self.admin.id())
            .finish()
    }
}
