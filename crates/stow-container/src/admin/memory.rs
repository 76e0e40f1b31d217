//! In-process container admin for tests and dry runs.

use tokio::sync::Mutex;

use super::{ContainerAdmin, PublicAccess};
use crate::Result;

/// [`ContainerAdmin`] that keeps the container's state in memory.
#[derive(Debug, Default)]
pub struct MemoryAdmin {
    state: Mutex<Option<PublicAccess>>,
}

impl MemoryAdmin {
    /// An admin whose container does not exist yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// An admin whose container already exists with `access`.
    pub fn existing(access: PublicAccess) -> Self {
        Self {
            state: Mutex::new(Some(access)),
        }
    }
}

#[async_trait::async_trait]
impl ContainerAdmin for MemoryAdmin {
    fn id(&self) -> &str {
        "memory"
    }

    async fn create_if_not_exists(&self, access: PublicAccess) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Ok(false);
        }
        *state = Some(access);
        Ok(true)
    }

    async fn set_public_access(&self, access: PublicAccess) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.as_mut() {
            Some(current) => {
                *current = access;
                Ok(())
            }
            None => Err(crate::Error::Service {
                status: 404,
                code: "ContainerNotFound".to_owned(),
                message: "The specified container does not exist.".to_owned(),
            }),
        }
    }

    async fn public_access(&self) -> Result<Option<PublicAccess>> {
        Ok(*self.state.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_is_idempotent() {
        let admin = MemoryAdmin::new();
        assert!(admin.create_if_not_exists(PublicAccess::Blob).await.unwrap());
        assert!(!admin.create_if_not_exists(PublicAccess::Private).await.unwrap());
        assert_eq!(admin.public_access().await.unwrap(), Some(PublicAccess::Blob));
    }

    #[tokio::test]
    async fn set_access_on_missing_container_fails() {
        let admin = MemoryAdmin::new();
        let err = admin
            .set_public_access(PublicAccess::Blob)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn set_access_replaces_level() {
        let admin = MemoryAdmin::existing(PublicAccess::Private);
        admin.set_public_access(PublicAccess::Blob).await.unwrap();
        assert_eq!(admin.public_access().await.unwrap(), Some(PublicAccess::Blob));
    }
}
