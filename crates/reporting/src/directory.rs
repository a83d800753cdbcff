//! User directory collaborator.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

/// Source of the registered-user count shown on the dashboard.
///
/// Users are owned by an external identity service; reporting only needs
/// to know how many there are.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_count(&self) -> Result<u64>;
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for Arc<T> {
    async fn user_count(&self) -> Result<u64> {
        (**self).user_count().await
    }
}

/// Directory with a fixed user count, for deployments without an identity
/// service and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticUserDirectory {
    users: u64,
}

impl StaticUserDirectory {
    pub fn new(users: u64) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn user_count(&self) -> Result<u64> {
        Ok(self.users)
    }
}
