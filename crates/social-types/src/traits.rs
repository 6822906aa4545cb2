//! Traits for the collaborators the service consumes: persistence, notification, avatars.

use crate::{Notification, RelationshipRecord, UserId, UserRecord};
use async_trait::async_trait;

/// Durable users table plus the unordered-pair relationships table.
///
/// Implementations must offer read-your-writes within one process and enforce
/// username uniqueness on `save_user`.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn get_user_by_name(&self, name: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn has_user_by_name(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.get_user_by_name(name).await?.is_some())
    }

    /// Insert or update by id. Returns `StoreError::NameTaken` when another id owns the name.
    async fn save_user(&self, user: &UserRecord) -> Result<(), StoreError>;

    async fn remove_user(&self, id: UserId) -> Result<(), StoreError>;

    /// Every stored relationship where `id` is sender or receiver.
    async fn get_relationships_for_user(
        &self,
        id: UserId,
    ) -> Result<Vec<RelationshipRecord>, StoreError>;

    /// Batch upsert keyed by pair. `Refused` records delete their row in the same batch.
    async fn save_relationships(&self, records: &[RelationshipRecord]) -> Result<(), StoreError>;

    async fn remove_all_relationships_for_user(&self, id: UserId) -> Result<(), StoreError>;
}

/// Per-user outbox for transient events. Best effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn push(&self, user: UserId, notification: Notification) -> Result<(), NotifyError>;

    /// Drain and return everything queued for `user`.
    async fn fetch(&self, user: UserId) -> Result<Vec<Notification>, NotifyError>;

    async fn has_pending(&self, user: UserId) -> Result<bool, NotifyError>;

    async fn clear(&self, user: UserId) -> Result<(), NotifyError>;
}

/// Name-keyed avatar assets. Callers never wait on the outcome.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), AvatarError>;

    async fn remove(&self, name: &str) -> Result<(), AvatarError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username already taken: {0}")]
    NameTaken(String),
    #[error("store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifier error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("avatar error: {0}")]
    Other(String),
}

/// The only error a command returns; everything else is a `CommandResult`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
}
