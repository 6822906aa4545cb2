use async_trait::async_trait;
use social_types::{StoreError, UserId};

/// A per-user view materialized from the persistence store.
///
/// Implemented by the user directory and the friend graph. The periodic sweep
/// invalidates entries through this trait.
#[async_trait]
pub trait MaterializedCache: Send {
    type Entry: Send;

    /// Materialize the entry for `id` if the store knows it, returning a copy.
    async fn load(&mut self, id: UserId) -> Result<Option<Self::Entry>, StoreError>;

    /// A copy of the cached entry, without touching the store.
    fn get(&self, id: UserId) -> Option<Self::Entry>;

    /// Drop the cached entry. Returns whether one was present.
    fn invalidate(&mut self, id: UserId) -> bool;
}
