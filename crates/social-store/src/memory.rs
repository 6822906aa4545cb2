//! In-memory persistence store.

use social_types::{
    PairKey, PersistenceStore, Presence, RelationshipRecord, RelationshipStatus, StoreError,
    UserId, UserRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

type PairIndex = HashMap<UserId, HashSet<PairKey>>;

/// In-memory implementation of PersistenceStore.
/// Relationships are keyed by unordered pair and indexed by both participants.
pub struct InMemoryStore {
    /// user_id -> record (presence always stored as Offline).
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
    /// username -> user_id (uniqueness constraint).
    names: Arc<RwLock<HashMap<String, UserId>>>,
    /// pair -> record.
    relationships: Arc<RwLock<HashMap<PairKey, RelationshipRecord>>>,
    /// user_id -> pairs the user participates in.
    pair_index: Arc<RwLock<PairIndex>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            names: Arc::new(RwLock::new(HashMap::new())),
            relationships: Arc::new(RwLock::new(HashMap::new())),
            pair_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn relationship_count(&self) -> usize {
        self.relationships.read().await.len()
    }

    fn index_pair(index: &mut PairIndex, key: PairKey) {
        index.entry(key.low()).or_default().insert(key);
        index.entry(key.high()).or_default().insert(key);
    }

    fn unindex_pair(index: &mut PairIndex, key: PairKey) {
        for id in [key.low(), key.high()] {
            if let Some(set) = index.get_mut(&id) {
                set.remove(&key);
                if set.is_empty() {
                    index.remove(&id);
                }
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceStore for InMemoryStore {
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_name(&self, name: &str) -> Result<Option<UserRecord>, StoreError> {
        let id = match self.names.read().await.get(name) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn has_user_by_name(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.names.read().await.contains_key(name))
    }

    async fn save_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let mut names = self.names.write().await;
        if let Some(owner) = names.get(&user.name) {
            if *owner != user.id {
                return Err(StoreError::NameTaken(user.name.clone()));
            }
        }
        let mut stored = user.clone();
        stored.presence = Presence::Offline;
        if let Some(old) = users.insert(user.id, stored) {
            if old.name != user.name {
                names.remove(&old.name);
            }
        }
        names.insert(user.name.clone(), user.id);
        Ok(())
    }

    async fn remove_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(old) = users.remove(&id) {
            self.names.write().await.remove(&old.name);
        }
        Ok(())
    }

    async fn get_relationships_for_user(
        &self,
        id: UserId,
    ) -> Result<Vec<RelationshipRecord>, StoreError> {
        let relationships = self.relationships.read().await;
        let index = self.pair_index.read().await;
        let mut keys: Vec<PairKey> = index
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys
            .into_iter()
            .filter_map(|key| relationships.get(&key).cloned())
            .collect())
    }

    async fn save_relationships(&self, records: &[RelationshipRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut relationships = self.relationships.write().await;
        let mut index = self.pair_index.write().await;
        for record in records {
            if record.status == RelationshipStatus::Refused {
                if relationships.remove(&record.key).is_some() {
                    Self::unindex_pair(&mut index, record.key);
                }
                continue;
            }
            relationships.insert(record.key, record.clone());
            Self::index_pair(&mut index, record.key);
        }
        Ok(())
    }

    async fn remove_all_relationships_for_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut relationships = self.relationships.write().await;
        let mut index = self.pair_index.write().await;
        let keys: Vec<PairKey> = index
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for key in keys {
            relationships.remove(&key);
            Self::unindex_pair(&mut index, key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId, name: &str) -> UserRecord {
        UserRecord::new(id, name, 1_000, "/avatars/default.webp")
    }

    #[tokio::test]
    async fn save_user_enforces_unique_names() {
        let store = InMemoryStore::new();
        store.save_user(&user(1, "alice")).await.unwrap();
        let err = store.save_user(&user(2, "alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::NameTaken(ref n) if n == "alice"));

        // Renaming releases the old name.
        store.save_user(&user(1, "alicia")).await.unwrap();
        assert!(!store.has_user_by_name("alice").await.unwrap());
        store.save_user(&user(2, "alice")).await.unwrap();
        assert_eq!(store.get_user_by_name("alice").await.unwrap().unwrap().id, 2);
    }

    #[tokio::test]
    async fn presence_is_not_persisted() {
        let store = InMemoryStore::new();
        let mut u = user(1, "alice");
        u.presence = Presence::Online;
        store.save_user(&u).await.unwrap();
        let loaded = store.get_user_by_id(1).await.unwrap().unwrap();
        assert_eq!(loaded.presence, Presence::Offline);
    }

    #[tokio::test]
    async fn pair_upsert_overwrites_direction_and_refused_deletes() {
        let store = InMemoryStore::new();
        store
            .save_relationships(&[RelationshipRecord::new(1, 2, RelationshipStatus::Pending)])
            .await
            .unwrap();
        store
            .save_relationships(&[RelationshipRecord::new(2, 1, RelationshipStatus::Accepted)])
            .await
            .unwrap();
        let rows = store.get_relationships_for_user(1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sender, 2);
        assert_eq!(rows[0].status, RelationshipStatus::Accepted);

        store
            .save_relationships(&[RelationshipRecord::new(1, 2, RelationshipStatus::Refused)])
            .await
            .unwrap();
        assert!(store.get_relationships_for_user(1).await.unwrap().is_empty());
        assert!(store.get_relationships_for_user(2).await.unwrap().is_empty());
        assert_eq!(store.relationship_count().await, 0);
    }

    #[tokio::test]
    async fn remove_all_relationships_only_touches_the_user() {
        let store = InMemoryStore::new();
        store
            .save_relationships(&[
                RelationshipRecord::new(1, 2, RelationshipStatus::Accepted),
                RelationshipRecord::new(3, 1, RelationshipStatus::Pending),
                RelationshipRecord::new(2, 3, RelationshipStatus::Pending),
            ])
            .await
            .unwrap();
        store.remove_all_relationships_for_user(1).await.unwrap();
        assert!(store.get_relationships_for_user(1).await.unwrap().is_empty());
        let rows = store.get_relationships_for_user(3).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, PairKey::new(2, 3));
    }
}
