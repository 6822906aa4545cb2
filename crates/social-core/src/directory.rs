//! UserDirectory: cached user records with write-through persistence.

use crate::cache::MaterializedCache;
use crate::{now_ms, username};
use async_trait::async_trait;
use social_types::{PersistenceStore, Presence, PublicProfile, StoreError, UserId, UserRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const GENERATED_NAME_ATTEMPTS: usize = 3;

/// Result of registering activity for a user.
#[derive(Debug, Clone)]
pub struct Seen {
    pub record: UserRecord,
    /// The user was offline (or unknown) before this call.
    pub came_online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { previous: String },
    Taken,
    UnknownUser,
}

/// Cache of user records keyed by id, with a name index.
///
/// Every mutation is written to the store before the cache changes, so a
/// store failure leaves the cache as it was.
pub struct UserDirectory {
    store: Arc<dyn PersistenceStore>,
    users: HashMap<UserId, UserRecord>,
    name_to_id: HashMap<String, UserId>,
    inactivity_threshold_ms: i64,
    default_avatar_url: String,
}

impl UserDirectory {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        inactivity_threshold: Duration,
        default_avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            users: HashMap::new(),
            name_to_id: HashMap::new(),
            inactivity_threshold_ms: i64::try_from(inactivity_threshold.as_millis())
                .unwrap_or(i64::MAX),
            default_avatar_url: default_avatar_url.into(),
        }
    }

    fn add_to_cache(&mut self, user: UserRecord) {
        if let Some(old) = self.users.get(&user.id) {
            if old.name != user.name {
                self.name_to_id.remove(&old.name);
            }
        }
        self.name_to_id.insert(user.name.clone(), user.id);
        self.users.insert(user.id, user);
    }

    fn remove_from_cache(&mut self, id: UserId) -> Option<UserRecord> {
        let user = self.users.remove(&id)?;
        if self.name_to_id.get(&user.name) == Some(&id) {
            self.name_to_id.remove(&user.name);
        }
        Some(user)
    }

    pub fn get(&self, id: UserId) -> Option<&UserRecord> {
        self.users.get(&id)
    }

    pub fn is_cached(&self, id: UserId) -> bool {
        self.users.contains_key(&id)
    }

    pub fn cached_count(&self) -> usize {
        self.users.len()
    }

    /// Ensure `id` is cached, loading it from the store. Returns false if unknown.
    async fn ensure_loaded(&mut self, id: UserId) -> Result<bool, StoreError> {
        if self.users.contains_key(&id) {
            return Ok(true);
        }
        match self.store.get_user_by_id(id).await? {
            Some(user) => {
                self.add_to_cache(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether the user exists, without caching it.
    pub async fn exists(&self, id: UserId) -> Result<bool, StoreError> {
        if self.users.contains_key(&id) {
            return Ok(true);
        }
        Ok(self.store.get_user_by_id(id).await?.is_some())
    }

    pub async fn get_or_load(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        if self.ensure_loaded(id).await? {
            Ok(self.users.get(&id).cloned())
        } else {
            Ok(None)
        }
    }

    /// Resolve a username to an id, consulting the cache first.
    pub async fn resolve(&mut self, name: &str) -> Result<Option<UserId>, StoreError> {
        if let Some(id) = self.name_to_id.get(name) {
            return Ok(Some(*id));
        }
        let Some(user) = self.store.get_user_by_name(name).await? else {
            return Ok(None);
        };
        let id = user.id;
        if let Some(cached) = self.users.get(&id) {
            // The cached record is newer than the stored one.
            return Ok((cached.name == name).then_some(id));
        }
        self.add_to_cache(user);
        Ok(Some(id))
    }

    pub async fn username_exists(&self, name: &str) -> Result<bool, StoreError> {
        if self.name_to_id.contains_key(name) {
            return Ok(true);
        }
        self.store.has_user_by_name(name).await
    }

    /// Create and persist a new user. A missing name is generated, a missing
    /// avatar falls back to the default one.
    pub async fn create(
        &mut self,
        id: UserId,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<UserRecord, StoreError> {
        let now = now_ms();
        let avatar_url = avatar_url.unwrap_or_else(|| self.default_avatar_url.clone());
        let user = match name {
            Some(name) => {
                let user = UserRecord::new(id, name, now, avatar_url);
                self.store.save_user(&user).await?;
                user
            }
            None => self.create_with_generated_name(id, now, avatar_url).await?,
        };
        tracing::info!(user_id = id, username = %user.name, "user created");
        self.add_to_cache(user.clone());
        Ok(user)
    }

    async fn create_with_generated_name(
        &self,
        id: UserId,
        now: i64,
        avatar_url: String,
    ) -> Result<UserRecord, StoreError> {
        let mut attempt = 1;
        loop {
            let user = UserRecord::new(id, username::generate(now), now, avatar_url.clone());
            match self.store.save_user(&user).await {
                Ok(()) => return Ok(user),
                Err(StoreError::NameTaken(name)) if attempt < GENERATED_NAME_ATTEMPTS => {
                    tracing::debug!(user_id = id, username = %name, "generated name collided, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Register activity: load or create the user, mark it online and bump `last_seen`.
    pub async fn touch(&mut self, id: UserId) -> Result<Seen, StoreError> {
        self.touch_at(id, now_ms()).await
    }

    pub async fn touch_at(&mut self, id: UserId, now: i64) -> Result<Seen, StoreError> {
        if !self.ensure_loaded(id).await? {
            self.create(id, None, None).await?;
        }
        let Some(user) = self.users.get_mut(&id) else {
            return Err(StoreError::Other(format!("user {id} missing after load")));
        };
        let came_online = user.presence == Presence::Offline;
        user.presence = Presence::Online;
        user.last_seen = now;
        Ok(Seen {
            record: user.clone(),
            came_online,
        })
    }

    /// Change a username. The store enforces uniqueness; on conflict the
    /// cached record is left untouched.
    pub async fn rename(&mut self, id: UserId, new_name: &str) -> Result<RenameOutcome, StoreError> {
        if self.username_exists(new_name).await? {
            return Ok(RenameOutcome::Taken);
        }
        let Some(mut user) = self.get_or_load(id).await? else {
            return Ok(RenameOutcome::UnknownUser);
        };
        let previous = std::mem::replace(&mut user.name, new_name.to_string());
        match self.store.save_user(&user).await {
            Ok(()) => {}
            Err(StoreError::NameTaken(_)) => return Ok(RenameOutcome::Taken),
            Err(e) => return Err(e),
        }
        tracing::info!(user_id = id, from = %previous, to = %new_name, "username changed");
        self.add_to_cache(user);
        Ok(RenameOutcome::Renamed { previous })
    }

    pub async fn save(&self, id: UserId) -> Result<bool, StoreError> {
        match self.users.get(&id) {
            Some(user) => {
                self.store.save_user(user).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Persist every cached record. Returns how many were written.
    pub async fn save_all(&self) -> Result<usize, StoreError> {
        let mut ids: Vec<UserId> = self.users.keys().copied().collect();
        ids.sort_unstable();
        for id in &ids {
            self.save(*id).await?;
        }
        Ok(ids.len())
    }

    /// Delete the user from the store and the cache.
    pub async fn remove(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.store.remove_user(id).await?;
        Ok(self.remove_from_cache(id))
    }

    pub async fn sweep_inactive(&mut self) -> Result<Vec<UserId>, StoreError> {
        self.sweep_inactive_at(now_ms()).await
    }

    /// Cached users idle past the threshold at `now`, in ascending order.
    pub fn idle_at(&self, now: i64) -> Vec<UserId> {
        let cutoff = now.saturating_sub(self.inactivity_threshold_ms);
        let mut idle: Vec<UserId> = self
            .users
            .values()
            .filter(|u| u.last_seen < cutoff)
            .map(|u| u.id)
            .collect();
        idle.sort_unstable();
        idle
    }

    /// Persist the user as offline, then drop it from the cache. On a store
    /// error the cached record is left as it was.
    pub async fn evict(&mut self, id: UserId) -> Result<bool, StoreError> {
        let Some(user) = self.users.get(&id) else {
            return Ok(false);
        };
        let mut offline = user.clone();
        offline.presence = Presence::Offline;
        self.store.save_user(&offline).await?;
        self.remove_from_cache(id);
        Ok(true)
    }

    /// Mark users idle past the threshold offline, persist and evict them.
    /// Returns the evicted ids in ascending order.
    pub async fn sweep_inactive_at(&mut self, now: i64) -> Result<Vec<UserId>, StoreError> {
        let idle = self.idle_at(now);
        for id in &idle {
            self.evict(*id).await?;
        }
        if !idle.is_empty() {
            tracing::debug!(count = idle.len(), "evicted inactive users");
        }
        Ok(idle)
    }

    pub async fn public_profile(&mut self, id: UserId) -> Result<Option<PublicProfile>, StoreError> {
        Ok(self.get_or_load(id).await?.map(|u| u.to_public()))
    }

    /// Profiles for `ids`, skipping ids the store does not know.
    pub async fn public_profiles(&mut self, ids: &[UserId]) -> Result<Vec<PublicProfile>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(profile) = self.public_profile(*id).await? {
                out.push(profile);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl MaterializedCache for UserDirectory {
    type Entry = UserRecord;

    async fn load(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.get_or_load(id).await
    }

    fn get(&self, id: UserId) -> Option<UserRecord> {
        self.users.get(&id).cloned()
    }

    fn invalidate(&mut self, id: UserId) -> bool {
        self.remove_from_cache(id).is_some()
    }
}
