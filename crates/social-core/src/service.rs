//! UserService: owns the directory and the friend graph, and runs the commands.

use crate::cache::MaterializedCache;
use crate::config::ServiceConfig;
use crate::directory::UserDirectory;
use crate::graph::{FlushReport, FriendGraph};
use crate::now_ms;
use social_types::{
    AvatarStore, Notification, NotificationKind, Notifier, PersistenceStore, ServiceError,
    UserId, UserRecord,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The service behind one lock: commands and the sweep never interleave.
pub type SharedService = Arc<Mutex<UserService>>;

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: Vec<UserId>,
    pub users_saved: usize,
    pub relationships_written: usize,
    pub relationships_deleted: usize,
}

pub struct UserService {
    pub(crate) directory: UserDirectory,
    pub(crate) graph: FriendGraph,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) avatars: Arc<dyn AvatarStore>,
}

impl UserService {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        notifier: Arc<dyn Notifier>,
        avatars: Arc<dyn AvatarStore>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            directory: UserDirectory::new(
                store.clone(),
                config.inactivity_threshold,
                config.default_avatar_url.clone(),
            ),
            graph: FriendGraph::new(store),
            notifier,
            avatars,
        }
    }

    pub fn into_shared(self) -> SharedService {
        Arc::new(Mutex::new(self))
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn graph(&self) -> &FriendGraph {
        &self.graph
    }

    /// Entry point for every authenticated request: load or create the user,
    /// refresh its graph node, and tell cached friends when it comes online.
    pub async fn on_user_seen(&mut self, id: UserId) -> Result<UserRecord, ServiceError> {
        let seen = self.directory.touch(id).await?;
        self.graph.load_user(id).await?;
        if seen.came_online {
            tracing::debug!(user_id = id, "user came online");
            match serde_json::to_value(seen.record.to_public()) {
                Ok(data) => {
                    for friend in self.graph.friend_list(id) {
                        self.notify(friend, NotificationKind::FriendUpdateStatus, data.clone())
                            .await;
                    }
                }
                Err(e) => {
                    tracing::warn!(user_id = id, error = %e, "failed to encode status update");
                }
            }
        }
        Ok(seen.record)
    }

    /// Queue a notification if the target is cached; offline users get nothing.
    pub(crate) async fn notify(
        &self,
        target: UserId,
        kind: NotificationKind,
        data: serde_json::Value,
    ) {
        if !self.directory.is_cached(target) {
            return;
        }
        let notification = Notification::new(kind, data, now_ms());
        if let Err(e) = self.notifier.push(target, notification).await {
            tracing::warn!(user_id = target, kind = ?kind, error = %e, "failed to queue notification");
        }
    }

    pub async fn sweep(&mut self) -> Result<SweepReport, ServiceError> {
        self.sweep_at(now_ms()).await
    }

    /// Evict idle users together with their graph nodes, persist the
    /// remaining users, then flush the ledger.
    ///
    /// A node leaves the graph as soon as its user leaves the directory, so a
    /// later failure cannot strand it.
    pub async fn sweep_at(&mut self, now: i64) -> Result<SweepReport, ServiceError> {
        let mut evicted = Vec::new();
        for id in self.directory.idle_at(now) {
            self.directory.evict(id).await?;
            self.graph.invalidate(id);
            evicted.push(id);
        }
        let users_saved = self.directory.save_all().await?;
        let flushed = self.graph.save_all().await?;
        let report = SweepReport {
            evicted,
            users_saved,
            relationships_written: flushed.written,
            relationships_deleted: flushed.deleted,
        };
        tracing::info!(
            evicted = report.evicted.len(),
            nodes_loaded = self.graph.loaded_count(),
            users_saved = report.users_saved,
            relationships_written = report.relationships_written,
            relationships_deleted = report.relationships_deleted,
            "sweep complete"
        );
        Ok(report)
    }

    /// Persist cached users and the ledger without evicting anything.
    pub async fn flush(&mut self) -> Result<FlushReport, ServiceError> {
        self.directory.save_all().await?;
        Ok(self.graph.save_all().await?)
    }

    /// Final flush on process exit.
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        let report = self.flush().await?;
        tracing::info!(
            users = self.directory.cached_count(),
            relationships_written = report.written,
            relationships_deleted = report.deleted,
            "state flushed on shutdown"
        );
        Ok(())
    }
}
