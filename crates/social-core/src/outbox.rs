//! In-memory per-user notification queues.

use async_trait::async_trait;
use social_types::{Notification, Notifier, NotifyError, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Notifier holding queued notifications until the user fetches them.
pub struct InMemoryNotifier {
    queues: Arc<RwLock<HashMap<UserId, Vec<Notification>>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn push(&self, user: UserId, notification: Notification) -> Result<(), NotifyError> {
        self.queues
            .write()
            .await
            .entry(user)
            .or_default()
            .push(notification);
        Ok(())
    }

    async fn fetch(&self, user: UserId) -> Result<Vec<Notification>, NotifyError> {
        Ok(self.queues.write().await.remove(&user).unwrap_or_default())
    }

    async fn has_pending(&self, user: UserId) -> Result<bool, NotifyError> {
        Ok(self
            .queues
            .read()
            .await
            .get(&user)
            .map(|q| !q.is_empty())
            .unwrap_or(false))
    }

    async fn clear(&self, user: UserId) -> Result<(), NotifyError> {
        self.queues.write().await.remove(&user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_types::NotificationKind;

    #[tokio::test]
    async fn fetch_drains_in_push_order() {
        let notifier = InMemoryNotifier::new();
        for at in [1, 2] {
            notifier
                .push(
                    7,
                    Notification::new(NotificationKind::FriendRequestReceived, serde_json::Value::Null, at),
                )
                .await
                .unwrap();
        }
        assert!(notifier.has_pending(7).await.unwrap());
        let got = notifier.fetch(7).await.unwrap();
        assert_eq!(got.iter().map(|n| n.at).collect::<Vec<_>>(), vec![1, 2]);
        assert!(!notifier.has_pending(7).await.unwrap());
        assert!(notifier.fetch(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_drops_the_queue() {
        let notifier = InMemoryNotifier::new();
        notifier
            .push(1, Notification::new(NotificationKind::FriendUpdateRemoved, serde_json::Value::Null, 0))
            .await
            .unwrap();
        notifier.clear(1).await.unwrap();
        assert!(!notifier.has_pending(1).await.unwrap());
    }
}
