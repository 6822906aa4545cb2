//! Periodic sweeper: one task, ticking on a fixed interval, locking the service per sweep.

use crate::SchedulerError;
use social_core::{SharedService, SweepReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `UserService::sweep` every interval until shut down.
pub struct PeriodicSweeper {
    service: SharedService,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicSweeper {
    /// Spawn the sweep task. The first sweep happens one full interval after spawn.
    pub fn spawn(service: SharedService, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let task_service = Arc::clone(&service);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let mut service = task_service.lock().await;
                        if let Err(e) = service.sweep().await {
                            tracing::error!(error = %e, "sweep failed");
                        }
                    }
                }
            }
            tracing::debug!("sweeper stopped");
        });
        tracing::info!(interval_secs = interval.as_secs_f64(), "sweeper started");
        Self {
            service,
            stop,
            handle,
        }
    }

    /// Run one sweep immediately, outside the schedule.
    pub async fn sweep_now(&self) -> Result<SweepReport, SchedulerError> {
        Ok(self.service.lock().await.sweep().await?)
    }

    /// Stop the loop, wait for an in-flight sweep, then flush everything once more.
    pub async fn shutdown(self) -> Result<(), SchedulerError> {
        let Self {
            service,
            stop,
            handle,
        } = self;
        // The task may already be gone; the join below reports why.
        let _ = stop.send(());
        handle
            .await
            .map_err(|e| SchedulerError::Join(e.to_string()))?;
        service.lock().await.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_core::{FsAvatarStore, InMemoryNotifier, ServiceConfig, UserService};
    use social_store::InMemoryStore;
    use social_types::PersistenceStore;

    fn shared(store: Arc<InMemoryStore>, inactivity: Duration) -> SharedService {
        let config = ServiceConfig {
            inactivity_threshold: inactivity,
            ..ServiceConfig::default()
        };
        UserService::new(
            store,
            Arc::new(InMemoryNotifier::new()),
            Arc::new(FsAvatarStore::new(std::env::temp_dir().join("social-sweeper-avatars"))),
            &config,
        )
        .into_shared()
    }

    #[tokio::test]
    async fn ticks_evict_idle_users() {
        let store = Arc::new(InMemoryStore::new());
        let service = shared(store.clone(), Duration::ZERO);
        service.lock().await.on_user_seen(1).await.unwrap();

        let sweeper = PeriodicSweeper::spawn(service.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!service.lock().await.directory().is_cached(1));
        assert!(store.get_user_by_id(1).await.unwrap().is_some());
        sweeper.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_flushes_the_ledger() {
        let store = Arc::new(InMemoryStore::new());
        let service = shared(store.clone(), Duration::from_secs(300));
        {
            let mut svc = service.lock().await;
            svc.on_user_seen(1).await.unwrap();
            svc.on_user_seen(2).await.unwrap();
            svc.request_friend(1, 2).await.unwrap();
        }

        let sweeper = PeriodicSweeper::spawn(service.clone(), Duration::from_secs(3600));
        assert_eq!(store.relationship_count().await, 0);
        sweeper.shutdown().await.unwrap();

        assert_eq!(store.relationship_count().await, 1);
        assert!(service.lock().await.graph().ledger().is_empty());
    }

    #[tokio::test]
    async fn sweep_now_reports_counts() {
        let store = Arc::new(InMemoryStore::new());
        let service = shared(store.clone(), Duration::from_secs(300));
        service.lock().await.on_user_seen(7).await.unwrap();

        let sweeper = PeriodicSweeper::spawn(service, Duration::from_secs(3600));
        let report = sweeper.sweep_now().await.unwrap();
        assert!(report.evicted.is_empty());
        assert_eq!(report.users_saved, 1);
        sweeper.shutdown().await.unwrap();
    }
}
