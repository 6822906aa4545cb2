//! Social service REST API: profiles, friendships, notifications.

use social_api::config::ApiConfig;
use social_api::server::{self, AppState};
use social_core::{FsAvatarStore, InMemoryNotifier, UserService};
use social_scheduler::PeriodicSweeper;
use social_store::{InMemoryStore, PersistenceStore, StoreError};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env();
    let store = open_store(&config)?;
    let service = UserService::new(
        store,
        Arc::new(InMemoryNotifier::new()),
        Arc::new(FsAvatarStore::new(&config.service.avatar_dir)),
        &config.service,
    )
    .into_shared();

    let sweeper = PeriodicSweeper::spawn(Arc::clone(&service), config.sweep_interval);
    let app = server::router(Arc::new(AppState { service }));

    tracing::info!("social API listening on {}", config.listen);
    axum::serve(
        tokio::net::TcpListener::bind(config.listen).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.shutdown().await?;
    tracing::info!("social API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(feature = "sqlite")]
fn open_store(config: &ApiConfig) -> Result<Arc<dyn PersistenceStore>, StoreError> {
    match &config.db_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using SQLite store");
            Ok(Arc::new(social_store::SqliteStore::new(path)?))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_store(config: &ApiConfig) -> Result<Arc<dyn PersistenceStore>, StoreError> {
    if config.db_path.is_some() {
        tracing::warn!("SOCIAL_DB_PATH is set but the sqlite feature is disabled; using the in-memory store");
    }
    Ok(Arc::new(InMemoryStore::new()))
}
