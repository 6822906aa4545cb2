//! Background sweep: periodically persists state and evicts inactive users.

mod sweeper;

pub use sweeper::PeriodicSweeper;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("sweep task failed: {0}")]
    Join(String),
    #[error(transparent)]
    Service(#[from] social_types::ServiceError),
}
