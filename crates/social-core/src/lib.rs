//! Social core: user directory, friend graph cache with its request ledger, and
//! the friendship commands that tie them together.

mod avatar;
mod cache;
mod config;
mod directory;
mod friends;
mod graph;
mod ledger;
mod outbox;
mod profile;
mod service;
pub mod username;

pub use avatar::FsAvatarStore;
pub use cache::MaterializedCache;
pub use config::{env_parse, ServiceConfig};
pub use directory::{RenameOutcome, Seen, UserDirectory};
pub use graph::{FlushReport, FriendGraph};
pub use ledger::RequestLedger;
pub use outbox::InMemoryNotifier;
pub use service::{SharedService, SweepReport, UserService};
pub use social_types::ServiceError;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
