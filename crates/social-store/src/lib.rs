//! Persistence store implementations: in-memory, and SQLite behind the `sqlite` feature.

mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryStore;
pub use social_types::{PersistenceStore, StoreError};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
