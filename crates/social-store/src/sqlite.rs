//! SQLite-backed persistence store.

use async_trait::async_trait;
use social_types::{
    PairKey, PersistenceStore, RelationshipRecord, RelationshipStatus, StoreError, UserId,
    UserRecord,
};
use std::path::Path;

/// SQLite-backed store for users and relationships.
pub struct SqliteStore {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn =
            rusqlite::Connection::open(path).map_err(|e| StoreError::Other(e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER NOT NULL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                last_seen INTEGER NOT NULL,
                avatar_url TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS relationships (
                pair_key TEXT PRIMARY KEY,
                sender_id INTEGER NOT NULL,
                receiver_id INTEGER NOT NULL,
                status INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_relationships_sender ON relationships(sender_id);
            CREATE INDEX IF NOT EXISTS idx_relationships_receiver ON relationships(receiver_id);
            "#,
        )
        .map_err(|e| StoreError::Other(e.to_string()))?;

        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Other(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(|e| StoreError::Other(e.to_string()))
    }
}

fn parse_user_row(row: &rusqlite::Row) -> Result<UserRecord, rusqlite::Error> {
    Ok(UserRecord::new(
        row.get::<_, i64>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, i64>(2)?,
        row.get::<_, String>(3)?,
    ))
}

fn parse_relationship_row(row: &rusqlite::Row) -> Result<Option<RelationshipRecord>, rusqlite::Error> {
    let key: String = row.get(0)?;
    let status: i64 = row.get(3)?;
    let (Ok(key), Some(status)) = (key.parse::<PairKey>(), RelationshipStatus::from_code(status))
    else {
        tracing::warn!(pair_key = %key, status, "skipping malformed relationship row");
        return Ok(None);
    };
    Ok(Some(RelationshipRecord {
        key,
        sender: row.get(1)?,
        receiver: row.get(2)?,
        status,
    }))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl PersistenceStore for SqliteStore {
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, last_seen, avatar_url FROM users WHERE id = ?1")?;
            match stmt.query_row([id], parse_user_row) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }

    async fn get_user_by_name(&self, name: &str) -> Result<Option<UserRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, last_seen, avatar_url FROM users WHERE name = ?1")?;
            match stmt.query_row([name], parse_user_row) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }

    async fn has_user_by_name(&self, name: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT 1 FROM users WHERE name = ?1 LIMIT 1")?;
            stmt.exists([name])
        })
    }

    async fn save_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Other(format!("failed to acquire lock: {}", e)))?;
        let result = conn.execute(
            r#"
            INSERT INTO users (id, name, last_seen, avatar_url)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                last_seen = excluded.last_seen,
                avatar_url = excluded.avatar_url
            "#,
            rusqlite::params![user.id, user.name, user.last_seen, user.avatar_url],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::NameTaken(user.name.clone())),
            Err(e) => Err(StoreError::Other(e.to_string())),
        }
    }

    async fn remove_user(&self, id: UserId) -> Result<(), StoreError> {
        self.with_conn(|conn| conn.execute("DELETE FROM users WHERE id = ?1", [id]))?;
        Ok(())
    }

    async fn get_relationships_for_user(
        &self,
        id: UserId,
    ) -> Result<Vec<RelationshipRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT pair_key, sender_id, receiver_id, status
                FROM relationships
                WHERE sender_id = ?1 OR receiver_id = ?1
                ORDER BY pair_key
                "#,
            )?;
            let rows = stmt.query_map([id], parse_relationship_row)?;
            let mut out = Vec::new();
            for row in rows {
                if let Some(record) = row? {
                    out.push(record);
                }
            }
            Ok(out)
        })
    }

    async fn save_relationships(&self, records: &[RelationshipRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for record in records {
                let key = record.key.to_string();
                if record.status == RelationshipStatus::Refused {
                    tx.execute("DELETE FROM relationships WHERE pair_key = ?1", [&key])?;
                    continue;
                }
                tx.execute(
                    r#"
                    INSERT INTO relationships (pair_key, sender_id, receiver_id, status)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(pair_key) DO UPDATE SET
                        sender_id = excluded.sender_id,
                        receiver_id = excluded.receiver_id,
                        status = excluded.status
                    "#,
                    rusqlite::params![key, record.sender, record.receiver, record.status.code()],
                )?;
            }
            tx.commit()
        })
    }

    async fn remove_all_relationships_for_user(&self, id: UserId) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM relationships WHERE sender_id = ?1 OR receiver_id = ?1",
                [id],
            )
        })?;
        Ok(())
    }
}
