//! User identity records and their public projection.

use serde::{Deserialize, Serialize};

/// Numeric user id, issued by the authentication service.
pub type UserId = i64;

/// Whether the user has been seen since the record was last loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Offline,
    Online,
}

/// Cached identity record owned by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub last_seen: i64,
    pub avatar_url: String,
    /// Not persisted; records read from the store come back `Offline`.
    #[serde(default)]
    pub presence: Presence,
}

impl UserRecord {
    pub fn new(id: UserId, name: impl Into<String>, last_seen: i64, avatar_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            last_seen,
            avatar_url: avatar_url.into(),
            presence: Presence::Offline,
        }
    }

    pub fn to_public(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            username: self.name.clone(),
            last_seen: self.last_seen,
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Profile data other users may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    pub last_seen: i64,
    pub avatar_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_profile_uses_camel_case() {
        let user = UserRecord::new(7, "BlueFox_x", 1_700_000_000_000, "/a.webp");
        let json = serde_json::to_value(user.to_public()).unwrap();
        assert_eq!(json["username"], "BlueFox_x");
        assert_eq!(json["lastSeen"], 1_700_000_000_000i64);
        assert_eq!(json["avatarUrl"], "/a.webp");
    }
}
