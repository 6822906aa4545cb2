//! Events queued for a user's outbox.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "FRIENDREQUEST_RECEIVED")]
    FriendRequestReceived,
    #[serde(rename = "FRIENDREQUEST_ACCEPTED")]
    FriendRequestAccepted,
    #[serde(rename = "FRIENDREQUEST_REFUSED")]
    FriendRequestRefused,
    #[serde(rename = "FRIENDREQUEST_CANCELED")]
    FriendRequestCanceled,
    #[serde(rename = "FRIEND_UPDATE_USERNAME")]
    FriendUpdateUsername,
    #[serde(rename = "FRIEND_UPDATE_STATUS")]
    FriendUpdateStatus,
    #[serde(rename = "FRIEND_UPDATE_REMOVED")]
    FriendUpdateRemoved,
}

/// One transient event. Offline users never get these; they see current state on next load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    /// Milliseconds since the Unix epoch.
    pub at: i64,
}

impl Notification {
    pub fn new(kind: NotificationKind, data: serde_json::Value, at: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            data,
            at,
        }
    }
}
