//! Relationship records keyed by unordered user pairs, and the per-user adjacency node.

use crate::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Canonical key for the relationship between two users, independent of direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> UserId {
        self.low
    }

    pub fn high(&self) -> UserId {
        self.high
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.low == id || self.high == id
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid pair key: {0}")]
pub struct PairKeyParseError(String);

impl FromStr for PairKey {
    type Err = PairKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| PairKeyParseError(s.to_string()))?;
        let a = a.parse().map_err(|_| PairKeyParseError(s.to_string()))?;
        let b = b.parse().map_err(|_| PairKeyParseError(s.to_string()))?;
        Ok(Self::new(a, b))
    }
}

impl From<PairKey> for String {
    fn from(key: PairKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for PairKey {
    type Error = PairKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Status of a relationship. The integer codes are the storage encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationshipStatus {
    /// Terminal: the row is deleted from the store on the next flush.
    Refused,
    Accepted,
    Pending,
}

impl RelationshipStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::Refused => 0,
            Self::Accepted => 1,
            Self::Pending => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Refused),
            1 => Some(Self::Accepted),
            2 => Some(Self::Pending),
            _ => None,
        }
    }
}

/// The single live record for one unordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub key: PairKey,
    pub sender: UserId,
    pub receiver: UserId,
    pub status: RelationshipStatus,
}

impl RelationshipRecord {
    pub fn new(sender: UserId, receiver: UserId, status: RelationshipStatus) -> Self {
        Self {
            key: PairKey::new(sender, receiver),
            sender,
            receiver,
            status,
        }
    }

    /// The other participant, seen from `id`.
    pub fn counterpart(&self, id: UserId) -> UserId {
        if self.sender == id {
            self.receiver
        } else {
            self.sender
        }
    }

    /// Fold this record into `node`, the node of participant `owner`.
    pub fn apply_to(&self, owner: UserId, node: &mut GraphNode) {
        let other = self.counterpart(owner);
        match self.status {
            RelationshipStatus::Pending if owner == self.sender => {
                node.outgoing.insert(other);
            }
            RelationshipStatus::Pending => {
                node.incoming.insert(other);
            }
            RelationshipStatus::Accepted => {
                node.friends.insert(other);
            }
            RelationshipStatus::Refused => {}
        }
    }
}

/// Adjacency of one materialized user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub friends: BTreeSet<UserId>,
    pub incoming: BTreeSet<UserId>,
    pub outgoing: BTreeSet<UserId>,
}

impl GraphNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mentions(&self, id: UserId) -> bool {
        self.friends.contains(&id) || self.incoming.contains(&id) || self.outgoing.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_ignores_order() {
        assert_eq!(PairKey::new(9, 2), PairKey::new(2, 9));
        assert_eq!(PairKey::new(9, 2).to_string(), "2:9");
        assert_eq!("9:2".parse::<PairKey>().unwrap(), PairKey::new(2, 9));
        assert!("2-9".parse::<PairKey>().is_err());
    }

    #[test]
    fn status_codes_match_storage_encoding() {
        for status in [
            RelationshipStatus::Refused,
            RelationshipStatus::Accepted,
            RelationshipStatus::Pending,
        ] {
            assert_eq!(RelationshipStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(RelationshipStatus::from_code(3), None);
    }

    #[test]
    fn pending_record_lands_on_the_right_side() {
        let rec = RelationshipRecord::new(1, 2, RelationshipStatus::Pending);
        let mut sender = GraphNode::new();
        let mut receiver = GraphNode::new();
        rec.apply_to(1, &mut sender);
        rec.apply_to(2, &mut receiver);
        assert!(sender.outgoing.contains(&2));
        assert!(receiver.incoming.contains(&1));
        assert!(sender.friends.is_empty() && receiver.friends.is_empty());
    }
}
