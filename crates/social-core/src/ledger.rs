//! RequestLedger: relationship records changed since the last flush.

use social_types::{PairKey, RelationshipRecord, RelationshipStatus, UserId};
use std::collections::{HashMap, HashSet};

/// Dirty relationship records, at most one per unordered pair.
///
/// Records here are newer than anything in the store and take precedence
/// when a user's graph node is rebuilt.
#[derive(Debug, Default)]
pub struct RequestLedger {
    records: HashMap<PairKey, RelationshipRecord>,
    by_user: HashMap<UserId, HashSet<PairKey>>,
    /// Pairs whose latest status is REFUSED; their rows go away on flush.
    pending_delete: HashSet<PairKey>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for the pair, returning the one it replaced.
    pub fn upsert(&mut self, record: RelationshipRecord) -> Option<RelationshipRecord> {
        let key = record.key;
        if record.status == RelationshipStatus::Refused {
            self.pending_delete.insert(key);
        } else {
            self.pending_delete.remove(&key);
        }
        self.by_user.entry(key.low()).or_default().insert(key);
        self.by_user.entry(key.high()).or_default().insert(key);
        self.records.insert(key, record)
    }

    pub fn record(&self, key: &PairKey) -> Option<&RelationshipRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &PairKey) -> bool {
        self.records.contains_key(key)
    }

    /// Records involving `id`, ordered by pair.
    pub fn records_for(&self, id: UserId) -> Vec<&RelationshipRecord> {
        let mut keys: Vec<&PairKey> = self
            .by_user
            .get(&id)
            .map(|set| set.iter().collect())
            .unwrap_or_default();
        keys.sort();
        keys.into_iter().filter_map(|k| self.records.get(k)).collect()
    }

    pub fn is_pending_delete(&self, key: &PairKey) -> bool {
        self.pending_delete.contains(key)
    }

    pub fn pending_delete_count(&self) -> usize {
        self.pending_delete.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, ordered by pair.
    pub fn snapshot(&self) -> Vec<RelationshipRecord> {
        let mut out: Vec<RelationshipRecord> = self.records.values().cloned().collect();
        out.sort_by_key(|r| r.key);
        out
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.by_user.clear();
        self.pending_delete.clear();
    }

    /// Drop every record involving `id`. Returns how many were dropped.
    pub fn forget_user(&mut self, id: UserId) -> usize {
        let Some(keys) = self.by_user.remove(&id) else {
            return 0;
        };
        for key in &keys {
            self.records.remove(key);
            self.pending_delete.remove(key);
            let other = if key.low() == id { key.high() } else { key.low() };
            if let Some(set) = self.by_user.get_mut(&other) {
                set.remove(key);
                if set.is_empty() {
                    self.by_user.remove(&other);
                }
            }
        }
        keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RelationshipStatus::*;

    #[test]
    fn one_record_per_pair_regardless_of_direction() {
        let mut ledger = RequestLedger::new();
        assert!(ledger.upsert(RelationshipRecord::new(1, 2, Pending)).is_none());
        let previous = ledger.upsert(RelationshipRecord::new(2, 1, Accepted)).unwrap();
        assert_eq!(previous.sender, 1);
        assert_eq!(ledger.len(), 1);
        let current = ledger.record(&PairKey::new(1, 2)).unwrap();
        assert_eq!((current.sender, current.status), (2, Accepted));
    }

    #[test]
    fn pending_delete_tracks_the_latest_status() {
        let mut ledger = RequestLedger::new();
        let key = PairKey::new(1, 2);
        ledger.upsert(RelationshipRecord::new(1, 2, Refused));
        assert!(ledger.is_pending_delete(&key));
        ledger.upsert(RelationshipRecord::new(2, 1, Pending));
        assert!(!ledger.is_pending_delete(&key));
        assert_eq!(ledger.pending_delete_count(), 0);
    }

    #[test]
    fn records_for_and_forget_user() {
        let mut ledger = RequestLedger::new();
        ledger.upsert(RelationshipRecord::new(1, 2, Pending));
        ledger.upsert(RelationshipRecord::new(3, 1, Refused));
        ledger.upsert(RelationshipRecord::new(2, 3, Accepted));

        let keys: Vec<PairKey> = ledger.records_for(1).iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![PairKey::new(1, 2), PairKey::new(1, 3)]);

        assert_eq!(ledger.forget_user(1), 2);
        assert!(ledger.records_for(1).is_empty());
        assert_eq!(ledger.records_for(2).len(), 1);
        assert_eq!(ledger.pending_delete_count(), 0);
        assert_eq!(ledger.snapshot(), vec![RelationshipRecord::new(2, 3, Accepted)]);
    }
}
