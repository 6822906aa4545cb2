//! FriendGraph: per-user adjacency materialized from the store and the ledger.

use crate::cache::MaterializedCache;
use crate::ledger::RequestLedger;
use async_trait::async_trait;
use social_types::{
    GraphNode, PersistenceStore, RelationshipRecord, RelationshipStatus, StoreError, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Counts from one ledger flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub deleted: usize,
}

/// Adjacency cache for materialized users plus the ledger of unflushed changes.
///
/// Only materialized nodes are ever mutated. A user that is not loaded picks up
/// pending changes from the ledger the next time it is loaded.
pub struct FriendGraph {
    store: Arc<dyn PersistenceStore>,
    nodes: HashMap<UserId, GraphNode>,
    ledger: RequestLedger,
}

impl FriendGraph {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            store,
            nodes: HashMap::new(),
            ledger: RequestLedger::new(),
        }
    }

    /// Rebuild the node for `id` from the store, overlaid with the ledger.
    ///
    /// Always refreshes, even when the node is already materialized.
    pub async fn load_user(&mut self, id: UserId) -> Result<(), StoreError> {
        let stored = self.store.get_relationships_for_user(id).await?;
        let mut node = GraphNode::new();
        for record in &stored {
            if record.key.contains(id) && !self.ledger.contains(&record.key) {
                record.apply_to(id, &mut node);
            }
        }
        for record in self.ledger.records_for(id) {
            record.apply_to(id, &mut node);
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn is_loaded(&self, id: UserId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn loaded_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: UserId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// A copy of the node; callers cannot mutate the cache through it.
    pub fn get_user_node(&self, id: UserId) -> Option<GraphNode> {
        self.nodes.get(&id).cloned()
    }

    pub fn friend_list(&self, id: UserId) -> Vec<UserId> {
        self.nodes
            .get(&id)
            .map(|n| n.friends.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn incoming_requests(&self, id: UserId) -> Vec<UserId> {
        self.nodes
            .get(&id)
            .map(|n| n.incoming.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn outgoing_requests(&self, id: UserId) -> Vec<UserId> {
        self.nodes
            .get(&id)
            .map(|n| n.outgoing.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    /// Record a status change for the pair and update both participants' nodes.
    ///
    /// Edges between the two users are cleared on each materialized node and
    /// rebuilt from the new record, so a direction flip never leaves a stale edge.
    pub fn upsert_update(
        &mut self,
        sender: UserId,
        receiver: UserId,
        status: RelationshipStatus,
    ) -> Option<RelationshipRecord> {
        let record = RelationshipRecord::new(sender, receiver, status);
        for (owner, other) in [(sender, receiver), (receiver, sender)] {
            if let Some(node) = self.nodes.get_mut(&owner) {
                node.friends.remove(&other);
                node.incoming.remove(&other);
                node.outgoing.remove(&other);
                record.apply_to(owner, node);
            }
        }
        let previous = self.ledger.upsert(record);
        tracing::debug!(
            sender,
            receiver,
            status = ?status,
            previous = ?previous.as_ref().map(|r| r.status),
            "relationship updated"
        );
        previous
    }

    /// Drop the friend edge on `user`'s node only.
    pub fn remove_edge_on_node(&mut self, user: UserId, friend: UserId) -> bool {
        self.nodes
            .get_mut(&user)
            .map(|n| n.friends.remove(&friend))
            .unwrap_or(false)
    }

    /// Write the ledger to the store in one batch, then clear it.
    ///
    /// On failure the ledger is kept so the next flush retries it.
    pub async fn save_all(&mut self) -> Result<FlushReport, StoreError> {
        if self.ledger.is_empty() {
            return Ok(FlushReport::default());
        }
        let records = self.ledger.snapshot();
        let report = FlushReport {
            written: records.len() - self.ledger.pending_delete_count(),
            deleted: self.ledger.pending_delete_count(),
        };
        self.store.save_relationships(&records).await?;
        self.ledger.clear();
        tracing::debug!(written = report.written, deleted = report.deleted, "ledger flushed");
        Ok(report)
    }

    pub fn unload_user(&mut self, id: UserId) -> bool {
        self.nodes.remove(&id).is_some()
    }

    /// Forget the user everywhere: cache, ledger, and stored relationships.
    pub async fn remove_user(&mut self, id: UserId) -> Result<(), StoreError> {
        self.store.remove_all_relationships_for_user(id).await?;
        self.nodes.remove(&id);
        self.ledger.forget_user(id);
        for node in self.nodes.values_mut() {
            node.friends.remove(&id);
            node.incoming.remove(&id);
            node.outgoing.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl MaterializedCache for FriendGraph {
    type Entry = GraphNode;

    async fn load(&mut self, id: UserId) -> Result<Option<GraphNode>, StoreError> {
        self.load_user(id).await?;
        Ok(self.get_user_node(id))
    }

    fn get(&self, id: UserId) -> Option<GraphNode> {
        self.get_user_node(id)
    }

    fn invalidate(&mut self, id: UserId) -> bool {
        self.unload_user(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_store::InMemoryStore;
    use RelationshipStatus::*;

    fn graph() -> (Arc<InMemoryStore>, FriendGraph) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), FriendGraph::new(store))
    }

    #[tokio::test]
    async fn direction_flip_clears_the_old_edges() {
        let (_store, mut g) = graph();
        g.load_user(1).await.unwrap();
        g.load_user(2).await.unwrap();

        g.upsert_update(1, 2, Pending);
        g.upsert_update(1, 2, Refused);
        g.upsert_update(2, 1, Pending);

        let one = g.get_user_node(1).unwrap();
        let two = g.get_user_node(2).unwrap();
        assert!(one.outgoing.is_empty());
        assert_eq!(one.incoming.iter().copied().collect::<Vec<_>>(), vec![2]);
        assert!(two.incoming.is_empty());
        assert_eq!(two.outgoing.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn only_materialized_nodes_are_touched() {
        let (_store, mut g) = graph();
        g.load_user(1).await.unwrap();
        g.upsert_update(1, 2, Pending);
        assert!(!g.is_loaded(2));

        // The ledger supplies the change when 2 is loaded later.
        g.load_user(2).await.unwrap();
        assert_eq!(g.incoming_requests(2), vec![1]);
    }

    #[tokio::test]
    async fn ledger_wins_over_stale_store_rows() {
        let (store, mut g) = graph();
        store
            .save_relationships(&[RelationshipRecord::new(1, 2, Accepted)])
            .await
            .unwrap();
        g.load_user(1).await.unwrap();
        assert_eq!(g.friend_list(1), vec![2]);

        g.upsert_update(1, 2, Refused);
        g.load_user(1).await.unwrap();
        assert!(g.friend_list(1).is_empty());

        let report = g.save_all().await.unwrap();
        assert_eq!(report, FlushReport { written: 0, deleted: 1 });
        assert!(g.ledger().is_empty());
        assert!(store.get_relationships_for_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flushed_state_survives_eviction() {
        let (store, mut g) = graph();
        g.load_user(1).await.unwrap();
        g.load_user(2).await.unwrap();
        g.upsert_update(1, 2, Pending);
        g.upsert_update(2, 1, Accepted);
        g.save_all().await.unwrap();
        assert_eq!(store.relationship_count().await, 1);

        assert!(g.unload_user(1));
        assert!(g.get_user_node(1).is_none());
        g.load_user(1).await.unwrap();
        assert_eq!(g.friend_list(1), vec![2]);
    }

    #[tokio::test]
    async fn remove_user_clears_every_trace() {
        let (store, mut g) = graph();
        store
            .save_relationships(&[RelationshipRecord::new(1, 3, Accepted)])
            .await
            .unwrap();
        g.load_user(1).await.unwrap();
        g.load_user(3).await.unwrap();
        g.upsert_update(1, 2, Pending);

        g.remove_user(1).await.unwrap();
        assert!(!g.is_loaded(1));
        assert!(g.ledger().is_empty());
        assert!(g.friend_list(3).is_empty());
        assert_eq!(store.relationship_count().await, 0);
    }

    #[tokio::test]
    async fn reloading_is_idempotent() {
        let (store, mut g) = graph();
        store
            .save_relationships(&[
                RelationshipRecord::new(1, 2, Accepted),
                RelationshipRecord::new(3, 1, Pending),
            ])
            .await
            .unwrap();
        g.load_user(1).await.unwrap();
        g.upsert_update(1, 4, Pending);
        let first = g.get_user_node(1).unwrap();
        g.load_user(1).await.unwrap();
        g.load_user(1).await.unwrap();
        assert_eq!(g.get_user_node(1).unwrap(), first);
        assert_eq!(g.outgoing_requests(1), vec![4]);
        assert_eq!(g.incoming_requests(1), vec![3]);
    }

    #[tokio::test]
    async fn nodes_handed_out_are_copies() {
        let (_store, mut g) = graph();
        g.load_user(1).await.unwrap();
        let mut copy = g.get_user_node(1).unwrap();
        copy.friends.insert(9);
        assert!(g.friend_list(1).is_empty());
    }
}
