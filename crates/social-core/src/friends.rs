//! Friendship commands. Each validates against the actor's materialized node,
//! records the transition, and notifies the counterpart.

use crate::cache::MaterializedCache;
use crate::service::UserService;
use serde_json::json;
use social_types::{
    CommandResult, ErrorCode, NotificationKind, RelationshipStatus, ServiceError, UserId,
};

impl UserService {
    /// Name of the acting user, or None when it has no materialized node.
    /// Actors are loaded by the on-seen hook, never here.
    async fn actor_name(&mut self, id: UserId) -> Result<Option<String>, ServiceError> {
        if !self.graph.is_loaded(id) {
            return Ok(None);
        }
        Ok(self.directory.get_or_load(id).await?.map(|user| user.name))
    }

    pub async fn request_friend(
        &mut self,
        sender: UserId,
        receiver: UserId,
    ) -> Result<CommandResult, ServiceError> {
        if sender == receiver {
            return Ok(rejected("request", sender, ErrorCode::SelfRequest));
        }
        let Some(sender_name) = self.actor_name(sender).await? else {
            return Ok(rejected("request", sender, ErrorCode::UndefinedUser));
        };
        if !self.directory.exists(receiver).await? {
            return Ok(rejected("request", sender, ErrorCode::UndefinedUser));
        }
        let Some(node) = self.graph.node(sender) else {
            return Ok(rejected("request", sender, ErrorCode::UndefinedUser));
        };
        if node.friends.contains(&receiver) {
            return Ok(rejected("request", sender, ErrorCode::AlreadyFriend));
        }
        if node.outgoing.contains(&receiver) {
            return Ok(rejected("request", sender, ErrorCode::AlreadyRequested));
        }
        if node.incoming.contains(&receiver) {
            // Crossing requests collapse into a friendship.
            return self.accept_friend_request(sender, receiver).await;
        }

        self.graph
            .upsert_update(sender, receiver, RelationshipStatus::Pending);
        self.notify(
            receiver,
            NotificationKind::FriendRequestReceived,
            json!({ "from": sender_name, "id": sender }),
        )
        .await;
        Ok(CommandResult::ok())
    }

    /// `receiver` accepts the pending request from `sender`.
    pub async fn accept_friend_request(
        &mut self,
        receiver: UserId,
        sender: UserId,
    ) -> Result<CommandResult, ServiceError> {
        if sender == receiver {
            return Ok(rejected("accept", receiver, ErrorCode::SelfRequest));
        }
        let Some(receiver_name) = self.actor_name(receiver).await? else {
            return Ok(rejected("accept", receiver, ErrorCode::UndefinedUser));
        };
        let Some(node) = self.graph.node(receiver) else {
            return Ok(rejected("accept", receiver, ErrorCode::UndefinedUser));
        };
        if node.friends.contains(&sender) {
            return Ok(rejected("accept", receiver, ErrorCode::AlreadyFriend));
        }
        if !node.incoming.contains(&sender) {
            return Ok(rejected("accept", receiver, ErrorCode::UndefinedRequest));
        }

        self.graph
            .upsert_update(sender, receiver, RelationshipStatus::Accepted);
        self.notify(
            sender,
            NotificationKind::FriendRequestAccepted,
            json!({ "name": receiver_name, "id": receiver }),
        )
        .await;
        Ok(CommandResult::ok())
    }

    /// `receiver` turns down the pending request from `sender`.
    pub async fn refuse_friend_request(
        &mut self,
        receiver: UserId,
        sender: UserId,
    ) -> Result<CommandResult, ServiceError> {
        let Some(receiver_name) = self.actor_name(receiver).await? else {
            return Ok(rejected("refuse", receiver, ErrorCode::UndefinedUser));
        };
        let Some(node) = self.graph.node(receiver) else {
            return Ok(rejected("refuse", receiver, ErrorCode::UndefinedUser));
        };
        if node.friends.contains(&sender) {
            return Ok(rejected("refuse", receiver, ErrorCode::AlreadyFriend));
        }
        if !node.incoming.contains(&sender) {
            return Ok(rejected("refuse", receiver, ErrorCode::UndefinedRequest));
        }

        self.graph
            .upsert_update(sender, receiver, RelationshipStatus::Refused);
        self.notify(
            sender,
            NotificationKind::FriendRequestRefused,
            json!({ "name": receiver_name, "id": receiver }),
        )
        .await;
        Ok(CommandResult::ok())
    }

    /// `sender` withdraws its own pending request to `receiver`.
    pub async fn cancel_friend_request(
        &mut self,
        sender: UserId,
        receiver: UserId,
    ) -> Result<CommandResult, ServiceError> {
        let Some(sender_name) = self.actor_name(sender).await? else {
            return Ok(rejected("cancel", sender, ErrorCode::UndefinedUser));
        };
        let Some(node) = self.graph.node(sender) else {
            return Ok(rejected("cancel", sender, ErrorCode::UndefinedUser));
        };
        if node.friends.contains(&receiver) {
            return Ok(rejected("cancel", sender, ErrorCode::AlreadyFriend));
        }
        if !node.outgoing.contains(&receiver) {
            return Ok(rejected("cancel", sender, ErrorCode::UndefinedRequest));
        }

        self.graph
            .upsert_update(sender, receiver, RelationshipStatus::Refused);
        self.notify(
            receiver,
            NotificationKind::FriendRequestCanceled,
            json!({ "from": sender_name, "id": sender }),
        )
        .await;
        Ok(CommandResult::ok())
    }

    pub async fn remove_friend(
        &mut self,
        user: UserId,
        friend: UserId,
    ) -> Result<CommandResult, ServiceError> {
        let Some(user_name) = self.actor_name(user).await? else {
            return Ok(rejected("remove_friend", user, ErrorCode::UndefinedUser));
        };
        let Some(node) = self.graph.node(user) else {
            return Ok(rejected("remove_friend", user, ErrorCode::UndefinedUser));
        };
        if !node.friends.contains(&friend) {
            return Ok(rejected("remove_friend", user, ErrorCode::NotFriend));
        }

        self.graph.remove_edge_on_node(user, friend);
        self.graph
            .upsert_update(user, friend, RelationshipStatus::Refused);
        self.notify(
            friend,
            NotificationKind::FriendUpdateRemoved,
            json!({ "name": user_name, "id": user }),
        )
        .await;
        Ok(CommandResult::ok())
    }

    /// Delete an account: end every relationship through the regular commands
    /// so counterparts are notified, then erase the user everywhere.
    pub async fn remove_user(&mut self, id: UserId) -> Result<CommandResult, ServiceError> {
        let Some(user) = self.directory.get_or_load(id).await? else {
            return Ok(rejected("remove_user", id, ErrorCode::UndefinedUser));
        };
        let node = self.graph.load(id).await?.unwrap_or_default();

        for friend in &node.friends {
            self.remove_friend(id, *friend).await?;
        }
        for receiver in &node.outgoing {
            self.cancel_friend_request(id, *receiver).await?;
        }
        for sender in &node.incoming {
            self.refuse_friend_request(id, *sender).await?;
        }

        if let Err(e) = self.avatars.remove(&user.name).await {
            tracing::warn!(user_id = id, error = %e, "failed to remove avatar");
        }
        self.directory.remove(id).await?;
        self.graph.remove_user(id).await?;
        if let Err(e) = self.notifier.clear(id).await {
            tracing::warn!(user_id = id, error = %e, "failed to clear notifications");
        }
        tracing::info!(user_id = id, username = %user.name, "user removed");
        Ok(CommandResult::ok())
    }
}

pub(crate) fn rejected<T>(command: &'static str, actor: UserId, code: ErrorCode) -> CommandResult<T> {
    tracing::debug!(command, actor, code = %code, "command rejected");
    CommandResult::fail(code)
}
