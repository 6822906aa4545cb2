//! Account commands and read-only queries.

use crate::directory::RenameOutcome;
use crate::friends::rejected;
use crate::service::UserService;
use crate::username;
use serde_json::json;
use social_types::{
    CommandResult, ErrorCode, FriendshipState, FriendshipStateData, Notification,
    NotificationKind, PublicProfile, ServiceError, StoreError, UserId,
};

impl UserService {
    pub async fn edit_username(
        &mut self,
        id: UserId,
        new_name: &str,
    ) -> Result<CommandResult, ServiceError> {
        let errors = username::validate(new_name);
        if !errors.is_empty() {
            tracing::debug!(user_id = id, ?errors, "username rejected");
            return Ok(CommandResult::fail_many(errors));
        }
        let previous = match self.directory.rename(id, new_name).await? {
            RenameOutcome::Renamed { previous } => previous,
            RenameOutcome::Taken => return Ok(rejected("edit_username", id, ErrorCode::AlreadyTaken)),
            RenameOutcome::UnknownUser => {
                return Ok(rejected("edit_username", id, ErrorCode::DoesNotExist))
            }
        };

        if let Err(e) = self.avatars.rename(&previous, new_name).await {
            tracing::warn!(user_id = id, error = %e, "failed to rename avatar");
        }
        let data = json!({ "prevname": previous, "newname": new_name });
        for friend in self.graph.friend_list(id) {
            self.notify(friend, NotificationKind::FriendUpdateUsername, data.clone())
                .await;
        }
        Ok(CommandResult::ok())
    }

    /// Register an account created elsewhere under a known id and name.
    pub async fn initialize_user(
        &mut self,
        id: UserId,
        name: &str,
        avatar_url: Option<String>,
    ) -> Result<CommandResult, ServiceError> {
        if name.is_empty() || self.directory.get_or_load(id).await?.is_some() {
            return Ok(rejected("initialize_user", id, ErrorCode::UserAlreadyExists));
        }
        match self
            .directory
            .create(id, Some(name.to_string()), avatar_url)
            .await
        {
            Ok(_) => Ok(CommandResult::ok()),
            Err(StoreError::NameTaken(_)) => {
                Ok(rejected("initialize_user", id, ErrorCode::AlreadyTaken))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn resolve_user_id(
        &mut self,
        name: &str,
    ) -> Result<CommandResult<UserId>, ServiceError> {
        match self.directory.resolve(name).await? {
            Some(id) => Ok(CommandResult::with_data(id)),
            None => Ok(CommandResult::fail(ErrorCode::UndefinedUser)),
        }
    }

    pub async fn get_user_data(
        &mut self,
        id: UserId,
    ) -> Result<CommandResult<PublicProfile>, ServiceError> {
        match self.directory.public_profile(id).await? {
            Some(profile) => Ok(CommandResult::with_data(profile)),
            None => Ok(CommandResult::fail(ErrorCode::UndefinedUser)),
        }
    }

    /// Friends of `id` as public profiles. Reloads the node first.
    pub async fn get_friends(
        &mut self,
        id: UserId,
    ) -> Result<CommandResult<Vec<PublicProfile>>, ServiceError> {
        if self.directory.get_or_load(id).await?.is_none() {
            return Ok(CommandResult::fail(ErrorCode::UndefinedUser));
        }
        self.graph.load_user(id).await?;
        let ids = self.graph.friend_list(id);
        Ok(CommandResult::with_data(
            self.directory.public_profiles(&ids).await?,
        ))
    }

    pub async fn get_incoming_requests(
        &mut self,
        id: UserId,
    ) -> Result<CommandResult<Vec<PublicProfile>>, ServiceError> {
        let Some(node) = self.graph.get_user_node(id) else {
            return Ok(CommandResult::fail(ErrorCode::UndefinedUser));
        };
        let ids: Vec<UserId> = node.incoming.into_iter().collect();
        Ok(CommandResult::with_data(
            self.directory.public_profiles(&ids).await?,
        ))
    }

    pub async fn get_outgoing_requests(
        &mut self,
        id: UserId,
    ) -> Result<CommandResult<Vec<PublicProfile>>, ServiceError> {
        let Some(node) = self.graph.get_user_node(id) else {
            return Ok(CommandResult::fail(ErrorCode::UndefinedUser));
        };
        let ids: Vec<UserId> = node.outgoing.into_iter().collect();
        Ok(CommandResult::with_data(
            self.directory.public_profiles(&ids).await?,
        ))
    }

    /// How `other` relates to `id`. Fails with no error code when unrelated.
    pub fn get_friendship_state(
        &self,
        id: UserId,
        other: UserId,
    ) -> CommandResult<FriendshipStateData> {
        let Some(node) = self.graph.node(id) else {
            return CommandResult::fail(ErrorCode::UndefinedUser);
        };
        let state = if node.friends.contains(&other) {
            FriendshipState::Friends
        } else if node.incoming.contains(&other) {
            FriendshipState::Incoming
        } else if node.outgoing.contains(&other) {
            FriendshipState::Outgoing
        } else {
            return CommandResult::fail_many(Vec::new());
        };
        CommandResult::with_data(FriendshipStateData { state })
    }

    /// Drain the user's queued notifications.
    pub async fn fetch_notifications(&self, id: UserId) -> Vec<Notification> {
        match self.notifier.fetch(id).await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(user_id = id, error = %e, "failed to fetch notifications");
                Vec::new()
            }
        }
    }
}
