//! Friendship Service
//!
//! The pending/accepted/rejected/blocked relationship lifecycle that gates
//! group membership.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Friendship, FriendshipRepository, FriendshipStatus, User, UserRepository};
use crate::shared::error::AppError;

/// Action a recipient takes on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipAction {
    Accept,
    Reject,
    Block,
}

impl FriendshipAction {
    pub fn target_status(self) -> FriendshipStatus {
        match self {
            Self::Accept => FriendshipStatus::Accepted,
            Self::Reject => FriendshipStatus::Rejected,
            Self::Block => FriendshipStatus::Blocked,
        }
    }
}

/// A friendship row joined with the other party's user record.
#[derive(Debug, Clone)]
pub struct FriendWithUser {
    pub friendship: Friendship,
    pub user: User,
}

/// Friendship service errors
#[derive(Debug, thiserror::Error)]
pub enum FriendshipError {
    #[error("Friendship not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Cannot send a friend request to yourself")]
    SelfRequest,

    #[error("Friend request already sent or received")]
    AlreadyPending,

    #[error("Already friends with this user")]
    AlreadyFriends,

    #[error("Cannot send a friend request to this user")]
    Blocked,

    #[error("Only the request recipient may respond")]
    NotRecipient,

    #[error("Friend request is already {0}")]
    NotPending(FriendshipStatus),

    #[error("You are not part of this friendship")]
    NotInvolved,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for FriendshipError {
    fn from(e: AppError) -> Self {
        FriendshipError::Internal(e.to_string())
    }
}

/// Friendship state machine service.
pub struct FriendshipService<F, U>
where
    F: FriendshipRepository,
    U: UserRepository,
{
    friendship_repo: Arc<F>,
    user_repo: Arc<U>,
}

impl<F, U> FriendshipService<F, U>
where
    F: FriendshipRepository,
    U: UserRepository,
{
    pub fn new(friendship_repo: Arc<F>, user_repo: Arc<U>) -> Self {
        Self {
            friendship_repo,
            user_repo,
        }
    }

    /// Send a friend request.
    ///
    /// An existing row decides the outcome: pending and accepted rows
    /// reject the request, a blocked row forbids it outright, and a
    /// rejected row is overwritten in place (direction flipped to the new
    /// requester, status reset to pending) rather than inserting a
    /// duplicate pair.
    pub async fn send_request(
        &self,
        requester_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Friendship, FriendshipError> {
        if requester_id == recipient_id {
            return Err(FriendshipError::SelfRequest);
        }

        self.user_repo
            .find_by_id(recipient_id)
            .await?
            .ok_or(FriendshipError::UserNotFound)?;

        if let Some(mut existing) = self
            .friendship_repo
            .find_between(requester_id, recipient_id)
            .await?
        {
            return match existing.status {
                FriendshipStatus::Pending => Err(FriendshipError::AlreadyPending),
                FriendshipStatus::Accepted => Err(FriendshipError::AlreadyFriends),
                FriendshipStatus::Blocked => Err(FriendshipError::Blocked),
                FriendshipStatus::Rejected => {
                    existing.user_id = requester_id;
                    existing.friend_id = recipient_id;
                    existing.status = FriendshipStatus::Pending;
                    existing.updated_at = Utc::now();
                    self.friendship_repo.update(&existing).await?;
                    Ok(existing)
                }
            };
        }

        let friendship = Friendship::new_request(requester_id, recipient_id);
        self.friendship_repo.create(&friendship).await?;

        tracing::debug!(
            requester = %requester_id,
            recipient = %recipient_id,
            "Friend request sent"
        );

        Ok(friendship)
    }

    /// Respond to a pending request. Recipient only; accepted, rejected and
    /// blocked are terminal for this request (rejected may be re-requested
    /// later).
    pub async fn respond(
        &self,
        actor_id: Uuid,
        friendship_id: Uuid,
        action: FriendshipAction,
    ) -> Result<Friendship, FriendshipError> {
        let mut friendship = self
            .friendship_repo
            .find_by_id(friendship_id)
            .await?
            .ok_or(FriendshipError::NotFound)?;

        if friendship.friend_id != actor_id {
            return Err(FriendshipError::NotRecipient);
        }
        if friendship.status != FriendshipStatus::Pending {
            return Err(FriendshipError::NotPending(friendship.status));
        }

        friendship.status = action.target_status();
        friendship.updated_at = Utc::now();
        self.friendship_repo.update(&friendship).await?;

        Ok(friendship)
    }

    /// Whether an accepted friendship exists between two users.
    pub async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool, FriendshipError> {
        Ok(self
            .friendship_repo
            .find_between(a, b)
            .await?
            .is_some_and(|f| f.status == FriendshipStatus::Accepted))
    }

    /// The friendship row between the actor and another user, if any.
    pub async fn status_with(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Friendship>, FriendshipError> {
        Ok(self.friendship_repo.find_between(actor_id, user_id).await?)
    }

    /// All accepted friends of the actor, with user records.
    pub async fn list_friends(
        &self,
        actor_id: Uuid,
    ) -> Result<Vec<FriendWithUser>, FriendshipError> {
        let friendships = self.friendship_repo.list_accepted_for(actor_id).await?;
        self.join_users(actor_id, friendships).await
    }

    /// Pending requests sent to the actor.
    pub async fn list_received(
        &self,
        actor_id: Uuid,
    ) -> Result<Vec<FriendWithUser>, FriendshipError> {
        let friendships = self.friendship_repo.list_pending_received(actor_id).await?;
        self.join_users(actor_id, friendships).await
    }

    /// Pending requests the actor has sent.
    pub async fn list_sent(
        &self,
        actor_id: Uuid,
    ) -> Result<Vec<FriendWithUser>, FriendshipError> {
        let friendships = self.friendship_repo.list_pending_sent(actor_id).await?;
        self.join_users(actor_id, friendships).await
    }

    /// Remove a friend or cancel a request. Either party may do this; the
    /// row is deleted and any direct conversation stays intact.
    pub async fn remove(
        &self,
        actor_id: Uuid,
        friendship_id: Uuid,
    ) -> Result<(), FriendshipError> {
        let friendship = self
            .friendship_repo
            .find_by_id(friendship_id)
            .await?
            .ok_or(FriendshipError::NotFound)?;

        if !friendship.involves(actor_id) {
            return Err(FriendshipError::NotInvolved);
        }

        self.friendship_repo.delete(friendship_id).await?;
        Ok(())
    }

    async fn join_users(
        &self,
        actor_id: Uuid,
        friendships: Vec<Friendship>,
    ) -> Result<Vec<FriendWithUser>, FriendshipError> {
        let other_ids: Vec<Uuid> = friendships
            .iter()
            .map(|f| f.other_party(actor_id))
            .collect();
        let users: std::collections::HashMap<Uuid, User> = self
            .user_repo
            .find_many(&other_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(friendships
            .into_iter()
            .filter_map(|friendship| {
                users
                    .get(&friendship.other_party(actor_id))
                    .cloned()
                    .map(|user| FriendWithUser { friendship, user })
            })
            .collect())
    }
}
