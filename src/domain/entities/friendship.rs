//! Friendship entity and repository trait.
//!
//! One row per unordered user pair, stored directionally: `user_id` is the
//! requester and `friend_id` the recipient. Lookups always check both
//! directions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Friendship lifecycle status matching the `status` VARCHAR column.
///
/// `(none) -> Pending -> {Accepted, Rejected, Blocked}`. A rejected row may
/// be re-requested (direction flips, status resets to pending); accepted and
/// blocked rows reject new requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl FriendshipStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            "blocked" => Self::Blocked,
            _ => Self::Pending,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Blocked => "blocked",
        }
    }

    /// Whether a pending row may transition to this status via a response.
    pub fn is_response(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A friendship row between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: Uuid,

    /// Requester
    pub user_id: Uuid,

    /// Recipient; the only user who may respond while pending
    pub friend_id: Uuid,

    pub status: FriendshipStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Friendship {
    pub fn new_request(requester: Uuid, recipient: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: requester,
            friend_id: recipient,
            status: FriendshipStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the given user is one of the two parties.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.friend_id == user_id
    }

    /// The party that is not `user_id`.
    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.user_id == user_id {
            self.friend_id
        } else {
            self.user_id
        }
    }
}

/// Repository trait for friendship data access operations.
#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    /// Find a friendship by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Friendship>, AppError>;

    /// Find the row for an unordered pair, whichever direction it was
    /// stored in.
    async fn find_between(&self, a: Uuid, b: Uuid) -> Result<Option<Friendship>, AppError>;

    /// Insert a new friendship row.
    async fn create(&self, friendship: &Friendship) -> Result<(), AppError>;

    /// Overwrite status and direction (re-request of a rejected row,
    /// responses to pending rows).
    async fn update(&self, friendship: &Friendship) -> Result<(), AppError>;

    /// Delete the row. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Accepted friendships involving the user (either direction).
    async fn list_accepted_for(&self, user_id: Uuid) -> Result<Vec<Friendship>, AppError>;

    /// Pending requests where the user is the recipient.
    async fn list_pending_received(&self, user_id: Uuid)
        -> Result<Vec<Friendship>, AppError>;

    /// Pending requests where the user is the requester.
    async fn list_pending_sent(&self, user_id: Uuid) -> Result<Vec<Friendship>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("pending", FriendshipStatus::Pending)]
    #[test_case("accepted", FriendshipStatus::Accepted)]
    #[test_case("rejected", FriendshipStatus::Rejected)]
    #[test_case("blocked", FriendshipStatus::Blocked)]
    #[test_case("garbage", FriendshipStatus::Pending)]
    fn status_parses_storage_strings(raw: &str, expected: FriendshipStatus) {
        assert_eq!(FriendshipStatus::from_str(raw), expected);
    }

    #[test]
    fn responses_exclude_pending() {
        assert!(!FriendshipStatus::Pending.is_response());
        assert!(FriendshipStatus::Accepted.is_response());
        assert!(FriendshipStatus::Rejected.is_response());
        assert!(FriendshipStatus::Blocked.is_response());
    }

    #[test]
    fn other_party_flips_direction() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let friendship = Friendship::new_request(a, b);
        assert_eq!(friendship.other_party(a), b);
        assert_eq!(friendship.other_party(b), a);
        assert!(friendship.involves(a));
        assert!(friendship.involves(b));
    }
}
