//! Conversation entities and repository traits.
//!
//! Maps to the `conversations` and `conversation_participants` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;
use crate::shared::error::AppError;

/// Hard cap on group size, checked before any participant insert.
pub const MAX_GROUP_MEMBERS: i64 = 100;

/// Conversation kind matching the `kind` VARCHAR column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// One-to-one chat: exactly 2 participants, at most one conversation
    /// per unordered user pair.
    Direct,
    /// Group chat: up to [`MAX_GROUP_MEMBERS`] participants, title required.
    Group,
}

impl ConversationKind {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "group" => Self::Group,
            _ => Self::Direct,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a direct or group conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,

    pub kind: ConversationKind,

    /// Group name; None for direct conversations
    pub title: Option<String>,

    /// Creator (for groups, the only user allowed to add members)
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    /// Bumped on every message so listings sort by recent activity
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    pub fn is_direct(&self) -> bool {
        self.kind == ConversationKind::Direct
    }
}

/// Membership row linking a user to a conversation.
///
/// Maps to `conversation_participants`:
/// - (conversation_id, user_id) composite primary key
/// - joined_at: TIMESTAMPTZ NOT NULL
/// - last_read_message_id: UUID NULL (read-receipt pointer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationParticipant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub last_read_message_id: Option<Uuid>,
}

/// Repository trait for Conversation data access operations.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Find a conversation by its ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, AppError>;

    /// Create a conversation together with its participant rows in a single
    /// transaction.
    async fn create_with_participants(
        &self,
        conversation: &Conversation,
        participant_ids: &[Uuid],
    ) -> Result<(), AppError>;

    /// Find the direct conversation between two users, if one exists.
    async fn find_direct_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>, AppError>;

    /// List conversations the user participates in, most recently active
    /// first.
    async fn find_for_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Conversation>, AppError>;

    /// Update a group conversation's title.
    async fn update_title(&self, id: Uuid, title: &str) -> Result<(), AppError>;

    /// Bump the last-activity timestamp.
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Delete a conversation; participants and messages cascade.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

/// Repository trait for participant rows.
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Find the membership row for a user in a conversation.
    async fn find(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationParticipant>, AppError>;

    /// All participants of a conversation.
    async fn list_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ConversationParticipant>, AppError>;

    /// IDs of all conversations a user belongs to. Used to rebuild the
    /// membership directory when the user connects.
    async fn conversation_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Current participant count for a conversation.
    async fn count(&self, conversation_id: Uuid) -> Result<i64, AppError>;

    /// Insert participant rows, a system message announcing the change and
    /// the conversation's activity bump in a single transaction.
    async fn add_recording(
        &self,
        participants: &[ConversationParticipant],
        system_message: &Message,
    ) -> Result<(), AppError>;

    /// Remove a participant row. Returns false if no row existed.
    async fn remove(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    /// Remove a participant row and record a system message plus the
    /// activity bump in a single transaction.
    async fn remove_recording(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        system_message: &Message,
    ) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_strings() {
        assert_eq!(ConversationKind::from_str("direct"), ConversationKind::Direct);
        assert_eq!(ConversationKind::from_str("group"), ConversationKind::Group);
        assert_eq!(ConversationKind::from_str("GROUP"), ConversationKind::Group);
        assert_eq!(ConversationKind::Direct.as_str(), "direct");
        assert_eq!(ConversationKind::Group.as_str(), "group");
    }

    #[test]
    fn unknown_kind_defaults_to_direct() {
        assert_eq!(ConversationKind::from_str("broadcast"), ConversationKind::Direct);
    }
}
