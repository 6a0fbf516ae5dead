//! Message reaction entity and repository trait.
//!
//! Reactions are stored per-user per-emoji per-message; the unique triple
//! makes adds naturally idempotent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// A single user's reaction to a message.
///
/// Maps to `message_reactions` with a UNIQUE (message_id, user_id, emoji)
/// constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReaction {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl MessageReaction {
    pub fn new(message_id: Uuid, user_id: Uuid, emoji: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_id,
            user_id,
            emoji,
            created_at: Utc::now(),
        }
    }
}

/// Repository trait for reaction data access operations.
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Find an exact (message, user, emoji) triple.
    async fn find(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<Option<MessageReaction>, AppError>;

    /// Insert a reaction. The caller checks for an existing triple first;
    /// the unique constraint is the backstop.
    async fn create(&self, reaction: &MessageReaction) -> Result<(), AppError>;

    /// Delete a triple. Returns false if it did not exist.
    async fn delete(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<bool, AppError>;

    /// All reactions on a message, oldest first.
    async fn list_for_message(&self, message_id: Uuid)
        -> Result<Vec<MessageReaction>, AppError>;
}
