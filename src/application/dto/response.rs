//! Response DTOs
//!
//! Data structures for API response bodies. Conversation responses reuse
//! [`ConversationSnapshot`](crate::realtime::events::ConversationSnapshot),
//! which is also the `new_conversation` event payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::FriendWithUser;
use crate::domain::{Friendship, Message, MessageReaction};

/// Message response body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub content: String,
    pub message_type: String,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub read_by_user_id: Option<Uuid>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        let message_type = message.message_type().to_string();
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content,
            message_type,
            file_url: message.file_url,
            file_type: message.file_type,
            file_name: message.file_name,
            created_at: message.created_at,
            edited_at: message.edited_at,
            is_deleted: message.is_deleted,
            delivered_at: message.delivered_at,
            read_at: message.read_at,
            read_by_user_id: message.read_by_user_id,
        }
    }
}

/// Read receipt response body
#[derive(Debug, Serialize)]
pub struct MessageReadResponse {
    pub message_id: Uuid,
    pub read_at: DateTime<Utc>,
    pub read_by_user_id: Uuid,
}

/// Reaction response body
#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageReaction> for ReactionResponse {
    fn from(reaction: MessageReaction) -> Self {
        Self {
            id: reaction.id,
            message_id: reaction.message_id,
            user_id: reaction.user_id,
            emoji: reaction.emoji,
            created_at: reaction.created_at,
        }
    }
}

/// Friendship row response body
#[derive(Debug, Serialize)]
pub struct FriendshipResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Friendship> for FriendshipResponse {
    fn from(friendship: Friendship) -> Self {
        Self {
            id: friendship.id,
            user_id: friendship.user_id,
            friend_id: friendship.friend_id,
            status: friendship.status.as_str().to_string(),
            created_at: friendship.created_at,
            updated_at: friendship.updated_at,
        }
    }
}

/// Friendship joined with the other party's user record
#[derive(Debug, Serialize)]
pub struct FriendWithUserResponse {
    pub friendship_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub is_active: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<FriendWithUser> for FriendWithUserResponse {
    fn from(entry: FriendWithUser) -> Self {
        Self {
            friendship_id: entry.friendship.id,
            user_id: entry.user.id,
            username: entry.user.username,
            display_name: entry.user.display_name,
            is_active: entry.user.is_active,
            last_seen_at: entry.user.last_seen_at,
            status: entry.friendship.status.as_str().to_string(),
            created_at: entry.friendship.created_at,
        }
    }
}

/// Friendship status probe response
#[derive(Debug, Serialize)]
pub struct FriendshipStatusResponse {
    pub are_friends: bool,
    pub status: Option<String>,
    pub friendship_id: Option<Uuid>,
    pub initiated_by: Option<Uuid>,
}
