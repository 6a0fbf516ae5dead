//! Realtime Event Types
//!
//! The closed catalog of server-to-client events and client-to-server
//! commands, plus the wire envelope. Every event is a tagged variant so
//! dispatch is exhaustive at compile time; the wire shape is
//! `{ "type": ..., "data": ..., "timestamp": ... }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-to-client event catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected(ConnectedPayload),
    NewMessage(ChatMessagePayload),
    MessageEdited(MessageEditedPayload),
    MessageDeleted(MessageDeletedPayload),
    MessageRead(MessageReadPayload),
    ReactionAdded(ReactionAddedPayload),
    ReactionRemoved(ReactionRemovedPayload),
    NewConversation(NewConversationPayload),
    Typing(TypingPayload),
    UserOnline(UserStatusPayload),
    UserOffline(UserStatusPayload),
    Error(ErrorPayload),
    Pong(PongPayload),
}

impl ServerEvent {
    /// Event name as it appears on the wire (used for logs and metrics).
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::Connected(_) => "connected",
            ServerEvent::NewMessage(_) => "new_message",
            ServerEvent::MessageEdited(_) => "message_edited",
            ServerEvent::MessageDeleted(_) => "message_deleted",
            ServerEvent::MessageRead(_) => "message_read",
            ServerEvent::ReactionAdded(_) => "reaction_added",
            ServerEvent::ReactionRemoved(_) => "reaction_removed",
            ServerEvent::NewConversation(_) => "new_conversation",
            ServerEvent::Typing(_) => "typing",
            ServerEvent::UserOnline(_) => "user_online",
            ServerEvent::UserOffline(_) => "user_offline",
            ServerEvent::Error(_) => "error",
            ServerEvent::Pong(_) => "pong",
        }
    }
}

/// Wire envelope wrapping an event with its emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: ServerEvent,
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// Stamp an event with the current time.
    pub fn now(event: ServerEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

/// Client-to-server command catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    Typing(TypingCommand),
    Ping,
}

/// Typing indicator command payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TypingCommand {
    pub conversation_id: Uuid,
    pub is_typing: bool,
}

// Event payload structs

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub user_id: Uuid,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    /// None for system messages
    pub sender_id: Option<Uuid>,
    pub sender_username: String,
    pub sender_display_name: String,
    pub content: String,
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEditedPayload {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeletedPayload {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub sender_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReadPayload {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub read_by_user_id: Uuid,
    pub read_by_username: String,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionAddedPayload {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRemovedPayload {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
}

/// Full conversation view pushed to participants when a conversation is
/// created or they are added to one. Also serves as the REST response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub id: Uuid,
    pub kind: String,
    pub title: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub participants: Vec<ParticipantSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConversationPayload {
    pub conversation: ConversationSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingPayload {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatusPayload {
    pub user_id: Uuid,
    pub username: String,
    /// "online" or "offline"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongPayload {
    pub message: String,
}

impl PongPayload {
    pub fn pong() -> Self {
        Self {
            message: "pong".into(),
        }
    }
}
