//! Message entity and repository trait.
//!
//! Maps to the `messages` table. A message with no sender is a system
//! message narrating a membership change inline in the conversation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Content a soft-deleted message reads back as.
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

/// Represents a chat message.
///
/// Maps to the `messages` table:
/// - id: UUID PRIMARY KEY
/// - conversation_id: UUID NOT NULL REFERENCES conversations(id)
/// - sender_id: UUID NULL REFERENCES users(id) -- NULL = system message
/// - content: TEXT NOT NULL
/// - file_url / file_type / file_name: optional attachment metadata
/// - created_at / edited_at: TIMESTAMPTZ
/// - is_deleted: BOOLEAN NOT NULL DEFAULT FALSE
/// - delivered_at / read_at / read_by_user_id: read-receipt fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,

    pub conversation_id: Uuid,

    /// Author; None for system messages, which bypass sender-ownership
    /// checks
    pub sender_id: Option<Uuid>,

    pub content: String,

    /// Attachment metadata (cleared on soft delete)
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub file_name: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set on every edit; None if never edited
    pub edited_at: Option<DateTime<Utc>>,

    /// Soft-delete flag. Deleted messages keep their row but scrub content
    /// and can never be edited again.
    pub is_deleted: bool,

    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub read_by_user_id: Option<Uuid>,
}

impl Message {
    /// Build a regular user message.
    pub fn new(conversation_id: Uuid, sender_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Some(sender_id),
            content,
            file_url: None,
            file_type: None,
            file_name: None,
            created_at: Utc::now(),
            edited_at: None,
            is_deleted: false,
            delivered_at: None,
            read_at: None,
            read_by_user_id: None,
        }
    }

    /// Build a system message (no sender, `file_type = "system"`).
    pub fn system(conversation_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: None,
            content,
            file_url: None,
            file_type: Some("system".into()),
            file_name: None,
            created_at: Utc::now(),
            edited_at: None,
            is_deleted: false,
            delivered_at: None,
            read_at: None,
            read_by_user_id: None,
        }
    }

    pub fn is_system(&self) -> bool {
        self.sender_id.is_none()
    }

    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    /// The wire-level message type tag: "system", the attachment MIME type,
    /// or "text".
    pub fn message_type(&self) -> &str {
        if self.is_system() {
            "system"
        } else {
            self.file_type.as_deref().unwrap_or("text")
        }
    }

    /// Scrub content and attachment fields, marking the message deleted.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
        self.content = DELETED_PLACEHOLDER.into();
        self.file_url = None;
        self.file_type = None;
        self.file_name = None;
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message by its ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, AppError>;

    /// List messages in a conversation, newest first.
    async fn find_by_conversation(
        &self,
        conversation_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// Persist a new message.
    async fn create(&self, message: &Message) -> Result<(), AppError>;

    /// Update content and edited timestamp.
    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Mark the message deleted and scrub content/attachment columns.
    async fn soft_delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Record a read receipt and advance the reader's per-conversation
    /// read pointer in a single transaction. Backfills `delivered_at` when
    /// it was never set.
    async fn mark_read(
        &self,
        id: Uuid,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}
