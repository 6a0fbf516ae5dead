//! Message Service
//!
//! The message lifecycle engine: send, edit, soft delete and read receipts,
//! each committed to storage before its event fans out.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    ConversationRepository, Message, MessageRepository, ParticipantRepository, User,
    UserRepository,
};
use crate::realtime::events::{
    ChatMessagePayload, MessageDeletedPayload, MessageEditedPayload, MessageReadPayload,
    ServerEvent,
};
use crate::realtime::EventRouter;
use crate::shared::error::AppError;

/// Maximum message content length in characters.
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// Create message request
#[derive(Debug, Clone)]
pub struct SendMessageDto {
    pub conversation_id: Uuid,
    pub content: String,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub file_name: Option<String>,
}

/// Message service errors
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Message not found")]
    NotFound,

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("You are not a participant in this conversation")]
    NotParticipant,

    #[error("You can only modify your own messages")]
    NotSender,

    #[error("Message is deleted")]
    AlreadyDeleted,

    #[error("Cannot mark your own message as read")]
    OwnMessageRead,

    #[error("Message content too long")]
    ContentTooLong,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for MessageError {
    fn from(e: AppError) -> Self {
        MessageError::Internal(e.to_string())
    }
}

/// Message lifecycle service.
///
/// Generic over the repository traits so tests can run against in-memory
/// implementations.
pub struct MessageService<M, C, P, U>
where
    M: MessageRepository,
    C: ConversationRepository,
    P: ParticipantRepository,
    U: UserRepository,
{
    message_repo: Arc<M>,
    conversation_repo: Arc<C>,
    participant_repo: Arc<P>,
    user_repo: Arc<U>,
    router: Arc<EventRouter>,
}

impl<M, C, P, U> MessageService<M, C, P, U>
where
    M: MessageRepository,
    C: ConversationRepository,
    P: ParticipantRepository,
    U: UserRepository,
{
    pub fn new(
        message_repo: Arc<M>,
        conversation_repo: Arc<C>,
        participant_repo: Arc<P>,
        user_repo: Arc<U>,
        router: Arc<EventRouter>,
    ) -> Self {
        Self {
            message_repo,
            conversation_repo,
            participant_repo,
            user_repo,
            router,
        }
    }

    async fn require_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), MessageError> {
        self.participant_repo
            .find(conversation_id, user_id)
            .await?
            .map(|_| ())
            .ok_or(MessageError::NotParticipant)
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, MessageError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| MessageError::Internal(format!("user {} missing", user_id)))
    }

    /// Send a message to a conversation.
    ///
    /// The sender must be a current participant. On success the
    /// conversation's activity timestamp is bumped and `new_message` fans
    /// out to all members including the sender (client-side confirmation).
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        dto: SendMessageDto,
    ) -> Result<Message, MessageError> {
        if dto.content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(MessageError::ContentTooLong);
        }

        self.conversation_repo
            .find_by_id(dto.conversation_id)
            .await?
            .ok_or(MessageError::ConversationNotFound)?;
        self.require_participant(dto.conversation_id, sender_id).await?;

        let sender = self.load_user(sender_id).await?;

        let mut message = Message::new(dto.conversation_id, sender_id, dto.content);
        message.file_url = dto.file_url;
        message.file_type = dto.file_type;
        message.file_name = dto.file_name;

        // Write-then-notify: commit before any event leaves the process.
        self.message_repo.create(&message).await?;
        self.conversation_repo
            .touch(message.conversation_id, message.created_at)
            .await?;

        self.router.broadcast_to_conversation(
            ServerEvent::NewMessage(ChatMessagePayload {
                conversation_id: message.conversation_id,
                message_id: message.id,
                sender_id: message.sender_id,
                sender_username: sender.username.clone(),
                sender_display_name: sender.display_name.clone(),
                content: message.content.clone(),
                message_type: message.message_type().to_string(),
                file_url: message.file_url.clone(),
                created_at: message.created_at,
            }),
            message.conversation_id,
            None,
        );

        tracing::debug!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            sender_id = %sender_id,
            "Message sent"
        );

        Ok(message)
    }

    /// List messages in a conversation, newest first. Together with the
    /// conversation listing this is the client's reconciliation pull for
    /// events missed while offline.
    pub async fn get_messages(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Message>, MessageError> {
        self.conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or(MessageError::ConversationNotFound)?;
        self.require_participant(conversation_id, actor_id).await?;

        let limit = limit.clamp(1, 100);
        Ok(self
            .message_repo
            .find_by_conversation(conversation_id, skip.max(0), limit)
            .await?)
    }

    /// Edit a message. Only the original sender may edit, and never after a
    /// soft delete.
    pub async fn edit_message(
        &self,
        actor_id: Uuid,
        message_id: Uuid,
        content: String,
    ) -> Result<Message, MessageError> {
        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(MessageError::ContentTooLong);
        }

        let mut message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(MessageError::NotFound)?;

        if message.sender_id != Some(actor_id) {
            return Err(MessageError::NotSender);
        }
        if message.is_deleted {
            return Err(MessageError::AlreadyDeleted);
        }

        let edited_at = Utc::now();
        self.message_repo
            .update_content(message_id, &content, edited_at)
            .await?;
        message.content = content;
        message.edited_at = Some(edited_at);

        self.router.broadcast_to_conversation(
            ServerEvent::MessageEdited(MessageEditedPayload {
                conversation_id: message.conversation_id,
                message_id: message.id,
                sender_id: actor_id,
                content: message.content.clone(),
                edited_at,
            }),
            message.conversation_id,
            None,
        );

        Ok(message)
    }

    /// Soft-delete a message: the row survives for thread continuity but
    /// content and attachment fields are scrubbed. Terminal; further edits
    /// and deletes are rejected.
    pub async fn delete_message(
        &self,
        actor_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), MessageError> {
        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(MessageError::NotFound)?;

        if message.sender_id != Some(actor_id) {
            return Err(MessageError::NotSender);
        }
        if message.is_deleted {
            return Err(MessageError::AlreadyDeleted);
        }

        self.message_repo.soft_delete(message_id).await?;

        self.router.broadcast_to_conversation(
            ServerEvent::MessageDeleted(MessageDeletedPayload {
                conversation_id: message.conversation_id,
                message_id: message.id,
                sender_id: actor_id,
            }),
            message.conversation_id,
            None,
        );

        Ok(())
    }

    /// Mark a message read on behalf of a non-sender participant.
    ///
    /// Sets the read receipt fields, advances the reader's per-conversation
    /// read pointer, and fans `message_read` out to everyone except the
    /// reader.
    pub async fn mark_read(
        &self,
        actor_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, MessageError> {
        let mut message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(MessageError::NotFound)?;

        self.require_participant(message.conversation_id, actor_id)
            .await?;

        if message.sender_id == Some(actor_id) {
            return Err(MessageError::OwnMessageRead);
        }

        let read_at = Utc::now();
        self.message_repo
            .mark_read(message_id, message.conversation_id, actor_id, read_at)
            .await?;
        message.read_at = Some(read_at);
        message.read_by_user_id = Some(actor_id);
        if message.delivered_at.is_none() {
            message.delivered_at = Some(read_at);
        }

        let reader = self.load_user(actor_id).await?;

        self.router.broadcast_to_conversation(
            ServerEvent::MessageRead(MessageReadPayload {
                conversation_id: message.conversation_id,
                message_id: message.id,
                read_by_user_id: actor_id,
                read_by_username: reader.username,
                read_at,
            }),
            message.conversation_id,
            Some(actor_id),
        );

        Ok(message)
    }
}
