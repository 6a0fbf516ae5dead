//! Message Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::{
    EditMessageRequest, MessageQueryParams, SendMessageRequest,
};
use crate::application::dto::response::{MessageReadResponse, MessageResponse};
use crate::application::services::{MessageError, MessageService, SendMessageDto};
use crate::infrastructure::repositories::{
    PgConversationRepository, PgMessageRepository, PgParticipantRepository, PgUserRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

impl From<MessageError> for AppError {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::NotFound | MessageError::ConversationNotFound => {
                AppError::NotFound(e.to_string())
            }
            MessageError::NotParticipant | MessageError::NotSender => {
                AppError::Forbidden(e.to_string())
            }
            MessageError::AlreadyDeleted
            | MessageError::OwnMessageRead
            | MessageError::ContentTooLong => AppError::BadRequest(e.to_string()),
            MessageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

type Service = MessageService<
    PgMessageRepository,
    PgConversationRepository,
    PgParticipantRepository,
    PgUserRepository,
>;

fn message_service(state: &AppState) -> Service {
    MessageService::new(
        Arc::new(PgMessageRepository::new(state.db.clone())),
        Arc::new(PgConversationRepository::new(state.db.clone())),
        Arc::new(PgParticipantRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.router.clone(),
    )
}

/// Send a message to a conversation
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let message = message_service(&state)
        .send_message(
            auth.user_id,
            SendMessageDto {
                conversation_id: body.conversation_id,
                content: body.content,
                file_url: body.file_url,
                file_type: body.file_type,
                file_name: body.file_name,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// Get messages from a conversation, newest first
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<MessageQueryParams>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let messages = message_service(&state)
        .get_messages(
            auth.user_id,
            query.conversation_id,
            query.skip.unwrap_or(0),
            query.limit.unwrap_or(50),
        )
        .await?;

    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

/// Edit a message (sender only, not after deletion)
pub async fn edit_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<Uuid>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let message = message_service(&state)
        .edit_message(auth.user_id, message_id, body.content)
        .await?;

    Ok(Json(MessageResponse::from(message)))
}

/// Mark a message as read
pub async fn mark_message_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<MessageReadResponse>, AppError> {
    let message = message_service(&state)
        .mark_read(auth.user_id, message_id)
        .await?;

    Ok(Json(MessageReadResponse {
        message_id: message.id,
        read_at: message.read_at.unwrap_or_else(chrono::Utc::now),
        read_by_user_id: auth.user_id,
    }))
}

/// Soft-delete a message (sender only)
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    message_service(&state)
        .delete_message(auth.user_id, message_id)
        .await?;

    Ok(Json(json!({ "message": "Message deleted successfully" })))
}
