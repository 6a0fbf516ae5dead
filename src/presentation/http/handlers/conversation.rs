//! Conversation Handlers

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
    AddParticipantsBatchRequest, CreateConversationRequest, PageParams,
    UpdateConversationRequest,
};
use crate::application::services::{
    ConversationError, ConversationService, CreateConversationDto,
};
use crate::infrastructure::repositories::{
    PgConversationRepository, PgFriendshipRepository, PgMessageRepository,
    PgParticipantRepository, PgUserRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::realtime::events::{ConversationSnapshot, ParticipantSnapshot};
use crate::shared::error::AppError;
use crate::startup::AppState;

impl From<ConversationError> for AppError {
    fn from(e: ConversationError) -> Self {
        match e {
            ConversationError::NotFound
            | ConversationError::UserNotFound
            | ConversationError::ParticipantNotFound => AppError::NotFound(e.to_string()),
            ConversationError::NotParticipant | ConversationError::NotCreator => {
                AppError::Forbidden(e.to_string())
            }
            ConversationError::NotGroup
            | ConversationError::NotDirect
            | ConversationError::DirectExists
            | ConversationError::InvalidParticipants(_)
            | ConversationError::TitleRequired
            | ConversationError::GroupFull
            | ConversationError::AlreadyParticipant
            | ConversationError::NotFriends => AppError::BadRequest(e.to_string()),
            ConversationError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

type Service = ConversationService<
    PgConversationRepository,
    PgParticipantRepository,
    PgMessageRepository,
    PgUserRepository,
    PgFriendshipRepository,
>;

fn conversation_service(state: &AppState) -> Service {
    ConversationService::new(
        Arc::new(PgConversationRepository::new(state.db.clone())),
        Arc::new(PgParticipantRepository::new(state.db.clone())),
        Arc::new(PgMessageRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgFriendshipRepository::new(state.db.clone())),
        state.router.clone(),
    )
}

/// Create a direct or group conversation
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationSnapshot>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let snapshot = conversation_service(&state)
        .create_conversation(
            auth.user_id,
            CreateConversationDto {
                kind: body.kind,
                title: body.title,
                participant_ids: body.participant_ids,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// List the caller's conversations, most recently active first
pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<ConversationSnapshot>>, AppError> {
    let snapshots = conversation_service(&state)
        .get_conversations(auth.user_id, page.skip.unwrap_or(0), page.limit.unwrap_or(50))
        .await?;

    Ok(Json(snapshots))
}

/// Fetch one conversation by ID
pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationSnapshot>, AppError> {
    let snapshot = conversation_service(&state)
        .get_conversation(auth.user_id, conversation_id)
        .await?;

    Ok(Json(snapshot))
}

/// Rename a group conversation (creator only)
pub async fn update_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<UpdateConversationRequest>,
) -> Result<Json<ConversationSnapshot>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let snapshot = conversation_service(&state)
        .update_title(auth.user_id, conversation_id, body.title)
        .await?;

    Ok(Json(snapshot))
}

/// Delete a conversation (creator only)
pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    conversation_service(&state)
        .delete_conversation(auth.user_id, conversation_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List a conversation's participants
pub async fn get_participants(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Vec<ParticipantSnapshot>>, AppError> {
    let participants = conversation_service(&state)
        .get_participants(auth.user_id, conversation_id)
        .await?;

    Ok(Json(participants))
}

/// Add one friend to a group (creator only)
pub async fn add_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((conversation_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    conversation_service(&state)
        .add_participant(auth.user_id, conversation_id, user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Participant added successfully" })),
    ))
}

/// Add several friends to a group in one call (creator only)
pub async fn add_participants_batch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<AddParticipantsBatchRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let added = conversation_service(&state)
        .add_participants_batch(auth.user_id, conversation_id, &body.user_ids)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Added {} participant(s) successfully", added),
            "added_count": added,
        })),
    ))
}

/// Remove a participant from a group (self, or creator removing others)
pub async fn remove_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((conversation_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    conversation_service(&state)
        .remove_participant(auth.user_id, conversation_id, user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Leave a conversation; a group with one member left auto-disbands
pub async fn leave_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    conversation_service(&state)
        .leave_conversation(auth.user_id, conversation_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Unfriend the other participant of a direct conversation
pub async fn unfriend_in_direct(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    conversation_service(&state)
        .unfriend_in_direct(auth.user_id, conversation_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
