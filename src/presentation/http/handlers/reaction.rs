//! Reaction Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::AddReactionRequest;
use crate::application::dto::response::ReactionResponse;
use crate::application::services::{ReactionError, ReactionService, ReactionSummary};
use crate::infrastructure::repositories::{
    PgMessageRepository, PgParticipantRepository, PgReactionRepository, PgUserRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

impl From<ReactionError> for AppError {
    fn from(e: ReactionError) -> Self {
        match e {
            ReactionError::MessageNotFound | ReactionError::NotFound => {
                AppError::NotFound(e.to_string())
            }
            ReactionError::NotParticipant => AppError::Forbidden(e.to_string()),
            ReactionError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Aggregated reactions response body
#[derive(Debug, Serialize)]
pub struct MessageReactionsResponse {
    pub message_id: Uuid,
    pub reactions: Vec<ReactionSummary>,
    pub total_reactions: usize,
}

type Service = ReactionService<
    PgReactionRepository,
    PgMessageRepository,
    PgParticipantRepository,
    PgUserRepository,
>;

fn reaction_service(state: &AppState) -> Service {
    ReactionService::new(
        Arc::new(PgReactionRepository::new(state.db.clone())),
        Arc::new(PgMessageRepository::new(state.db.clone())),
        Arc::new(PgParticipantRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.router.clone(),
    )
}

/// Add a reaction to a message (idempotent per user and emoji)
pub async fn add_reaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<Uuid>,
    Json(body): Json<AddReactionRequest>,
) -> Result<(StatusCode, Json<ReactionResponse>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let reaction = reaction_service(&state)
        .add_reaction(auth.user_id, message_id, body.emoji)
        .await?;

    Ok((StatusCode::CREATED, Json(ReactionResponse::from(reaction))))
}

/// Remove the caller's reaction from a message
pub async fn remove_reaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((message_id, emoji)): Path<(Uuid, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    reaction_service(&state)
        .remove_reaction(auth.user_id, message_id, &emoji)
        .await?;

    Ok(Json(json!({ "message": "Reaction removed successfully" })))
}

/// Get a message's reactions aggregated by emoji
pub async fn get_reactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<MessageReactionsResponse>, AppError> {
    let reactions = reaction_service(&state)
        .summarize(auth.user_id, message_id)
        .await?;

    let total_reactions = reactions.iter().map(|r| r.count).sum();
    Ok(Json(MessageReactionsResponse {
        message_id,
        reactions,
        total_reactions,
    }))
}
