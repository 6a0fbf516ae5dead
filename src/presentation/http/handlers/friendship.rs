//! Friendship Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{FriendRequestCreate, FriendRequestRespond};
use crate::application::dto::response::{
    FriendWithUserResponse, FriendshipResponse, FriendshipStatusResponse,
};
use crate::application::services::{FriendshipError, FriendshipService};
use crate::domain::FriendshipStatus;
use crate::infrastructure::repositories::{PgFriendshipRepository, PgUserRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

impl From<FriendshipError> for AppError {
    fn from(e: FriendshipError) -> Self {
        match e {
            FriendshipError::NotFound | FriendshipError::UserNotFound => {
                AppError::NotFound(e.to_string())
            }
            FriendshipError::SelfRequest
            | FriendshipError::AlreadyPending
            | FriendshipError::AlreadyFriends
            | FriendshipError::NotPending(_) => AppError::BadRequest(e.to_string()),
            FriendshipError::Blocked
            | FriendshipError::NotRecipient
            | FriendshipError::NotInvolved => AppError::Forbidden(e.to_string()),
            FriendshipError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

fn friendship_service(
    state: &AppState,
) -> FriendshipService<PgFriendshipRepository, PgUserRepository> {
    FriendshipService::new(
        Arc::new(PgFriendshipRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
    )
}

/// Send a friend request
pub async fn send_friend_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<FriendRequestCreate>,
) -> Result<(StatusCode, Json<FriendshipResponse>), AppError> {
    let friendship = friendship_service(&state)
        .send_request(auth.user_id, body.friend_id)
        .await?;

    Ok((StatusCode::CREATED, Json(FriendshipResponse::from(friendship))))
}

/// Accept, reject or block a pending friend request (recipient only)
pub async fn respond_to_friend_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<FriendRequestRespond>,
) -> Result<Json<FriendshipResponse>, AppError> {
    let friendship = friendship_service(&state)
        .respond(auth.user_id, body.friendship_id, body.action)
        .await?;

    Ok(Json(FriendshipResponse::from(friendship)))
}

/// List accepted friends
pub async fn get_friends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<FriendWithUserResponse>>, AppError> {
    let friends = friendship_service(&state).list_friends(auth.user_id).await?;
    Ok(Json(friends.into_iter().map(FriendWithUserResponse::from).collect()))
}

/// List pending requests received by the caller
pub async fn get_received_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<FriendWithUserResponse>>, AppError> {
    let requests = friendship_service(&state).list_received(auth.user_id).await?;
    Ok(Json(requests.into_iter().map(FriendWithUserResponse::from).collect()))
}

/// List pending requests sent by the caller
pub async fn get_sent_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<FriendWithUserResponse>>, AppError> {
    let requests = friendship_service(&state).list_sent(auth.user_id).await?;
    Ok(Json(requests.into_iter().map(FriendWithUserResponse::from).collect()))
}

/// Check friendship status with another user
pub async fn get_friendship_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<FriendshipStatusResponse>, AppError> {
    let friendship = friendship_service(&state)
        .status_with(auth.user_id, user_id)
        .await?;

    let response = match friendship {
        Some(f) => FriendshipStatusResponse {
            are_friends: f.status == FriendshipStatus::Accepted,
            status: Some(f.status.as_str().to_string()),
            friendship_id: Some(f.id),
            initiated_by: Some(f.user_id),
        },
        None => FriendshipStatusResponse {
            are_friends: false,
            status: None,
            friendship_id: None,
            initiated_by: None,
        },
    };

    Ok(Json(response))
}

/// Remove a friend or cancel a request (either party)
pub async fn remove_friendship(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(friendship_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    friendship_service(&state)
        .remove(auth.user_id, friendship_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
