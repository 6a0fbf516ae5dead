//! Request DTOs
//!
//! Data structures for API request bodies.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::application::services::FriendshipAction;
use crate::domain::ConversationKind;

/// Create conversation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConversationRequest {
    #[serde(rename = "type")]
    pub kind: ConversationKind,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "At least one participant is required"))]
    pub participant_ids: Vec<Uuid>,
}

/// Rename group conversation request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConversationRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
}

/// Batch participant add request
#[derive(Debug, Deserialize, Validate)]
pub struct AddParticipantsBatchRequest {
    #[validate(length(min = 1, message = "At least one user is required"))]
    pub user_ids: Vec<Uuid>,
}

/// Send message request
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,

    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,

    #[validate(length(max = 500, message = "File URL too long"))]
    pub file_url: Option<String>,

    #[validate(length(max = 50, message = "File type too long"))]
    pub file_type: Option<String>,

    #[validate(length(max = 255, message = "File name too long"))]
    pub file_name: Option<String>,
}

/// Edit message request
#[derive(Debug, Deserialize, Validate)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,
}

/// Message listing query parameters
#[derive(Debug, Deserialize)]
pub struct MessageQueryParams {
    pub conversation_id: Uuid,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Listing pagination parameters
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Add reaction request
#[derive(Debug, Deserialize, Validate)]
pub struct AddReactionRequest {
    #[validate(length(min = 1, max = 32, message = "Emoji must be 1-32 characters"))]
    pub emoji: String,
}

/// Send friend request
#[derive(Debug, Deserialize)]
pub struct FriendRequestCreate {
    pub friend_id: Uuid,
}

/// Respond to friend request
#[derive(Debug, Deserialize)]
pub struct FriendRequestRespond {
    pub friendship_id: Uuid,
    pub action: FriendshipAction,
}
