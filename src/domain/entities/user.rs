//! User entity and repository trait.
//!
//! Maps to the `users` table. The core only reads users; account creation
//! and credential management live outside this service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Represents a user account.
///
/// Maps to the `users` table:
/// - id: UUID PRIMARY KEY
/// - username: VARCHAR(50) NOT NULL UNIQUE
/// - display_name: VARCHAR(100) NOT NULL
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - last_seen_at: TIMESTAMPTZ NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Name shown in conversations
    pub display_name: String,

    /// Deactivated accounts cannot connect
    pub is_active: bool,

    /// Last time the user had a live session
    pub last_seen_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Repository trait for User data access operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Find several users at once. Missing IDs are simply absent from the
    /// result, callers decide whether that is an error.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError>;

    /// Record the time the user was last reachable.
    async fn update_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}
