//! Friendship Repository Implementation
//!
//! PostgreSQL implementation of friendship rows. Pair lookups always match
//! both storage directions since one row serves the unordered pair.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Friendship, FriendshipRepository, FriendshipStatus};
use crate::shared::error::AppError;

/// Internal row type for friendship queries.
#[derive(Debug, sqlx::FromRow)]
struct FriendshipRow {
    id: Uuid,
    user_id: Uuid,
    friend_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FriendshipRow {
    fn into_friendship(self) -> Friendship {
        Friendship {
            id: self.id,
            user_id: self.user_id,
            friend_id: self.friend_id,
            status: FriendshipStatus::from_str(&self.status),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const FRIENDSHIP_COLUMNS: &str = "id, user_id, friend_id, status, created_at, updated_at";

/// PostgreSQL friendship repository implementation.
pub struct PgFriendshipRepository {
    pool: PgPool,
}

impl PgFriendshipRepository {
    /// Creates a new PgFriendshipRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipRepository for PgFriendshipRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Friendship>, AppError> {
        let row = sqlx::query_as::<_, FriendshipRow>(&format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_friendship()))
    }

    async fn find_between(&self, a: Uuid, b: Uuid) -> Result<Option<Friendship>, AppError> {
        let row = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            SELECT {FRIENDSHIP_COLUMNS}
            FROM friendships
            WHERE (user_id = $1 AND friend_id = $2)
               OR (user_id = $2 AND friend_id = $1)
            "#
        ))
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_friendship()))
    }

    async fn create(&self, friendship: &Friendship) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO friendships (id, user_id, friend_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(friendship.id)
        .bind(friendship.user_id)
        .bind(friendship.friend_id)
        .bind(friendship.status.as_str())
        .bind(friendship.created_at)
        .bind(friendship.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrite status and direction (re-request of a rejected row, or a
    /// response to a pending one).
    async fn update(&self, friendship: &Friendship) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE friendships
            SET user_id = $2, friend_id = $3, status = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(friendship.id)
        .bind(friendship.user_id)
        .bind(friendship.friend_id)
        .bind(friendship.status.as_str())
        .bind(friendship.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Friendship {} not found",
                friendship.id
            )));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM friendships WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_accepted_for(&self, user_id: Uuid) -> Result<Vec<Friendship>, AppError> {
        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            SELECT {FRIENDSHIP_COLUMNS}
            FROM friendships
            WHERE (user_id = $1 OR friend_id = $1) AND status = 'accepted'
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_friendship()).collect())
    }

    async fn list_pending_received(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Friendship>, AppError> {
        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            SELECT {FRIENDSHIP_COLUMNS}
            FROM friendships
            WHERE friend_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_friendship()).collect())
    }

    async fn list_pending_sent(&self, user_id: Uuid) -> Result<Vec<Friendship>, AppError> {
        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            SELECT {FRIENDSHIP_COLUMNS}
            FROM friendships
            WHERE user_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_friendship()).collect())
    }
}
