//! Reaction Repository Implementation
//!
//! PostgreSQL implementation of message reaction operations. The unique
//! (message_id, user_id, emoji) constraint backs the idempotency the
//! service layer relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{MessageReaction, ReactionRepository};
use crate::shared::error::AppError;

/// Internal row type for reaction queries.
#[derive(Debug, sqlx::FromRow)]
struct ReactionRow {
    id: Uuid,
    message_id: Uuid,
    user_id: Uuid,
    emoji: String,
    created_at: DateTime<Utc>,
}

impl ReactionRow {
    fn into_reaction(self) -> MessageReaction {
        MessageReaction {
            id: self.id,
            message_id: self.message_id,
            user_id: self.user_id,
            emoji: self.emoji,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL reaction repository implementation.
pub struct PgReactionRepository {
    pool: PgPool,
}

impl PgReactionRepository {
    /// Creates a new PgReactionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReactionRepository for PgReactionRepository {
    async fn find(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<Option<MessageReaction>, AppError> {
        let row = sqlx::query_as::<_, ReactionRow>(
            r#"
            SELECT id, message_id, user_id, emoji, created_at
            FROM message_reactions
            WHERE message_id = $1 AND user_id = $2 AND emoji = $3
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_reaction()))
    }

    /// Insert a reaction. ON CONFLICT DO NOTHING keeps a racing duplicate
    /// from surfacing as an error.
    async fn create(&self, reaction: &MessageReaction) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO message_reactions (id, message_id, user_id, emoji, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (message_id, user_id, emoji) DO NOTHING
            "#,
        )
        .bind(reaction.id)
        .bind(reaction.message_id)
        .bind(reaction.user_id)
        .bind(&reaction.emoji)
        .bind(reaction.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM message_reactions
            WHERE message_id = $1 AND user_id = $2 AND emoji = $3
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_message(
        &self,
        message_id: Uuid,
    ) -> Result<Vec<MessageReaction>, AppError> {
        let rows = sqlx::query_as::<_, ReactionRow>(
            r#"
            SELECT id, message_id, user_id, emoji, created_at
            FROM message_reactions
            WHERE message_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_reaction()).collect())
    }
}
