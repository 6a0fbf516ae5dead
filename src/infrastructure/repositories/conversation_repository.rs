//! Conversation Repository Implementation
//!
//! PostgreSQL implementation of conversation operations, including the
//! transactional create-with-participants write and the direct-pair
//! uniqueness lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Conversation, ConversationKind, ConversationRepository};
use crate::infrastructure::database::execute_in_transaction;
use crate::shared::error::AppError;

/// Internal row type for conversation queries.
#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    kind: String,
    title: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConversationRow {
    fn into_conversation(self) -> Conversation {
        Conversation {
            id: self.id,
            kind: ConversationKind::from_str(&self.kind),
            title: self.title,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL conversation repository implementation.
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    /// Creates a new PgConversationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, kind, title, created_by, created_at, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_conversation()))
    }

    /// Create the conversation and all participant rows atomically.
    async fn create_with_participants(
        &self,
        conversation: &Conversation,
        participant_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let conversation = conversation.clone();
        let participant_ids = participant_ids.to_vec();

        execute_in_transaction(&self.pool, move |tx: &mut Transaction<'static, Postgres>| {
            Box::pin(async move {
                sqlx::query(
                    r#"
                    INSERT INTO conversations (id, kind, title, created_by, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(conversation.id)
                .bind(conversation.kind.as_str())
                .bind(&conversation.title)
                .bind(conversation.created_by)
                .bind(conversation.created_at)
                .bind(conversation.updated_at)
                .execute(&mut **tx)
                .await?;

                for user_id in &participant_ids {
                    sqlx::query(
                        r#"
                        INSERT INTO conversation_participants (conversation_id, user_id, joined_at)
                        VALUES ($1, $2, $3)
                        "#,
                    )
                    .bind(conversation.id)
                    .bind(user_id)
                    .bind(conversation.created_at)
                    .execute(&mut **tx)
                    .await?;
                }

                Ok(())
            })
        })
        .await
    }

    /// Find the direct conversation both users participate in, if any.
    async fn find_direct_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT c.id, c.kind, c.title, c.created_by, c.created_at, c.updated_at
            FROM conversations c
            JOIN conversation_participants pa
                ON pa.conversation_id = c.id AND pa.user_id = $1
            JOIN conversation_participants pb
                ON pb.conversation_id = c.id AND pb.user_id = $2
            WHERE c.kind = 'direct'
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_conversation()))
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Conversation>, AppError> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT c.id, c.kind, c.title, c.created_by, c.created_at, c.updated_at
            FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id
            WHERE p.user_id = $1
            ORDER BY c.updated_at DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_conversation()).collect())
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE conversations SET title = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Conversation {} not found", id)));
        }

        Ok(())
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a conversation; FK cascades remove participants, messages
    /// and reactions.
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Conversation {} not found", id)));
        }

        Ok(())
    }
}
