//! Participant Repository Implementation
//!
//! PostgreSQL implementation of conversation membership rows. Membership
//! changes that must land together with their announcing system message
//! run in a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{ConversationParticipant, Message, ParticipantRepository};
use crate::infrastructure::database::execute_in_transaction;
use crate::shared::error::AppError;

/// Internal row type for participant queries.
#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    conversation_id: Uuid,
    user_id: Uuid,
    joined_at: DateTime<Utc>,
    last_read_message_id: Option<Uuid>,
}

impl ParticipantRow {
    fn into_participant(self) -> ConversationParticipant {
        ConversationParticipant {
            conversation_id: self.conversation_id,
            user_id: self.user_id,
            joined_at: self.joined_at,
            last_read_message_id: self.last_read_message_id,
        }
    }
}

/// PostgreSQL participant repository implementation.
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    /// Creates a new PgParticipantRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_system_message(
    tx: &mut Transaction<'static, Postgres>,
    message: &Message,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, content, file_type, created_at)
        VALUES ($1, $2, NULL, $3, $4, $5)
        "#,
    )
    .bind(message.id)
    .bind(message.conversation_id)
    .bind(&message.content)
    .bind(&message.file_type)
    .bind(message.created_at)
    .execute(&mut **tx)
    .await?;

    sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
        .bind(message.conversation_id)
        .bind(message.created_at)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn find(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationParticipant>, AppError> {
        let row = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT conversation_id, user_id, joined_at, last_read_message_id
            FROM conversation_participants
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_participant()))
    }

    async fn list_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ConversationParticipant>, AppError> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT conversation_id, user_id, joined_at, last_read_message_id
            FROM conversation_participants
            WHERE conversation_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_participant()).collect())
    }

    async fn conversation_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT conversation_id
            FROM conversation_participants
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn count(&self, conversation_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM conversation_participants WHERE conversation_id = $1",
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Insert participants plus the announcing system message and activity
    /// bump atomically.
    async fn add_recording(
        &self,
        participants: &[ConversationParticipant],
        system_message: &Message,
    ) -> Result<(), AppError> {
        let participants = participants.to_vec();
        let message = system_message.clone();

        execute_in_transaction(&self.pool, move |tx: &mut Transaction<'static, Postgres>| {
            Box::pin(async move {
                for participant in &participants {
                    sqlx::query(
                        r#"
                        INSERT INTO conversation_participants (conversation_id, user_id, joined_at)
                        VALUES ($1, $2, $3)
                        "#,
                    )
                    .bind(participant.conversation_id)
                    .bind(participant.user_id)
                    .bind(participant.joined_at)
                    .execute(&mut **tx)
                    .await?;
                }

                insert_system_message(tx, &message).await?;

                Ok(())
            })
        })
        .await
    }

    async fn remove(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM conversation_participants
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a participant and record the announcing system message
    /// atomically.
    async fn remove_recording(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        system_message: &Message,
    ) -> Result<bool, AppError> {
        let message = system_message.clone();

        execute_in_transaction(&self.pool, move |tx: &mut Transaction<'static, Postgres>| {
            Box::pin(async move {
                let result = sqlx::query(
                    r#"
                    DELETE FROM conversation_participants
                    WHERE conversation_id = $1 AND user_id = $2
                    "#,
                )
                .bind(conversation_id)
                .bind(user_id)
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Ok(false);
                }

                insert_system_message(tx, &message).await?;

                Ok(true)
            })
        })
        .await
    }
}
