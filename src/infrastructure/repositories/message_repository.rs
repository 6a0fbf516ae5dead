//! Message Repository Implementation
//!
//! PostgreSQL implementation of message operations: creation, paged
//! listing, edits, the soft-delete scrub and transactional read receipts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Message, MessageRepository, DELETED_PLACEHOLDER};
use crate::infrastructure::database::execute_in_transaction;
use crate::shared::error::AppError;

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Option<Uuid>,
    content: String,
    file_url: Option<String>,
    file_type: Option<String>,
    file_name: Option<String>,
    created_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
    is_deleted: bool,
    delivered_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
    read_by_user_id: Option<Uuid>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            content: self.content,
            file_url: self.file_url,
            file_type: self.file_type,
            file_name: self.file_name,
            created_at: self.created_at,
            edited_at: self.edited_at,
            is_deleted: self.is_deleted,
            delivered_at: self.delivered_at,
            read_at: self.read_at,
            read_by_user_id: self.read_by_user_id,
        }
    }
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, file_url, file_type, \
                               file_name, created_at, edited_at, is_deleted, delivered_at, \
                               read_at, read_by_user_id";

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_message()))
    }

    /// List messages newest first with offset pagination.
    async fn find_by_conversation(
        &self,
        conversation_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let limit = limit.clamp(1, 100);

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            OFFSET $2
            LIMIT $3
            "#
        ))
        .bind(conversation_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_message()).collect())
    }

    async fn create(&self, message: &Message) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, file_url,
                                  file_type, file_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(&message.file_url)
        .bind(&message.file_type)
        .bind(&message.file_name)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE messages SET content = $2, edited_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(content)
        .bind(edited_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }

        Ok(())
    }

    /// Flag the row deleted and scrub content and attachment columns in
    /// one statement.
    async fn soft_delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_deleted = TRUE,
                content = $2,
                file_url = NULL,
                file_type = NULL,
                file_name = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(DELETED_PLACEHOLDER)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }

        Ok(())
    }

    /// Record the read receipt on the message and advance the reader's
    /// per-conversation pointer in one transaction.
    async fn mark_read(
        &self,
        id: Uuid,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        execute_in_transaction(&self.pool, move |tx: &mut Transaction<'static, Postgres>| {
            Box::pin(async move {
                sqlx::query(
                    r#"
                    UPDATE messages
                    SET read_at = $2,
                        read_by_user_id = $3,
                        delivered_at = COALESCE(delivered_at, $2)
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(read_at)
                .bind(reader_id)
                .execute(&mut **tx)
                .await?;

                sqlx::query(
                    r#"
                    UPDATE conversation_participants
                    SET last_read_message_id = $3
                    WHERE conversation_id = $1 AND user_id = $2
                    "#,
                )
                .bind(conversation_id)
                .bind(reader_id)
                .bind(id)
                .execute(&mut **tx)
                .await?;

                Ok(())
            })
        })
        .await
    }
}
