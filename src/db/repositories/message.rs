//! Message repository
//!
//! `create` stores a message only when the sender is a participant of the
//! target chat; otherwise nothing is written and `StoreError::Constraint`
//! is returned.

use crate::db::{DynDatabasePool, SqlxResultExt, StoreError, StoreResult};
use crate::models::{Message, NewMessage};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Store a message, assigning its ID and timestamp
    async fn create(&self, message: &NewMessage) -> StoreResult<Message>;

    /// Full history of a chat, oldest first
    async fn list_by_chat(&self, chat_id: i64) -> StoreResult<Vec<Message>>;

    /// Most recent message of a chat
    async fn last_in_chat(&self, chat_id: i64) -> StoreResult<Option<Message>>;
}

pub struct SqlxMessageRepository {
    pool: DynDatabasePool,
}

impl SqlxMessageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MessageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MessageRepository for SqlxMessageRepository {
    async fn create(&self, message: &NewMessage) -> StoreResult<Message> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO messages (chat_id, sender_id, content, created_at)
            SELECT ?, ?, ?, ?
            WHERE EXISTS (
                SELECT 1 FROM chat_participants WHERE chat_id = ? AND user_id = ?
            )
            "#,
        )
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(created_at)
        .bind(message.chat_id)
        .bind(message.sender_id)
        .execute(self.pool.sqlite())
        .await
        .store_context("create message")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Constraint(format!(
                "user {} is not a participant of chat {}",
                message.sender_id, message.chat_id
            )));
        }

        Ok(Message {
            id: result.last_insert_rowid(),
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            created_at,
        })
    }

    async fn list_by_chat(&self, chat_id: i64) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_id, sender_id, content, created_at
            FROM messages
            WHERE chat_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(chat_id)
        .fetch_all(self.pool.sqlite())
        .await
        .store_context("list messages")?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    async fn last_in_chat(&self, chat_id: i64) -> StoreResult<Option<Message>> {
        let row = sqlx::query(
            r#"
            SELECT id, chat_id, sender_id, content, created_at
            FROM messages
            WHERE chat_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .store_context("get last message")?;

        Ok(row.as_ref().map(row_to_message))
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}
