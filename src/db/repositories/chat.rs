//! Chat repository
//!
//! A chat row plus its participant rows. Participants are always returned in
//! ascending user ID order.

use crate::db::{DynDatabasePool, SqlxResultExt, StoreResult};
use crate::models::Chat;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Chat repository trait
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Create a chat with the given participants in one transaction.
    /// An unknown participant yields `StoreError::Constraint`.
    async fn create(&self, participants: &[i64]) -> StoreResult<Chat>;

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Chat>>;

    /// All chats, oldest first
    async fn list(&self) -> StoreResult<Vec<Chat>>;

    /// Chats `user_id` takes part in, oldest first
    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<Chat>>;

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> StoreResult<bool>;
}

/// SQLx-based chat repository implementation
pub struct SqlxChatRepository {
    pool: DynDatabasePool,
}

impl SqlxChatRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ChatRepository> {
        Arc::new(Self::new(pool))
    }

    async fn participants_of(&self, chat_id: i64) -> StoreResult<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM chat_participants WHERE chat_id = ? ORDER BY user_id",
        )
        .bind(chat_id)
        .fetch_all(self.pool.sqlite())
        .await
        .store_context("list chat participants")
    }

    /// Attach participants to chat rows with a single participant query
    async fn hydrate(&self, rows: Vec<(i64, DateTime<Utc>)>) -> StoreResult<Vec<Chat>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; rows.len()].join(", ");
        let sql = format!(
            "SELECT chat_id, user_id FROM chat_participants WHERE chat_id IN ({}) ORDER BY chat_id, user_id",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for (id, _) in &rows {
            query = query.bind(*id);
        }
        let participant_rows = query
            .fetch_all(self.pool.sqlite())
            .await
            .store_context("list chat participants")?;

        let mut by_chat: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for row in &participant_rows {
            by_chat
                .entry(row.get("chat_id"))
                .or_default()
                .push(row.get("user_id"));
        }

        Ok(rows
            .into_iter()
            .map(|(id, created_at)| Chat {
                id,
                participants: by_chat.remove(&id).unwrap_or_default(),
                created_at,
            })
            .collect())
    }
}

#[async_trait]
impl ChatRepository for SqlxChatRepository {
    async fn create(&self, participants: &[i64]) -> StoreResult<Chat> {
        let mut members = participants.to_vec();
        members.sort_unstable();
        members.dedup();

        let created_at = Utc::now();
        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .store_context("begin chat transaction")?;

        let result = sqlx::query("INSERT INTO chats (created_at) VALUES (?)")
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .store_context("create chat")?;
        let chat_id = result.last_insert_rowid();

        for user_id in &members {
            sqlx::query("INSERT INTO chat_participants (chat_id, user_id) VALUES (?, ?)")
                .bind(chat_id)
                .bind(*user_id)
                .execute(&mut *tx)
                .await
                .store_context("add chat participant")?;
        }

        tx.commit().await.store_context("commit chat")?;

        Ok(Chat {
            id: chat_id,
            participants: members,
            created_at,
        })
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Chat>> {
        let row = sqlx::query("SELECT id, created_at FROM chats WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .store_context("get chat")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Chat {
            id: row.get("id"),
            participants: self.participants_of(id).await?,
            created_at: row.get("created_at"),
        }))
    }

    async fn list(&self) -> StoreResult<Vec<Chat>> {
        let rows = sqlx::query("SELECT id, created_at FROM chats ORDER BY id")
            .fetch_all(self.pool.sqlite())
            .await
            .store_context("list chats")?;

        let rows = rows
            .iter()
            .map(|row| (row.get("id"), row.get("created_at")))
            .collect();
        self.hydrate(rows).await
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<Chat>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.created_at
            FROM chats c
            INNER JOIN chat_participants p ON p.chat_id = c.id
            WHERE p.user_id = ?
            ORDER BY c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .store_context("list chats for user")?;

        let rows = rows
            .iter()
            .map(|row| (row.get("id"), row.get("created_at")))
            .collect();
        self.hydrate(rows).await
    }

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> StoreResult<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM chat_participants WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .store_context("check chat participant")?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, StoreError};

    async fn setup_test_repo() -> SqlxChatRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        for id in 1..=3 {
            pool.execute(&format!(
                "INSERT INTO users (id, name, email, password_hash) VALUES ({id}, 'u{id}', 'u{id}@example.com', 'h')"
            ))
            .await
            .unwrap();
        }
        SqlxChatRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_chat() {
        let repo = setup_test_repo().await;

        let chat = repo.create(&[2, 1, 2]).await.unwrap();
        assert_eq!(chat.participants, vec![1, 2]);

        let fetched = repo.get_by_id(chat.id).await.unwrap().unwrap();
        assert_eq!(fetched.participants, vec![1, 2]);
        assert!(repo.is_participant(chat.id, 1).await.unwrap());
        assert!(!repo.is_participant(chat.id, 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_participant_rolls_back() {
        let repo = setup_test_repo().await;

        let err = repo.create(&[1, 99]).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)), "got {err:?}");
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let repo = setup_test_repo().await;
        let a = repo.create(&[1, 2]).await.unwrap();
        let b = repo.create(&[2, 3]).await.unwrap();

        let for_two: Vec<i64> = repo
            .list_for_user(2)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(for_two, vec![a.id, b.id]);

        let for_three = repo.list_for_user(3).await.unwrap();
        assert_eq!(for_three.len(), 1);
        assert_eq!(for_three[0].participants, vec![2, 3]);

        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert!(repo.get_by_id(404).await.unwrap().is_none());
    }
}
