//! Session repository
//!
//! Each user owns at most one session row. `upsert` overwrites the previous
//! token (a new login revokes the old one) and `clear` blanks it on logout.

use crate::db::{DynDatabasePool, SqlxResultExt, StoreResult};
use crate::models::Session;
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store `session` as the user's current session, replacing any previous one
    async fn upsert(&self, session: &Session) -> StoreResult<Session>;

    /// Get the session row for a user
    async fn get_by_user(&self, user_id: i64) -> StoreResult<Option<Session>>;

    /// Current token for a user; `None` when there is no session row
    async fn get_token(&self, user_id: i64) -> StoreResult<Option<String>>;

    /// Blank the user's token. Returns whether a row was touched.
    async fn clear(&self, user_id: i64) -> StoreResult<bool>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn upsert(&self, session: &Session) -> StoreResult<Session> {
        sqlx::query(
            r#"
            INSERT INTO sessions (user_id, token, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                token = excluded.token,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(self.pool.sqlite())
        .await
        .store_context("upsert session")?;

        Ok(session.clone())
    }

    async fn get_by_user(&self, user_id: i64) -> StoreResult<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, token, expires_at, created_at
            FROM sessions
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .store_context("get session")?;

        Ok(row.map(|row| Session {
            user_id: row.get("user_id"),
            token: row.get("token"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
        }))
    }

    async fn get_token(&self, user_id: i64) -> StoreResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT token FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .store_context("lookup session token")
    }

    async fn clear(&self, user_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE sessions SET token = '' WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool.sqlite())
            .await
            .store_context("clear session")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool.execute(
            "INSERT INTO users (id, name, email, password_hash) VALUES (1, 'u1', 'u1@example.com', 'hash')",
        )
        .await
        .expect("Failed to create test user");
        SqlxSessionRepository::new(pool)
    }

    fn test_session(token: &str) -> Session {
        let now = Utc::now();
        Session {
            user_id: 1,
            token: token.to_string(),
            expires_at: now + Duration::hours(72),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let repo = setup_test_repo().await;
        repo.upsert(&test_session("c1")).await.unwrap();

        assert_eq!(repo.get_token(1).await.unwrap().as_deref(), Some("c1"));
        let session = repo.get_by_user(1).await.unwrap().unwrap();
        assert!(session.holds("c1"));
    }

    #[tokio::test]
    async fn test_relogin_overwrites_previous_token() {
        let repo = setup_test_repo().await;
        repo.upsert(&test_session("c1")).await.unwrap();
        repo.upsert(&test_session("c2")).await.unwrap();

        assert_eq!(repo.get_token(1).await.unwrap().as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_clear_blanks_token() {
        let repo = setup_test_repo().await;
        repo.upsert(&test_session("c1")).await.unwrap();

        assert!(repo.clear(1).await.unwrap());
        assert_eq!(repo.get_token(1).await.unwrap().as_deref(), Some(""));
        assert!(repo.get_by_user(1).await.unwrap().unwrap().is_cleared());
    }

    #[tokio::test]
    async fn test_missing_session() {
        let repo = setup_test_repo().await;
        assert!(repo.get_token(1).await.unwrap().is_none());
        assert!(!repo.clear(1).await.unwrap());
    }
}
