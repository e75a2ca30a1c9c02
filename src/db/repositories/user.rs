//! User repository
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite

use crate::db::{DynDatabasePool, SqlxResultExt, StoreError, StoreResult};
use crate::models::{User, UserType};
use async_trait::async_trait;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user. A duplicate email yields `StoreError::Conflict`.
    async fn create(&self, user: &User) -> StoreResult<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Count how many of `ids` refer to existing users
    async fn count_existing(&self, ids: &[i64]) -> StoreResult<usize>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> StoreResult<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, user_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.user_type.to_string())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool.sqlite())
        .await
        .store_context("create user")?;

        let mut created = user.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, user_type, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .store_context("get user by id")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, user_type, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool.sqlite())
        .await
        .store_context("get user by email")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn count_existing(&self, ids: &[i64]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT COUNT(*) FROM users WHERE id IN ({})", placeholders);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let count = query
            .fetch_one(self.pool.sqlite())
            .await
            .store_context("count users")?;
        Ok(count as usize)
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> StoreResult<User> {
    let user_type: String = row.get("user_type");
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        user_type: UserType::from_str(&user_type).map_err(StoreError::Internal)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
