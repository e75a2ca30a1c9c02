//! Tutor profile repository

use crate::db::{DynDatabasePool, SqlxResultExt, StoreResult};
use crate::models::Tutor;
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait TutorRepository: Send + Sync {
    async fn create(&self, tutor: &Tutor) -> StoreResult<Tutor>;
    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Tutor>>;
    async fn list(&self) -> StoreResult<Vec<Tutor>>;
    async fn update(&self, tutor: &Tutor) -> StoreResult<Tutor>;
    /// Returns whether a row was deleted
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

pub struct SqlxTutorRepository {
    pool: DynDatabasePool,
}

impl SqlxTutorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TutorRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_TUTOR: &str = r#"
    SELECT id, user_id, subject, years_experience, hourly_rate, location, created_at, updated_at
    FROM tutors
"#;

#[async_trait]
impl TutorRepository for SqlxTutorRepository {
    async fn create(&self, tutor: &Tutor) -> StoreResult<Tutor> {
        let result = sqlx::query(
            r#"
            INSERT INTO tutors (user_id, subject, years_experience, hourly_rate, location, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tutor.user_id)
        .bind(&tutor.subject)
        .bind(tutor.years_experience)
        .bind(tutor.hourly_rate)
        .bind(&tutor.location)
        .bind(tutor.created_at)
        .bind(tutor.updated_at)
        .execute(self.pool.sqlite())
        .await
        .store_context("create tutor")?;

        let mut created = tutor.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Tutor>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_TUTOR))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .store_context("get tutor")?;

        Ok(row.as_ref().map(row_to_tutor))
    }

    async fn list(&self) -> StoreResult<Vec<Tutor>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_TUTOR))
            .fetch_all(self.pool.sqlite())
            .await
            .store_context("list tutors")?;

        Ok(rows.iter().map(row_to_tutor).collect())
    }

    async fn update(&self, tutor: &Tutor) -> StoreResult<Tutor> {
        sqlx::query(
            r#"
            UPDATE tutors
            SET subject = ?, years_experience = ?, hourly_rate = ?, location = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&tutor.subject)
        .bind(tutor.years_experience)
        .bind(tutor.hourly_rate)
        .bind(&tutor.location)
        .bind(tutor.updated_at)
        .bind(tutor.id)
        .execute(self.pool.sqlite())
        .await
        .store_context("update tutor")?;

        Ok(tutor.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tutors WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .store_context("delete tutor")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_tutor(row: &sqlx::sqlite::SqliteRow) -> Tutor {
    Tutor {
        id: row.get("id"),
        user_id: row.get("user_id"),
        subject: row.get("subject"),
        years_experience: row.get("years_experience"),
        hourly_rate: row.get("hourly_rate"),
        location: row.get("location"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
