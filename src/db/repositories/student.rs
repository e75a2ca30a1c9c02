//! Student profile repository

use crate::db::{DynDatabasePool, SqlxResultExt, StoreResult};
use crate::models::Student;
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn create(&self, student: &Student) -> StoreResult<Student>;
    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Student>>;
    async fn list(&self) -> StoreResult<Vec<Student>>;
    async fn update(&self, student: &Student) -> StoreResult<Student>;
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

pub struct SqlxStudentRepository {
    pool: DynDatabasePool,
}

impl SqlxStudentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn StudentRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_STUDENT: &str = r#"
    SELECT id, user_id, age, subjects, location, created_at, updated_at
    FROM students
"#;

#[async_trait]
impl StudentRepository for SqlxStudentRepository {
    async fn create(&self, student: &Student) -> StoreResult<Student> {
        let result = sqlx::query(
            r#"
            INSERT INTO students (user_id, age, subjects, location, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(student.user_id)
        .bind(student.age)
        .bind(&student.subjects)
        .bind(&student.location)
        .bind(student.created_at)
        .bind(student.updated_at)
        .execute(self.pool.sqlite())
        .await
        .store_context("create student")?;

        let mut created = student.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Student>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_STUDENT))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .store_context("get student")?;

        Ok(row.as_ref().map(row_to_student))
    }

    async fn list(&self) -> StoreResult<Vec<Student>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_STUDENT))
            .fetch_all(self.pool.sqlite())
            .await
            .store_context("list students")?;

        Ok(rows.iter().map(row_to_student).collect())
    }

    async fn update(&self, student: &Student) -> StoreResult<Student> {
        sqlx::query(
            r#"
            UPDATE students
            SET age = ?, subjects = ?, location = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(student.age)
        .bind(&student.subjects)
        .bind(&student.location)
        .bind(student.updated_at)
        .bind(student.id)
        .execute(self.pool.sqlite())
        .await
        .store_context("update student")?;

        Ok(student.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .store_context("delete student")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_student(row: &sqlx::sqlite::SqliteRow) -> Student {
    Student {
        id: row.get("id"),
        user_id: row.get("user_id"),
        age: row.get("age"),
        subjects: row.get("subjects"),
        location: row.get("location"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::StudentInput;

    #[tokio::test]
    async fn test_student_create_list_delete() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        pool.execute(
            "INSERT INTO users (id, name, email, password_hash) VALUES (3, 's', 's@example.com', 'h')",
        )
        .await
        .unwrap();
        let repo = SqlxStudentRepository::new(pool);

        let created = repo
            .create(&Student::new(StudentInput {
                user_id: 3,
                age: 16,
                subjects: "Maths,Art".to_string(),
                location: "Hull".to_string(),
            }))
            .await
            .unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].age, 16);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }
}
