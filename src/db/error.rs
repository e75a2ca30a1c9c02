//! Typed store errors
//!
//! Repositories classify driver failures by the database error kind so that
//! callers can branch on `Conflict` or `Constraint` without inspecting the
//! engine's message text.

/// Error returned by every repository operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested row does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// A unique constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A foreign key or integrity rule rejected the write
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Any other database failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result alias for repository operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Classify a `sqlx` error raised while performing `action`
    pub fn from_sqlx(err: sqlx::Error, action: &str) -> Self {
        match &err {
            sqlx::Error::RowNotFound => return StoreError::NotFound(action.to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return StoreError::Conflict(action.to_string());
                }
                if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    return StoreError::Constraint(action.to_string());
                }
            }
            _ => {}
        }
        StoreError::Internal(anyhow::Error::new(err).context(action.to_string()))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Extension for mapping `sqlx` results into `StoreResult`
pub trait SqlxResultExt<T> {
    fn store_context(self, action: &str) -> StoreResult<T>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn store_context(self, action: &str) -> StoreResult<T> {
        self.map_err(|e| StoreError::from_sqlx(e, action))
    }
}
