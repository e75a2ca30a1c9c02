//! Database layer
//!
//! SQLite through `sqlx`, embedded migrations, and one repository per entity.
//!
//! # Usage
//!
//! ```ignore
//! use tutorhub::config::DatabaseConfig;
//! use tutorhub::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repositories;

pub use error::{SqlxResultExt, StoreError, StoreResult};
pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
