//! # keel-orm-sqlx: SQLx driver for Keel ORM
//!
//! Runs the statements rendered by `keel-orm` against a real database and
//! reflects live tables for schema synchronization.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqliteDriver`] | [`Driver`](keel_orm::Driver) over an `sqlx::SqlitePool` |
//! | [`DatabaseConfig`] | `database.*` connection settings |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` (default) |
//!
//! # Quick start
//!
//! ```ignore
//! use keel_orm_sqlx::{DatabaseConfig, SqliteDriver};
//!
//! let orm = Orm::builder().register::<User>().build()?;
//! let driver = SqliteDriver::connect(&DatabaseConfig::from_config(&config)?).await?;
//! let em = orm.entity_manager(driver);
//! em.sync_schema().await?;
//! let user = em.save(&User { id: 0, name: "ada".into() }).await?;
//! ```

pub mod config;
pub mod error;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::DatabaseConfig;
pub use error::{SqlxErrorExt, SqlxResult};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;
